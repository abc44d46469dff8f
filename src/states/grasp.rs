//! # Grasp
//!
//! Side and top grasps share one choreography and differ only in their
//! [`GraspProfile`]: compliance, fixed hand orientation, pre/post offsets, IK
//! seed and hand poses.
//!
//! Failure classification:
//! - compliance, transform or IK service unreachable, motion failure: `failed`
//! - IK without solution for any stage: `retry`
//! - retry budget spent on entry: `no_more_retries`

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use super::{solve_ik_pipeline, IkFailure};
use crate::collaborators::{ArmCompliance, Collaborators, FrameTransform, IkSolver, MotionTarget, Speech};
use crate::config::MissionConfig;
use crate::constants::{frames, groups, poses, services, side_grasp, top_grasp};
use crate::error::InvocationError;
use crate::execution::{ActionInvoker, RetryPolicy};
use crate::geometry::{PoseStamped, Quaternion};
use crate::logging::{log_retry, log_service_error, log_state_outcome};
use crate::state_machine::{ContextKey, ExecutionContext, Outcome, RetryOutcome, TaskState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraspKind {
    Side,
    Top,
}

/// Geometry and hand configuration of one grasp strategy
#[derive(Debug, Clone, PartialEq)]
pub struct GraspProfile {
    pub kind: GraspKind,
    pub stiffness: Vec<f64>,
    pub orientation: Quaternion,
    pub pre_grasp_offset: (f64, f64, f64),
    pub post_grasp_offset: (f64, f64, f64),
    /// IK seed of the pre-grasp stage
    pub seed: Vec<f64>,
    pub hand_open: &'static str,
    pub hand_closed: &'static str,
}

impl GraspProfile {
    pub fn side(config: &MissionConfig) -> Self {
        let (roll, pitch, yaw) = side_grasp::ORIENTATION_RPY;
        Self {
            kind: GraspKind::Side,
            stiffness: side_grasp::STIFFNESS.to_vec(),
            orientation: Quaternion::from_euler(roll, pitch, yaw),
            pre_grasp_offset: side_grasp::PRE_GRASP_OFFSET,
            post_grasp_offset: side_grasp::POST_GRASP_OFFSET,
            seed: config.arm.pregrasp.clone(),
            hand_open: poses::HAND_CYL_OPEN,
            hand_closed: poses::HAND_CYL_CLOSED,
        }
    }

    pub fn top(config: &MissionConfig) -> Self {
        let (roll, pitch, yaw) = top_grasp::ORIENTATION_RPY;
        Self {
            kind: GraspKind::Top,
            stiffness: top_grasp::STIFFNESS.to_vec(),
            orientation: Quaternion::from_euler(roll, pitch, yaw),
            pre_grasp_offset: top_grasp::PRE_GRASP_OFFSET,
            post_grasp_offset: top_grasp::POST_GRASP_OFFSET,
            seed: config.arm.pregrasp_top.clone(),
            hand_open: poses::HAND_SPHER_OPEN,
            hand_closed: poses::HAND_SPHER_CLOSED,
        }
    }

    /// Pre-grasp, grasp and post-grasp targets for an object pose in the base
    /// frame, in the order the IK pipeline solves them
    pub fn stages(&self, object_in_base: &PoseStamped) -> [(&'static str, PoseStamped); 3] {
        let grasp = object_in_base.clone().with_orientation(self.orientation);
        let pre_grasp = grasp.offset(self.pre_grasp_offset);
        let post_grasp = grasp.offset(self.post_grasp_offset);
        [
            ("pre_grasp", pre_grasp),
            ("grasp", grasp),
            ("post_grasp", post_grasp),
        ]
    }
}

pub struct Grasp {
    name: String,
    profile: GraspProfile,
    retry: RetryPolicy,
    invoker: ActionInvoker,
    transforms: Arc<dyn FrameTransform>,
    ik: Arc<dyn IkSolver>,
    compliance: Arc<dyn ArmCompliance>,
    speech: Arc<dyn Speech>,
    service_wait: Duration,
}

impl Grasp {
    pub fn new(collaborators: &Collaborators, config: &MissionConfig, profile: GraspProfile) -> Self {
        let name = match profile.kind {
            GraspKind::Side => "grasp_side",
            GraspKind::Top => "grasp_top",
        };
        Self {
            name: name.to_string(),
            profile,
            retry: config.retry_policy(),
            invoker: ActionInvoker::new(collaborators),
            transforms: collaborators.transforms.clone(),
            ik: collaborators.ik.clone(),
            compliance: collaborators.compliance.clone(),
            speech: collaborators.speech.clone(),
            service_wait: config.timeouts.service_wait(),
        }
    }

    pub fn side(collaborators: &Collaborators, config: &MissionConfig) -> Self {
        Self::new(collaborators, config, GraspProfile::side(config))
    }

    pub fn top(collaborators: &Collaborators, config: &MissionConfig) -> Self {
        Self::new(collaborators, config, GraspProfile::top(config))
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    fn finish(&self, outcome: RetryOutcome, details: &str) -> RetryOutcome {
        log_state_outcome(&self.name, outcome.label(), Some(self.retry.retries()), Some(details));
        outcome
    }

    fn fail(&mut self, details: &str) -> RetryOutcome {
        let outcome = self.retry.fail();
        self.finish(outcome, details)
    }

    async fn perform_grasp(
        &self,
        label: &str,
        pre_grasp: Vec<f64>,
        grasp: Vec<f64>,
        post_grasp: Vec<f64>,
    ) -> Result<(), InvocationError> {
        self.speech.say(&format!("I am grasping the {label} now."));
        self.invoker.execute(groups::TORSO, poses::HOME).await?;

        let approach = MotionTarget::Trajectory(vec![pre_grasp.into(), grasp.into()]);
        let arm = self.invoker.dispatch(groups::ARM, approach).await?;
        self.invoker.execute(groups::HAND, self.profile.hand_open).await?;
        self.invoker.await_handle(groups::ARM, arm.as_ref(), None).await?;
        self.invoker.execute(groups::HAND, self.profile.hand_closed).await?;

        // lift the object into the hold position
        self.invoker.dispatch(groups::HEAD, poses::FRONT).await?;
        let hold = MotionTarget::Trajectory(vec![post_grasp.into(), poses::HOLD.into()]);
        self.invoker.execute(groups::ARM, hold).await?;
        Ok(())
    }
}

#[async_trait]
impl TaskState for Grasp {
    type Outcome = RetryOutcome;

    fn name(&self) -> &str {
        &self.name
    }

    fn input_keys(&self) -> &'static [ContextKey] {
        &[ContextKey::Object]
    }

    async fn execute(&mut self, ctx: &mut ExecutionContext) -> RetryOutcome {
        if !self.retry.should_attempt() {
            return self.finish(RetryOutcome::NoMoreRetries, "retry budget exhausted");
        }

        let object = match ctx.object() {
            Ok(object) => object.clone(),
            Err(e) => {
                error!(state = %self.name, error = %e, "no object to grasp");
                return self.fail("no object");
            }
        };

        // soften the arm
        let compliance = self.compliance.clone();
        let stiffness = self.profile.stiffness.clone();
        if self
            .invoker
            .call_service(services::JOINT_STIFFNESS, self.service_wait, || async move {
                compliance.set_joint_stiffness(&stiffness).await
            })
            .await
            .is_err()
        {
            return self.fail("joint stiffness not set");
        }

        let object_in_base = match self.transforms.transform(&object.pose, frames::BASE_LINK).await {
            Ok(pose) => pose,
            Err(e) => {
                log_service_error(services::TRANSFORM, "transform", &e);
                return self.fail("object pose not transformable");
            }
        };

        let stages = self.profile.stages(&object_in_base);
        let configurations = match solve_ik_pipeline(
            &self.invoker,
            &self.ik,
            self.service_wait,
            &self.profile.seed,
            &stages,
        )
        .await
        {
            Ok(configurations) => configurations,
            Err(IkFailure::Unsolved { stage, .. }) => {
                let outcome = self.retry.retry();
                log_retry(&self.name, self.retry.retries(), self.retry.max_retries(), stage);
                return self.finish(outcome, stage);
            }
            Err(IkFailure::Service(_)) => return self.fail("IK solver unavailable"),
        };

        let [pre_grasp, grasp, post_grasp]: [Vec<f64>; 3] = match configurations.try_into() {
            Ok(configurations) => configurations,
            Err(_) => return self.fail("IK pipeline incomplete"),
        };

        info!(state = %self.name, object = %object.label, "executing grasp");
        if self
            .perform_grasp(&object.label, pre_grasp, grasp, post_grasp)
            .await
            .is_err()
        {
            return self.fail("grasp motion failed");
        }

        let outcome = self.retry.succeed();
        self.finish(outcome, &object.label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_side_stages_apply_offsets_in_pipeline_order() {
        let profile = GraspProfile::side(&MissionConfig::default());
        let object = PoseStamped::at(frames::BASE_LINK, 0.6, -0.1, 0.8);
        let stages = profile.stages(&object);

        let names: Vec<_> = stages.iter().map(|(name, _)| *name).collect();
        assert_eq!(names, vec!["pre_grasp", "grasp", "post_grasp"]);

        let pre = stages[0].1.pose.position;
        assert!((pre.x - 0.70).abs() < EPS);
        assert!((pre.y - 0.0).abs() < EPS);
        assert!((pre.z - 0.95).abs() < EPS);

        let post = stages[2].1.pose.position;
        assert!((post.x - 0.65).abs() < EPS);
        assert!((post.z - 0.97).abs() < EPS);

        for (_, pose) in &stages {
            assert_eq!(pose.pose.orientation, profile.orientation);
        }
    }

    #[test]
    fn test_top_profile_uses_spherical_hand_and_top_seed() {
        let config = MissionConfig::default();
        let profile = GraspProfile::top(&config);

        assert_eq!(profile.hand_open, "spheropen");
        assert_eq!(profile.seed, config.arm.pregrasp_top);
        assert_eq!(profile.stiffness, vec![100.0; 7]);

        let stages = profile.stages(&PoseStamped::at(frames::BASE_LINK, 0.5, 0.0, 0.3));
        assert!((stages[0].1.pose.position.z - 0.48).abs() < EPS);
    }
}
