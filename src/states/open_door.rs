//! # Open Door
//!
//! Grasps a door handle located relative to a detected marker, hands the arm and
//! base over to the synchronised motion mode and lets the door-opening action
//! server swing the door. The handle is released with a fully opened hand once
//! motion mode is switched off again.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use super::{solve_ik_pipeline, IkFailure};
use crate::collaborators::{
    ArmCompliance, Collaborators, DoorOpeningAction, DoorOpeningGoal, FrameTransform, GoalStatus,
    IkSolver, MotionModeController, MotionTarget,
};
use crate::config::MissionConfig;
use crate::constants::{door, frames, groups, poses, services};
use crate::error::InvocationError;
use crate::execution::{ActionInvoker, RetryPolicy, Ticker};
use crate::geometry::{PoseStamped, Quaternion};
use crate::logging::{log_retry, log_service_error, log_state_outcome};
use crate::state_machine::{ContextKey, ExecutionContext, Outcome, RetryOutcome, TaskState};

/// Handle grasp pose and its pre-grasp pose for a marker pose in the base frame
pub fn door_stages(marker_in_base: &PoseStamped) -> [(&'static str, PoseStamped); 2] {
    let (x, y, z, w) = door::HANDLE_ORIENTATION;
    let handle = marker_in_base
        .offset(door::HANDLE_OFFSET)
        .with_orientation(Quaternion::new(x, y, z, w));
    let pre_door = handle.offset(door::PRE_DOOR_OFFSET);
    [("pre_door", pre_door), ("door", handle)]
}

pub struct OpenDoor {
    retry: RetryPolicy,
    invoker: ActionInvoker,
    transforms: Arc<dyn FrameTransform>,
    ik: Arc<dyn IkSolver>,
    compliance: Arc<dyn ArmCompliance>,
    motion_mode: Arc<dyn MotionModeController>,
    door_action: Arc<dyn DoorOpeningAction>,
    ticker: Arc<dyn Ticker>,
    seed: Vec<f64>,
    service_wait: Duration,
    action_server_ready: Duration,
    door_goal: Duration,
    settle: Duration,
}

impl OpenDoor {
    pub fn new(collaborators: &Collaborators, config: &MissionConfig) -> Self {
        Self {
            retry: config.retry_policy(),
            invoker: ActionInvoker::new(collaborators),
            transforms: collaborators.transforms.clone(),
            ik: collaborators.ik.clone(),
            compliance: collaborators.compliance.clone(),
            motion_mode: collaborators.motion_mode.clone(),
            door_action: collaborators.door_action.clone(),
            ticker: collaborators.ticker.clone(),
            seed: config.arm.pregrasp.clone(),
            service_wait: config.timeouts.service_wait(),
            action_server_ready: config.timeouts.action_server_ready(),
            door_goal: config.timeouts.door_goal(),
            settle: config.timeouts.settle(),
        }
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    fn finish(&self, outcome: RetryOutcome, details: &str) -> RetryOutcome {
        log_state_outcome("open_door", outcome.label(), Some(self.retry.retries()), Some(details));
        outcome
    }

    fn fail(&mut self, details: &str) -> RetryOutcome {
        let outcome = self.retry.fail();
        self.finish(outcome, details)
    }

    /// Reach the handle and close the hand on it
    async fn grasp_handle(&self, pre_door: Vec<f64>, door: Vec<f64>) -> Result<(), InvocationError> {
        // the tray finishes on its own; only the hand is awaited
        self.invoker.dispatch(groups::TRAY, poses::UP).await?;
        let hand = self.invoker.dispatch(groups::HAND, poses::HAND_CYL_OPEN).await?;
        self.invoker.execute(groups::TORSO, poses::FRONT).await?;

        let approach = MotionTarget::Trajectory(vec![pre_door.into(), door.into()]);
        self.invoker.execute(groups::ARM, approach).await?;
        self.invoker.await_handle(groups::HAND, hand.as_ref(), None).await?;
        self.invoker.execute(groups::HAND, poses::HAND_CYL_CLOSED).await?;
        Ok(())
    }

    /// Switch motion mode on, run the door-opening action and switch it off again
    async fn swing_door(&self) -> Result<(), &'static str> {
        let motion_mode = self.motion_mode.clone();
        self.invoker
            .call_service(services::MOTION_MODE_START, self.service_wait, || async move {
                motion_mode.start().await
            })
            .await
            .map_err(|_| "motion mode not started")?;

        if !self.door_action.wait_for_server(self.action_server_ready).await {
            error!(
                server = services::DOOR_OPENING_ACTION,
                waited_ms = self.action_server_ready.as_millis() as u64,
                "door opening action server not available"
            );
            if let Err(e) = self.motion_mode.stop().await {
                log_service_error(services::MOTION_MODE_STOP, "stop", &e);
            }
            return Err("door opening server not available");
        }

        info!("opening door");
        match self.door_action.send_goal(&DoorOpeningGoal::default()).await {
            Ok(handle) => match handle.wait(Some(self.door_goal)).await {
                Ok(GoalStatus::Succeeded) => info!("door opened"),
                Ok(status) => warn!(status = %status, "door opening did not finish in time"),
                Err(e) => log_service_error(services::DOOR_OPENING_ACTION, "wait", &e),
            },
            Err(e) => log_service_error(services::DOOR_OPENING_ACTION, "send_goal", &e),
        }

        let motion_mode = self.motion_mode.clone();
        self.invoker
            .call_service(services::MOTION_MODE_STOP, self.service_wait, || async move {
                motion_mode.stop().await
            })
            .await
            .map_err(|_| "motion mode not stopped")?;
        Ok(())
    }

    /// Let go of the handle and bring the arm back to hold
    async fn release_handle(&self) -> Result<(), InvocationError> {
        self.invoker.execute(groups::HAND, poses::HAND_CYL_TOTAL_OPEN).await?;
        self.invoker.execute(groups::ARM, poses::DOOR_RELEASE).await?;
        let arm = self.invoker.dispatch(groups::ARM, poses::HOLD).await?;
        self.ticker.sleep(self.settle).await;
        self.invoker.execute(groups::HAND, poses::HAND_CYL_CLOSED).await?;
        self.invoker.await_handle(groups::ARM, arm.as_ref(), None).await?;
        Ok(())
    }
}

#[async_trait]
impl TaskState for OpenDoor {
    type Outcome = RetryOutcome;

    fn name(&self) -> &str {
        "open_door"
    }

    fn input_keys(&self) -> &'static [ContextKey] {
        &[ContextKey::Object]
    }

    async fn execute(&mut self, ctx: &mut ExecutionContext) -> RetryOutcome {
        if !self.retry.should_attempt() {
            return self.finish(RetryOutcome::NoMoreRetries, "retry budget exhausted");
        }

        let marker = match ctx.object() {
            Ok(object) => object.pose.clone(),
            Err(e) => {
                error!(error = %e, "no door marker to open");
                return self.fail("no door marker");
            }
        };

        let compliance = self.compliance.clone();
        if self
            .invoker
            .call_service(services::JOINT_STIFFNESS, self.service_wait, || async move {
                compliance.set_joint_stiffness(&door::STIFFNESS).await
            })
            .await
            .is_err()
        {
            return self.fail("joint stiffness not set");
        }

        let marker_in_base = match self.transforms.transform(&marker, frames::BASE_LINK).await {
            Ok(pose) => pose,
            Err(e) => {
                log_service_error(services::TRANSFORM, "transform", &e);
                return self.fail("door marker not transformable");
            }
        };

        let stages = door_stages(&marker_in_base);
        let configurations =
            match solve_ik_pipeline(&self.invoker, &self.ik, self.service_wait, &self.seed, &stages).await {
                Ok(configurations) => configurations,
                Err(IkFailure::Unsolved { stage, .. }) => {
                    let outcome = self.retry.retry();
                    log_retry("open_door", self.retry.retries(), self.retry.max_retries(), stage);
                    return self.finish(outcome, stage);
                }
                Err(IkFailure::Service(_)) => return self.fail("IK solver unavailable"),
            };

        let [pre_door, door]: [Vec<f64>; 2] = match configurations.try_into() {
            Ok(configurations) => configurations,
            Err(_) => return self.fail("IK pipeline incomplete"),
        };

        if self.grasp_handle(pre_door, door).await.is_err() {
            return self.fail("handle grasp failed");
        }

        if let Err(reason) = self.swing_door().await {
            return self.fail(reason);
        }

        if self.release_handle().await.is_err() {
            return self.fail("handle release failed");
        }

        let outcome = self.retry.succeed();
        self.finish(outcome, "door opened")
    }
}
