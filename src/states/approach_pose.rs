//! # Approach Pose
//!
//! Drives the base to a target and watches it get there. The first arrival is
//! treated as coarse: the move is reissued once and only the second arrival
//! counts. The base controller's motion flag feeds the poll loop, so a base that
//! stands still for too long is stopped and the approach is abandoned.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::collaborators::{
    ActionHandle, BaseController, Collaborators, GoalStatus, MotionTarget, Speech,
};
use crate::config::MissionConfig;
use crate::constants::{groups, services, speech, DEFAULT_BASE_MODE};
use crate::error::Result;
use crate::execution::{
    ActionInvoker, PollBudget, PollLoop, PollOutcome, PollSignal, PollTarget, PreemptSignal, Ticker,
};
use crate::logging::{log_service_error, log_state_outcome};
use crate::state_machine::{
    BaseTarget, ContextKey, ExecutionContext, Outcome, SimpleOutcome, TaskState,
};

/// Progress of one approach
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApproachPhase {
    MovingFirst,
    MovingSecond,
    Arrived,
    Error,
}

/// Poll target following the base handle through the two-phase approach
pub struct ApproachTracker {
    invoker: ActionInvoker,
    base: Arc<dyn BaseController>,
    ticker: Arc<dyn Ticker>,
    speech: Arc<dyn Speech>,
    target: MotionTarget,
    mode: String,
    handle: Box<dyn ActionHandle>,
    phase: ApproachPhase,
    service_wait: Duration,
    stop_service_wait: Duration,
    handle_error_backoff: Duration,
}

impl ApproachTracker {
    pub fn phase(&self) -> ApproachPhase {
        self.phase
    }

    async fn observe_handle(&mut self) -> Option<PollSignal> {
        let status = match self.handle.state().await {
            Ok(status) => status,
            Err(e) => {
                error!(error = %e, "unable to check base handle state");
                self.ticker.sleep(self.handle_error_backoff).await;
                return None;
            }
        };

        match (status, self.phase) {
            (GoalStatus::Succeeded, ApproachPhase::MovingFirst) => {
                // second move to place the robot more exactly
                match self
                    .invoker
                    .dispatch_with_mode(groups::BASE, self.target.clone(), Some(self.mode.as_str()))
                    .await
                {
                    Ok(handle) => {
                        self.handle = handle;
                        self.phase = ApproachPhase::MovingSecond;
                        None
                    }
                    Err(_) => {
                        self.phase = ApproachPhase::Error;
                        Some(PollSignal::Failed)
                    }
                }
            }
            (GoalStatus::Succeeded, ApproachPhase::MovingSecond) => {
                self.phase = ApproachPhase::Arrived;
                Some(PollSignal::Succeeded)
            }
            (status, _) if status.is_failure() => {
                error!(status = %status, "base not arrived on target");
                self.phase = ApproachPhase::Error;
                Some(PollSignal::Failed)
            }
            _ => None,
        }
    }
}

#[async_trait]
impl PollTarget for ApproachTracker {
    async fn poll(&mut self) -> Result<PollSignal> {
        if let Some(resolved) = self.observe_handle().await {
            return Ok(resolved);
        }

        let base = self.base.clone();
        let moving = self
            .invoker
            .call_service(services::BASE_IS_MOVING, self.service_wait, || async move {
                base.is_moving().await
            })
            .await?;

        Ok(if moving {
            PollSignal::Progress
        } else {
            PollSignal::Idle
        })
    }

    async fn cancel(&mut self) {
        self.speech.say(speech::PATH_BLOCKED);

        let base = self.base.clone();
        let stopped = self
            .invoker
            .call_service(services::BASE_STOP, self.stop_service_wait, || async move {
                base.stop().await
            })
            .await;
        if let Err(e) = stopped {
            log_service_error(services::BASE_STOP, "stop", &e);
        }
    }
}

pub struct ApproachPose {
    name: String,
    pose: Option<BaseTarget>,
    mode: String,
    invoker: ActionInvoker,
    base: Arc<dyn BaseController>,
    ticker: Arc<dyn Ticker>,
    speech: Arc<dyn Speech>,
    preempt: PreemptSignal,
    budget: PollBudget,
    service_wait: Duration,
    stop_service_wait: Duration,
    handle_error_backoff: Duration,
}

impl ApproachPose {
    pub fn new(collaborators: &Collaborators, config: &MissionConfig) -> Self {
        Self {
            name: "approach_pose".to_string(),
            pose: None,
            mode: DEFAULT_BASE_MODE.to_string(),
            invoker: ActionInvoker::new(collaborators),
            base: collaborators.base.clone(),
            ticker: collaborators.ticker.clone(),
            speech: collaborators.speech.clone(),
            preempt: PreemptSignal::new(),
            budget: config.approach_budget(),
            service_wait: config.timeouts.service_wait(),
            stop_service_wait: config.timeouts.stop_service_wait(),
            handle_error_backoff: config.handle_error_backoff(),
        }
    }

    /// Fixed target; takes precedence over `base_pose` in the context
    pub fn with_pose(mut self, pose: BaseTarget) -> Self {
        self.pose = Some(pose);
        self
    }

    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = mode.into();
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    fn resolve_target(&self, ctx: &ExecutionContext) -> Option<BaseTarget> {
        if let Some(pose) = &self.pose {
            return Some(pose.clone());
        }
        match ctx.base_pose() {
            Ok(pose) => Some(pose.clone()),
            Err(e) => {
                error!(error = %e, "invalid base pose");
                None
            }
        }
    }

    fn finish(&self, outcome: SimpleOutcome, details: &str) -> SimpleOutcome {
        log_state_outcome(&self.name, outcome.label(), None, Some(details));
        outcome
    }

    async fn visit(&self, ctx: &ExecutionContext) -> SimpleOutcome {
        let Some(target) = self.resolve_target(ctx) else {
            return self.finish(SimpleOutcome::Failed, "no target pose");
        };
        info!(state = %self.name, target = %target, mode = %self.mode, "approaching");

        let target = MotionTarget::Base(target);
        let handle = match self
            .invoker
            .dispatch_with_mode(groups::BASE, target.clone(), Some(self.mode.as_str()))
            .await
        {
            Ok(handle) => handle,
            Err(_) => return self.finish(SimpleOutcome::Failed, "base move rejected"),
        };

        let mut tracker = ApproachTracker {
            invoker: self.invoker.clone(),
            base: self.base.clone(),
            ticker: self.ticker.clone(),
            speech: self.speech.clone(),
            target,
            mode: self.mode.clone(),
            handle,
            phase: ApproachPhase::MovingFirst,
            service_wait: self.service_wait,
            stop_service_wait: self.stop_service_wait,
            handle_error_backoff: self.handle_error_backoff,
        };

        let mut poll = PollLoop::new(self.budget, self.ticker.clone(), self.preempt.clone());
        match poll.run(&mut tracker).await {
            PollOutcome::Succeeded => self.finish(SimpleOutcome::Succeeded, "arrived"),
            PollOutcome::TimedOut => self.finish(SimpleOutcome::Failed, "base stood still too long"),
            PollOutcome::Failed => self.finish(SimpleOutcome::Failed, "approach failed"),
        }
    }
}

#[async_trait]
impl TaskState for ApproachPose {
    type Outcome = SimpleOutcome;

    fn name(&self) -> &str {
        &self.name
    }

    fn input_keys(&self) -> &'static [ContextKey] {
        &[ContextKey::BasePose]
    }

    fn preempt_signal(&self) -> Option<&PreemptSignal> {
        Some(&self.preempt)
    }

    async fn execute(&mut self, ctx: &mut ExecutionContext) -> SimpleOutcome {
        let outcome = self.visit(ctx).await;
        // a request left over from any exit path must not abort the next visit
        if self.preempt.clear() {
            warn!(state = %self.name, "approach preempted");
        }
        outcome
    }
}
