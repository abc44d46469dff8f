use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use super::GraspKind;
use crate::collaborators::Collaborators;
use crate::config::MissionConfig;
use crate::constants::{groups, poses};
use crate::error::InvocationError;
use crate::execution::{ActionInvoker, Ticker};
use crate::logging::log_state_outcome;
use crate::state_machine::{ExecutionContext, Outcome, SimpleOutcome, TaskState};

/// Moves a held object onto the raised tray and folds the arm back. The side
/// variant uses the cylindrical hand poses, the top variant the spherical ones.
pub struct PutObjectOnTray {
    kind: GraspKind,
    invoker: ActionInvoker,
    ticker: Arc<dyn Ticker>,
    settle: Duration,
    tray_release: Duration,
}

impl PutObjectOnTray {
    pub fn new(collaborators: &Collaborators, config: &MissionConfig, kind: GraspKind) -> Self {
        Self {
            kind,
            invoker: ActionInvoker::new(collaborators),
            ticker: collaborators.ticker.clone(),
            settle: config.timeouts.settle(),
            tray_release: config.timeouts.tray_release(),
        }
    }

    pub fn side(collaborators: &Collaborators, config: &MissionConfig) -> Self {
        Self::new(collaborators, config, GraspKind::Side)
    }

    pub fn top(collaborators: &Collaborators, config: &MissionConfig) -> Self {
        Self::new(collaborators, config, GraspKind::Top)
    }

    pub fn kind(&self) -> GraspKind {
        self.kind
    }

    async fn place(&self) -> Result<(), InvocationError> {
        let (to_tray, hand_open, to_folded) = match self.kind {
            GraspKind::Side => (poses::GRASP_TO_TRAY, poses::HAND_CYL_OPEN, poses::TRAY_TO_FOLDED),
            GraspKind::Top => (
                poses::GRASP_TO_TRAY_TOP,
                poses::HAND_SPHER_OPEN,
                poses::TRAY_TOP_TO_FOLDED,
            ),
        };

        let arm = self.invoker.dispatch(groups::ARM, to_tray).await?;
        self.ticker.sleep(self.settle).await;
        self.invoker.execute(groups::TRAY, poses::UP).await?;
        self.invoker.await_handle(groups::ARM, arm.as_ref(), None).await?;

        self.invoker.execute(groups::HAND, hand_open).await?;

        let arm = self.invoker.dispatch(groups::ARM, to_folded).await?;
        self.ticker.sleep(self.tray_release).await;
        match self.kind {
            GraspKind::Side => {
                self.invoker.execute(groups::HAND, poses::HOME).await?;
            }
            GraspKind::Top => {
                let hand = self.invoker.dispatch(groups::HAND, poses::HOME).await?;
                self.invoker.await_handle(groups::HAND, hand.as_ref(), None).await?;
            }
        }
        self.invoker.await_handle(groups::ARM, arm.as_ref(), None).await?;
        Ok(())
    }
}

#[async_trait]
impl TaskState for PutObjectOnTray {
    type Outcome = SimpleOutcome;

    fn name(&self) -> &str {
        match self.kind {
            GraspKind::Side => "put_object_on_tray_side",
            GraspKind::Top => "put_object_on_tray_top",
        }
    }

    async fn execute(&mut self, _ctx: &mut ExecutionContext) -> SimpleOutcome {
        let outcome = match self.place().await {
            Ok(()) => SimpleOutcome::Succeeded,
            Err(_) => SimpleOutcome::Failed,
        };
        log_state_outcome(self.name(), outcome.label(), None, None);
        outcome
    }
}
