use async_trait::async_trait;
use tracing::error;

use crate::collaborators::Collaborators;
use crate::constants::groups;
use crate::execution::ActionInvoker;
use crate::logging::log_state_outcome;
use crate::state_machine::{ContextKey, ExecutionContext, Outcome, SimpleOutcome, TaskState};

/// Turns the torso to the viewpoint named by `torso_pose`. Head and torso share
/// one kinematic group on this robot.
pub struct MoveHead {
    invoker: ActionInvoker,
}

impl MoveHead {
    pub fn new(collaborators: &Collaborators) -> Self {
        Self {
            invoker: ActionInvoker::new(collaborators),
        }
    }
}

#[async_trait]
impl TaskState for MoveHead {
    type Outcome = SimpleOutcome;

    fn name(&self) -> &str {
        "move_head"
    }

    fn input_keys(&self) -> &'static [ContextKey] {
        &[ContextKey::TorsoPose]
    }

    async fn execute(&mut self, ctx: &mut ExecutionContext) -> SimpleOutcome {
        let viewpoint = match ctx.torso_pose() {
            Ok(pose) => pose.to_string(),
            Err(e) => {
                error!(error = %e, "no torso viewpoint");
                log_state_outcome("move_head", SimpleOutcome::Failed.label(), None, None);
                return SimpleOutcome::Failed;
            }
        };

        let outcome = match self.invoker.execute(groups::TORSO, viewpoint.as_str()).await {
            Ok(_) => SimpleOutcome::Succeeded,
            Err(_) => SimpleOutcome::Failed,
        };
        log_state_outcome("move_head", outcome.label(), None, Some(&viewpoint));
        outcome
    }
}
