use async_trait::async_trait;
use std::sync::Arc;
use tracing::error;

use crate::collaborators::{Collaborators, FrameTransform};
use crate::config::MissionConfig;
use crate::constants::{frames, services};
use crate::logging::{log_service_error, log_state_outcome};
use crate::state_machine::{
    ContextKey, ExecutionContext, Outcome, SelectGraspOutcome, TaskState,
};

/// Single-shot decision between a side and a top grasp from the object height
/// in the base frame. No retry bookkeeping.
pub struct SelectGrasp {
    transforms: Arc<dyn FrameTransform>,
    height_switch: f64,
}

impl SelectGrasp {
    pub fn new(collaborators: &Collaborators, config: &MissionConfig) -> Self {
        Self {
            transforms: collaborators.transforms.clone(),
            height_switch: config.selection.height_switch,
        }
    }

    /// Side grasp at or above the threshold, top grasp below
    pub fn classify(&self, height: f64) -> SelectGraspOutcome {
        if height >= self.height_switch {
            SelectGraspOutcome::Side
        } else {
            SelectGraspOutcome::Top
        }
    }
}

#[async_trait]
impl TaskState for SelectGrasp {
    type Outcome = SelectGraspOutcome;

    fn name(&self) -> &str {
        "select_grasp"
    }

    fn input_keys(&self) -> &'static [ContextKey] {
        &[ContextKey::Object]
    }

    async fn execute(&mut self, ctx: &mut ExecutionContext) -> SelectGraspOutcome {
        let object = match ctx.object() {
            Ok(object) => object,
            Err(e) => {
                error!(error = %e, "no object to select a grasp for");
                return SelectGraspOutcome::Failed;
            }
        };

        let outcome = match self.transforms.transform(&object.pose, frames::BASE_LINK).await {
            Ok(pose) => self.classify(pose.height()),
            Err(e) => {
                log_service_error(services::TRANSFORM, "transform", &e);
                SelectGraspOutcome::Failed
            }
        };

        log_state_outcome("select_grasp", outcome.label(), None, Some(&object.label));
        outcome
    }
}
