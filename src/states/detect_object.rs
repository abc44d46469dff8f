//! # Detect Object
//!
//! Searches for a named object from a sequence of torso viewpoints. Each visit
//! inspects from the viewpoint selected by the current retry count, so repeated
//! visits sweep the scene. The nearest matching detection within range is
//! written to the context as `object`.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::collaborators::{Collaborators, DetectedObject, ObjectDetector, Speech};
use crate::config::MissionConfig;
use crate::constants::{groups, poses, services};
use crate::error::InvocationError;
use crate::execution::{ActionInvoker, RetryPolicy, Ticker};
use crate::logging::{log_retry, log_state_outcome};
use crate::state_machine::{ContextKey, ExecutionContext, Outcome, RetryOutcome, TaskState};

/// Nearest detection with a planar distance strictly below `max_distance`
pub fn select_nearest(detections: &[DetectedObject], max_distance: f64) -> Option<&DetectedObject> {
    detections
        .iter()
        .map(|detection| (detection, detection.pose.planar_distance()))
        .filter(|(_, distance)| *distance < max_distance)
        .min_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(detection, _)| detection)
}

pub struct DetectObject {
    object_name: Option<String>,
    retry: RetryPolicy,
    invoker: ActionInvoker,
    detector: Arc<dyn ObjectDetector>,
    speech: Arc<dyn Speech>,
    ticker: Arc<dyn Ticker>,
    inspection_poses: Vec<String>,
    max_distance: f64,
    detection_wait: Duration,
    settle: Duration,
}

impl DetectObject {
    pub fn new(collaborators: &Collaborators, config: &MissionConfig) -> Self {
        Self {
            object_name: None,
            retry: config.retry_policy(),
            invoker: ActionInvoker::new(collaborators),
            detector: collaborators.detector.clone(),
            speech: collaborators.speech.clone(),
            ticker: collaborators.ticker.clone(),
            inspection_poses: config.detection.inspection_poses.clone(),
            max_distance: config.selection.max_detection_distance,
            detection_wait: config.timeouts.detection_service_wait(),
            settle: config.timeouts.settle(),
        }
    }

    /// Fixed object name; takes precedence over `object_name` in the context
    pub fn with_object_name(mut self, name: impl Into<String>) -> Self {
        self.object_name = Some(name.into());
        self
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Torso viewpoint for the current attempt
    pub fn inspection_pose(&self) -> Option<&str> {
        if self.inspection_poses.is_empty() {
            return None;
        }
        let index = self.retry.retries() as usize % self.inspection_poses.len();
        Some(self.inspection_poses[index].as_str())
    }

    fn finish(&self, outcome: RetryOutcome, details: &str) -> RetryOutcome {
        log_state_outcome("detect_object", outcome.label(), Some(self.retry.retries()), Some(details));
        outcome
    }

    fn fail(&mut self, details: &str) -> RetryOutcome {
        let outcome = self.retry.fail();
        self.finish(outcome, details)
    }

    fn retry(&mut self, reason: &str) -> RetryOutcome {
        let outcome = self.retry.retry();
        log_retry("detect_object", self.retry.retries(), self.retry.max_retries(), reason);
        self.finish(outcome, reason)
    }

    /// Bring arm, torso, head and hand into the inspection posture
    async fn inspect(&self, object_name: &str) -> Result<(), InvocationError> {
        self.invoker.dispatch(groups::HAND, poses::HAND_CYL_CLOSED).await?;

        if self.retry.is_first_attempt() {
            self.speech.say(&format!("I will now search for the {object_name}."));
            let arm = self.invoker.dispatch(groups::ARM, poses::LOOK_AT_TABLE).await?;
            let torso = self.invoker.dispatch(groups::TORSO, poses::SHAKE).await?;
            let head = self.invoker.dispatch(groups::HEAD, poses::BACK).await?;
            self.invoker.await_handle(groups::ARM, arm.as_ref(), None).await?;
            self.invoker.await_handle(groups::TORSO, torso.as_ref(), None).await?;
            self.invoker.await_handle(groups::HEAD, head.as_ref(), None).await?;
        }

        if let Some(viewpoint) = self.inspection_pose() {
            debug!(viewpoint = %viewpoint, retries = self.retry.retries(), "inspecting");
            self.invoker.execute(groups::TORSO, viewpoint).await?;
        }

        self.invoker.dispatch(groups::HAND, poses::HOME).await?;
        Ok(())
    }
}

#[async_trait]
impl TaskState for DetectObject {
    type Outcome = RetryOutcome;

    fn name(&self) -> &str {
        "detect_object"
    }

    fn input_keys(&self) -> &'static [ContextKey] {
        &[ContextKey::ObjectName]
    }

    fn output_keys(&self) -> &'static [ContextKey] {
        &[ContextKey::Object]
    }

    async fn execute(&mut self, ctx: &mut ExecutionContext) -> RetryOutcome {
        ctx.clear_object();

        let object_name = match self
            .object_name
            .clone()
            .or_else(|| ctx.object_name().map(str::to_string))
        {
            Some(name) if !name.is_empty() => name,
            _ => {
                error!("no object name to search for");
                return self.fail("no object name");
            }
        };

        if !self.retry.should_attempt() {
            return self.finish(RetryOutcome::NoMoreRetries, "retry budget exhausted");
        }

        if self.inspect(&object_name).await.is_err() {
            return self.fail("inspection posture not reached");
        }
        self.ticker.sleep(self.settle).await;

        let detector = self.detector.clone();
        let name = object_name.clone();
        let detections = match self
            .invoker
            .call_service(services::OBJECT_DETECTION, self.detection_wait, || async move {
                detector.detect(&name).await
            })
            .await
        {
            Ok(detections) => detections,
            Err(_) => return self.fail("detection service failed"),
        };

        if detections.is_empty() {
            return self.retry("nothing detected");
        }

        let Some(nearest) = select_nearest(&detections, self.max_distance) else {
            return self.retry("no detection within range");
        };

        if nearest.label != object_name {
            info!(expected = %object_name, detected = %nearest.label, "detected a different object");
            return self.retry("label mismatch");
        }

        info!(
            object = %nearest.label,
            frame = %nearest.pose.frame_id,
            distance = nearest.pose.planar_distance(),
            "object detected"
        );
        ctx.set_object(nearest.clone());

        let outcome = self.retry.succeed();
        self.finish(outcome, &object_name)
    }
}
