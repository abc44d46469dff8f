use std::sync::Arc;

use super::fakes::{
    FakeBase, FakeCompliance, FakeDetector, FakeDoorAction, FakeIk, FakeMotion, FakeMotionMode,
    FakeOccupancy, FakeServices, FakeTransforms, RecordingSpeech, ScriptedOperator,
};
use crate::collaborators::{Collaborators, DetectedObject};
use crate::execution::VirtualTicker;
use crate::geometry::PoseStamped;

/// Every fake collaborator, kept individually reachable for scripting and assertions
#[derive(Default)]
pub struct FakeRobot {
    pub motion: Arc<FakeMotion>,
    pub base: Arc<FakeBase>,
    pub services: Arc<FakeServices>,
    pub transforms: Arc<FakeTransforms>,
    pub ik: Arc<FakeIk>,
    pub detector: Arc<FakeDetector>,
    pub occupancy: Arc<FakeOccupancy>,
    pub compliance: Arc<FakeCompliance>,
    pub motion_mode: Arc<FakeMotionMode>,
    pub door_action: Arc<FakeDoorAction>,
    pub speech: Arc<RecordingSpeech>,
    pub operator: Arc<ScriptedOperator>,
    pub ticker: Arc<VirtualTicker>,
}

impl FakeRobot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            motion: self.motion.clone(),
            base: self.base.clone(),
            services: self.services.clone(),
            transforms: self.transforms.clone(),
            ik: self.ik.clone(),
            detector: self.detector.clone(),
            occupancy: self.occupancy.clone(),
            compliance: self.compliance.clone(),
            motion_mode: self.motion_mode.clone(),
            door_action: self.door_action.clone(),
            speech: self.speech.clone(),
            operator: self.operator.clone(),
            ticker: self.ticker.clone(),
        }
    }
}

/// Detection of `label` at `(x, y, z)` in the camera frame
pub fn detection(label: &str, x: f64, y: f64, z: f64) -> DetectedObject {
    DetectedObject::new(label, PoseStamped::at("/head_camera_left_link", x, y, z))
}
