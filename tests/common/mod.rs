#![allow(dead_code)]

pub mod strategies;

use robot_task_states::collaborators::DetectedObject;
use robot_task_states::config::MissionConfig;
use robot_task_states::geometry::PoseStamped;
use robot_task_states::state_machine::ExecutionContext;
use robot_task_states::test_helpers::FakeRobot;

pub use robot_task_states::test_helpers::detection;

/// Default configuration; every test starts from the shipped defaults
pub fn config() -> MissionConfig {
    MissionConfig::default()
}

/// Object resting at `height` metres in front of the robot
pub fn object_at_height(label: &str, height: f64) -> DetectedObject {
    DetectedObject::new(label, PoseStamped::at("/head_camera_left_link", 0.6, -0.1, height))
}

/// Context holding a detected object, as left behind by a successful detection
pub fn context_with_object(object: DetectedObject) -> ExecutionContext {
    let mut ctx = ExecutionContext::new();
    ctx.set_object_name(object.label.clone());
    ctx.set_object(object);
    ctx
}

pub fn robot() -> FakeRobot {
    FakeRobot::new()
}
