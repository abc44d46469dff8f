//! # Test Helpers
//!
//! Scripted collaborators and a ready-made robot bundle for exercising task
//! states without hardware. Shared by the unit tests and the integration tests.

pub mod fakes;
pub mod robot;

pub use fakes::{
    FakeBase, FakeCompliance, FakeDetector, FakeDoorAction, FakeIk, FakeMotion, FakeMotionMode,
    FakeOccupancy, FakeServices, FakeTransforms, MotionRecord, RecordingSpeech, ScriptedHandle,
    ScriptedOperator,
};
pub use robot::{detection, FakeRobot};
