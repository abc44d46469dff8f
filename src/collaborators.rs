//! # External Collaborators
//!
//! Narrow interfaces to everything the task states do not own: motion dispatch,
//! the base controller, frame transforms, inverse kinematics, object detection,
//! the tray sensor, arm compliance, the motion-mode controller, the door-opening
//! action server, speech and the human operator.
//!
//! Every call returns an explicit [`Result`](crate::error::Result); no collaborator
//! is reached through a global handle. States receive the [`Collaborators`] bundle at
//! construction and keep only the interfaces they use.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use crate::error::Result;
use crate::execution::Ticker;
use crate::geometry::PoseStamped;
use crate::state_machine::BaseTarget;

/// Lifecycle status of an in-flight action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    Pending,
    Active,
    Succeeded,
    Error,
    Paused,
}

impl GoalStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Error | Self::Paused)
    }

    /// Error and paused both mean the action will not reach its target on its own
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Error | Self::Paused)
    }
}

impl fmt::Display for GoalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Active => write!(f, "active"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Error => write!(f, "error"),
            Self::Paused => write!(f, "paused"),
        }
    }
}

/// What a motion group is asked to reach
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum MotionTarget {
    /// A pose known to the dispatcher by name
    Named(String),
    /// A joint configuration
    Joints(Vec<f64>),
    /// A base goal
    Base(BaseTarget),
    /// Waypoints executed in order
    Trajectory(Vec<MotionTarget>),
}

impl MotionTarget {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }
}

impl From<&str> for MotionTarget {
    fn from(name: &str) -> Self {
        Self::Named(name.to_string())
    }
}

impl From<Vec<f64>> for MotionTarget {
    fn from(joints: Vec<f64>) -> Self {
        Self::Joints(joints)
    }
}

impl fmt::Display for MotionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => write!(f, "{name}"),
            Self::Joints(joints) => write!(f, "joints{joints:?}"),
            Self::Base(target) => write!(f, "{target}"),
            Self::Trajectory(points) => {
                write!(f, "[")?;
                for (i, point) in points.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{point}")?;
                }
                write!(f, "]")
            }
        }
    }
}

/// Handle to an action that has been dispatched but may still be running
#[async_trait]
pub trait ActionHandle: Send + Sync {
    /// Current status as reported by the action server
    async fn state(&self) -> Result<GoalStatus>;

    async fn is_done(&self) -> Result<bool> {
        Ok(self.state().await?.is_terminal())
    }

    /// Block until the action reaches a terminal status or `timeout` elapses.
    /// On timeout the last observed status is returned.
    async fn wait(&self, timeout: Option<Duration>) -> Result<GoalStatus>;
}

/// Motion command dispatcher: sends a target to a motion group and hands back the in-flight action
#[async_trait]
pub trait MotionCommand: Send + Sync {
    async fn dispatch(
        &self,
        group: &str,
        target: &MotionTarget,
        mode: Option<&str>,
    ) -> Result<Box<dyn ActionHandle>>;
}

/// Base controller status and emergency stop
#[async_trait]
pub trait BaseController: Send + Sync {
    /// Whether the base is currently moving
    async fn is_moving(&self) -> Result<bool>;

    async fn stop(&self) -> Result<()>;
}

/// Service discovery: bounded wait for a named service to come up
#[async_trait]
pub trait ServiceDirectory: Send + Sync {
    async fn wait_for_service(&self, service: &str, timeout: Duration) -> Result<()>;
}

#[async_trait]
pub trait FrameTransform: Send + Sync {
    /// Express `pose` in `target_frame` at the latest common time
    async fn transform(&self, pose: &PoseStamped, target_frame: &str) -> Result<PoseStamped>;
}

/// Result code of an IK query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IkErrorCode {
    Success,
    NoSolution,
    Timeout,
    InvalidTarget,
    Other(i32),
}

impl IkErrorCode {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IkRequest {
    pub link_name: String,
    pub seed: Vec<f64>,
    pub target: PoseStamped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IkSolution {
    pub configuration: Vec<f64>,
    pub code: IkErrorCode,
}

#[async_trait]
pub trait IkSolver: Send + Sync {
    async fn solve(&self, request: &IkRequest) -> Result<IkSolution>;
}

/// An object reported by the detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedObject {
    pub label: String,
    pub pose: PoseStamped,
}

impl DetectedObject {
    pub fn new(label: impl Into<String>, pose: PoseStamped) -> Self {
        Self {
            label: label.into(),
            pose,
        }
    }
}

#[async_trait]
pub trait ObjectDetector: Send + Sync {
    async fn detect(&self, object_name: &str) -> Result<Vec<DetectedObject>>;
}

/// Tray sensor
#[async_trait]
pub trait OccupancyCheck: Send + Sync {
    async fn is_occupied(&self) -> Result<bool>;
}

#[async_trait]
pub trait ArmCompliance: Send + Sync {
    async fn set_joint_stiffness(&self, stiffness: &[f64]) -> Result<()>;
}

/// Switches the arm/base pair into and out of synchronised motion mode
#[async_trait]
pub trait MotionModeController: Send + Sync {
    async fn start(&self) -> Result<()>;

    async fn stop(&self) -> Result<()>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DoorOpeningGoal {
    /// Hinge pose, when the server is not expected to estimate it
    pub hinge: Option<PoseStamped>,
}

/// Action server performing the circular door-opening motion
#[async_trait]
pub trait DoorOpeningAction: Send + Sync {
    /// Wait for the server to come up; `false` when it did not within `timeout`
    async fn wait_for_server(&self, timeout: Duration) -> bool;

    async fn send_goal(&self, goal: &DoorOpeningGoal) -> Result<Box<dyn ActionHandle>>;
}

/// Fire-and-forget speech output
pub trait Speech: Send + Sync {
    fn say(&self, text: &str);
}

/// Human operator asked to confirm a step by hand
#[async_trait]
pub trait OperatorPrompt: Send + Sync {
    async fn confirm(&self, question: &str) -> bool;
}

/// Speech output that only writes to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggedSpeech;

impl Speech for LoggedSpeech {
    fn say(&self, text: &str) {
        info!(text = %text, "🔊 SPEECH");
    }
}

/// Operator prompt on the process console; `y`/`Y` confirms
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsolePrompt;

#[async_trait]
impl OperatorPrompt for ConsolePrompt {
    async fn confirm(&self, question: &str) -> bool {
        println!("{question}");
        let mut line = String::new();
        let mut reader = BufReader::new(tokio::io::stdin());
        match reader.read_line(&mut line).await {
            Ok(_) => is_affirmative(&line),
            Err(e) => {
                tracing::warn!(error = %e, "operator prompt could not read from console");
                false
            }
        }
    }
}

pub(crate) fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim(), "y" | "Y")
}

/// Every interface a task state may need, injected at construction
#[derive(Clone)]
pub struct Collaborators {
    pub motion: Arc<dyn MotionCommand>,
    pub base: Arc<dyn BaseController>,
    pub services: Arc<dyn ServiceDirectory>,
    pub transforms: Arc<dyn FrameTransform>,
    pub ik: Arc<dyn IkSolver>,
    pub detector: Arc<dyn ObjectDetector>,
    pub occupancy: Arc<dyn OccupancyCheck>,
    pub compliance: Arc<dyn ArmCompliance>,
    pub motion_mode: Arc<dyn MotionModeController>,
    pub door_action: Arc<dyn DoorOpeningAction>,
    pub speech: Arc<dyn Speech>,
    pub operator: Arc<dyn OperatorPrompt>,
    pub ticker: Arc<dyn Ticker>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_goal_status_classification() {
        assert!(GoalStatus::Succeeded.is_terminal());
        assert!(GoalStatus::Error.is_failure());
        assert!(GoalStatus::Paused.is_failure());
        assert!(!GoalStatus::Active.is_terminal());
        assert!(!GoalStatus::Pending.is_failure());
    }

    #[test]
    fn test_trajectory_display() {
        let target = MotionTarget::Trajectory(vec![vec![0.1, 0.2].into(), "hold".into()]);
        assert_eq!(target.to_string(), "[joints[0.1, 0.2], hold]");
    }

    #[test]
    fn test_operator_answer_parsing() {
        assert!(is_affirmative("y\n"));
        assert!(is_affirmative(" Y "));
        assert!(!is_affirmative("yes"));
        assert!(!is_affirmative("n"));
        assert!(!is_affirmative(""));
    }

    #[test]
    fn test_status_serde() {
        let json = serde_json::to_string(&GoalStatus::Paused).unwrap();
        assert_eq!(json, "\"paused\"");
    }
}
