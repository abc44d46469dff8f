//! # Mission Configuration
//!
//! Tunables of the task states: retry budget, poll cadence and idle limit,
//! collaborator timeouts, selection thresholds, delivery deadline, IK seed
//! configurations and the inspection viewpoints used while searching.
//!
//! Durations are stored in milliseconds and exposed as [`Duration`] through
//! accessor methods. Every section has defaults, so a YAML file only needs the
//! keys it overrides.

pub mod error;
pub mod loader;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::execution::{PollBudget, RetryPolicy};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MissionConfig {
    pub retry: RetryConfig,
    pub poll: PollConfig,
    pub timeouts: TimeoutConfig,
    pub selection: SelectionConfig,
    pub delivery: DeliveryConfig,
    pub arm: ArmConfig,
    pub detection: DetectionConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_retries: 1 }
    }
}

/// Base approach monitoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    pub cadence_ms: u64,
    /// Consecutive standstill ticks tolerated before the approach is aborted
    pub max_idle_ticks: u32,
    /// Pause after a failed handle-state query
    pub handle_error_backoff_ms: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            cadence_ms: 1000,
            max_idle_ticks: 10,
            handle_error_backoff_ms: 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub service_wait_ms: u64,
    pub stop_service_wait_ms: u64,
    pub detection_service_wait_ms: u64,
    pub occupancy_service_wait_ms: u64,
    pub action_server_ready_ms: u64,
    pub door_goal_ms: u64,
    /// Pause for the camera image or the arm to settle
    pub settle_ms: u64,
    /// Pause before the hand reopens when retracting from the tray
    pub tray_release_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            service_wait_ms: 3000,
            stop_service_wait_ms: 10_000,
            detection_service_wait_ms: 10_000,
            occupancy_service_wait_ms: 10_000,
            action_server_ready_ms: 5000,
            door_goal_ms: 20_000,
            settle_ms: 2000,
            tray_release_ms: 3000,
        }
    }
}

impl TimeoutConfig {
    pub fn service_wait(&self) -> Duration {
        Duration::from_millis(self.service_wait_ms)
    }

    pub fn stop_service_wait(&self) -> Duration {
        Duration::from_millis(self.stop_service_wait_ms)
    }

    pub fn detection_service_wait(&self) -> Duration {
        Duration::from_millis(self.detection_service_wait_ms)
    }

    pub fn occupancy_service_wait(&self) -> Duration {
        Duration::from_millis(self.occupancy_service_wait_ms)
    }

    pub fn action_server_ready(&self) -> Duration {
        Duration::from_millis(self.action_server_ready_ms)
    }

    pub fn door_goal(&self) -> Duration {
        Duration::from_millis(self.door_goal_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn tray_release(&self) -> Duration {
        Duration::from_millis(self.tray_release_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Objects at or above this height over the ground (m) are grasped from the side
    pub height_switch: f64,
    /// Detections farther than this (m, x-y plane) are ignored
    pub max_detection_distance: f64,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            height_switch: 0.5,
            max_detection_distance: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    pub deadline_ms: u64,
    pub cadence_ms: u64,
    /// Ask the operator when the tray sensor is unavailable instead of failing
    pub manual_confirmation_fallback: bool,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            deadline_ms: 20_000,
            cadence_ms: 2000,
            manual_confirmation_fallback: true,
        }
    }
}

/// IK seed configurations of the arm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArmConfig {
    pub pregrasp: Vec<f64>,
    pub pregrasp_top: Vec<f64>,
}

impl Default for ArmConfig {
    fn default() -> Self {
        Self {
            pregrasp: vec![-1.1572, -1.9104, -2.5334, -1.7853, -0.0727, 1.1514, -1.8386],
            pregrasp_top: vec![-0.5314, -1.4825, -2.6522, -1.4373, 0.5128, 1.0362, -2.0474],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Torso viewpoints, cycled through by retry count
    pub inspection_poses: Vec<String>,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            inspection_poses: vec![
                "back_right_extreme".to_string(),
                "back_extreme".to_string(),
                "back_left_extreme".to_string(),
            ],
        }
    }
}

impl MissionConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry.max_retries)
    }

    /// Idle-tick budget used while watching the base approach a pose
    pub fn approach_budget(&self) -> PollBudget {
        PollBudget::idle_ticks(
            Duration::from_millis(self.poll.cadence_ms),
            self.poll.max_idle_ticks,
        )
    }

    pub fn handle_error_backoff(&self) -> Duration {
        Duration::from_millis(self.poll.handle_error_backoff_ms)
    }

    /// Absolute deadline used while waiting for the tray to be emptied
    pub fn delivery_budget(&self) -> PollBudget {
        PollBudget::deadline(
            Duration::from_millis(self.delivery.cadence_ms),
            Duration::from_millis(self.delivery.deadline_ms),
        )
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.poll.cadence_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "poll.cadence_ms",
                self.poll.cadence_ms,
                "cadence must be greater than 0",
            ));
        }

        if self.delivery.cadence_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "delivery.cadence_ms",
                self.delivery.cadence_ms,
                "cadence must be greater than 0",
            ));
        }

        if !(self.selection.max_detection_distance > 0.0) {
            return Err(ConfigurationError::invalid_value(
                "selection.max_detection_distance",
                self.selection.max_detection_distance,
                "distance threshold must be greater than 0",
            ));
        }

        if !self.selection.height_switch.is_finite() {
            return Err(ConfigurationError::invalid_value(
                "selection.height_switch",
                self.selection.height_switch,
                "height threshold must be a finite number",
            ));
        }

        if self.detection.inspection_poses.is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "detection.inspection_poses",
                "detection configuration",
            ));
        }

        for (field, seed) in [
            ("arm.pregrasp", &self.arm.pregrasp),
            ("arm.pregrasp_top", &self.arm.pregrasp_top),
        ] {
            if seed.is_empty() {
                return Err(ConfigurationError::missing_required_field(
                    field,
                    "arm seed configuration",
                ));
            }
        }

        Ok(())
    }
}
