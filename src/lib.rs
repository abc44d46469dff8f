#![allow(clippy::doc_markdown)] // Allow technical terms like IK, SDH in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Robot Task States
//!
//! Retrying task states for a mobile manipulator that fetches objects and hands
//! them over on its tray.
//!
//! ## Overview
//!
//! Each state performs one behaviour (approach a pose, detect an object, grasp it,
//! open a door, put it on the tray, deliver it) and reports a short outcome label.
//! An external mission state machine maps those labels to transitions. States
//! share a small execution toolkit:
//!
//! - [`RetryPolicy`](execution::RetryPolicy) - bounded attempt counter that survives between visits
//! - [`ActionInvoker`](execution::ActionInvoker) - uniform blocking/non-blocking motion commands and service calls
//! - [`PollLoop`](execution::PollLoop) - fixed-cadence poller with idle-tick and deadline budgets
//! - [`StateMachineAdapter`](state_machine::StateMachineAdapter) - outcome/key metadata exposed to the orchestrator
//!
//! ## Module Organization
//!
//! - [`states`] - the task states
//! - [`execution`] - retry, invocation, polling, preemption and tick sources
//! - [`state_machine`] - outcomes, execution context, adapter contract and a sequential mission runner
//! - [`collaborators`] - interfaces to motion, perception and services
//! - [`config`] - layered mission configuration
//! - [`logging`] - structured logging setup and helpers
//! - [`error`] - structured error handling
//! - [`test_helpers`] - scripted collaborators for tests
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use robot_task_states::config::ConfigManager;
//! use robot_task_states::state_machine::{ExecutionContext, Mission, SimpleOutcome, Transition};
//! use robot_task_states::states::ApproachPose;
//! use robot_task_states::test_helpers::FakeRobot;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let robot = FakeRobot::new();
//! let collaborators = robot.collaborators();
//!
//! let mut mission = Mission::new("approach");
//! mission.add_state(
//!     ApproachPose::new(&collaborators, manager.config()).named("approach"),
//!     [
//!         (SimpleOutcome::Succeeded, Transition::finish("arrived")),
//!         (SimpleOutcome::Failed, Transition::finish("aborted")),
//!     ],
//! )?;
//!
//! let mut ctx = ExecutionContext::new();
//! ctx.set_base_pose(robot_task_states::state_machine::BaseTarget::named("kitchen"));
//! let report = mission.run(&mut ctx).await?;
//! println!("mission ended with {}", report.result);
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing
//!
//! ```bash
//! cargo test --lib    # Unit tests
//! cargo test          # All tests
//! ```

pub mod collaborators;
pub mod config;
pub mod constants;
pub mod error;
pub mod execution;
pub mod geometry;
pub mod logging;
pub mod state_machine;
pub mod states;
pub mod test_helpers;

pub use collaborators::{Collaborators, DetectedObject, GoalStatus, MotionTarget};
pub use crate::config::{ConfigManager, MissionConfig};
pub use error::{ContextError, InvocationError, MissionError, Result, ServiceError};
pub use execution::{
    ActionInvoker, PollBudget, PollLoop, PollOutcome, PreemptSignal, RetryPolicy, TokioTicker,
    VirtualTicker,
};
pub use state_machine::{
    ExecutionContext, Mission, MissionReport, StateMachineAdapter, TaskState, Transition,
};
