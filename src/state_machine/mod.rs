// State machine module for task-state orchestration
//
// Outcome enumerations, the typed execution context, the adapter contract each
// task state satisfies, and a small sequential mission runner.

pub mod adapter;
pub mod context;
pub mod mission;
pub mod outcomes;

// Re-export main types for convenient access
pub use adapter::{StateMachineAdapter, TaskState};
pub use context::{BaseTarget, ContextKey, ExecutionContext};
pub use mission::{Mission, MissionReport, MissionStep, Transition, TransitionTable};
pub use outcomes::{DeliverOutcome, Outcome, RetryOutcome, SelectGraspOutcome, SimpleOutcome};
