//! # State Machine Adapter
//!
//! Contract a task state satisfies to plug into an orchestrator.
//!
//! ## Overview
//!
//! A [`TaskState`] declares a closed outcome enumeration, the context keys it
//! reads and writes, and an `execute` operation that always returns one of its
//! declared outcomes. The orchestrator creates each state once per graph node
//! and calls `execute` once per visit; counters inside the state survive between
//! visits.
//!
//! [`StateMachineAdapter`] is the object-safe view of the same contract, with
//! outcomes reported by label. Every `TaskState` gets it through a blanket
//! implementation, so orchestrators can hold heterogeneous states in one table.

use async_trait::async_trait;
use tracing::debug;

use super::context::{ContextKey, ExecutionContext};
use super::outcomes::Outcome;
use crate::execution::PreemptSignal;

#[async_trait]
pub trait TaskState: Send {
    type Outcome: Outcome;

    /// Node name used in transition tables and logs
    fn name(&self) -> &str;

    fn input_keys(&self) -> &'static [ContextKey] {
        &[]
    }

    fn output_keys(&self) -> &'static [ContextKey] {
        &[]
    }

    /// Flag the orchestrator sets to request cooperative preemption.
    /// States that never poll do not observe preemption and return `None`.
    fn preempt_signal(&self) -> Option<&PreemptSignal> {
        None
    }

    /// Run one visit. Never fails: every error path maps to a declared outcome.
    async fn execute(&mut self, ctx: &mut ExecutionContext) -> Self::Outcome;
}

/// Label-based view of a [`TaskState`]
#[async_trait]
pub trait StateMachineAdapter: Send {
    fn name(&self) -> &str;

    fn outcomes(&self) -> Vec<&'static str>;

    fn input_keys(&self) -> &'static [ContextKey];

    fn output_keys(&self) -> &'static [ContextKey];

    /// Request preemption; returns `false` when the state cannot be preempted
    fn request_preempt(&self) -> bool;

    /// Run one visit and return the label of the outcome
    async fn run(&mut self, ctx: &mut ExecutionContext) -> &'static str;
}

#[async_trait]
impl<S> StateMachineAdapter for S
where
    S: TaskState,
{
    fn name(&self) -> &str {
        TaskState::name(self)
    }

    fn outcomes(&self) -> Vec<&'static str> {
        S::Outcome::labels()
    }

    fn input_keys(&self) -> &'static [ContextKey] {
        TaskState::input_keys(self)
    }

    fn output_keys(&self) -> &'static [ContextKey] {
        TaskState::output_keys(self)
    }

    fn request_preempt(&self) -> bool {
        match self.preempt_signal() {
            Some(signal) => {
                signal.request();
                true
            }
            None => false,
        }
    }

    async fn run(&mut self, ctx: &mut ExecutionContext) -> &'static str {
        debug!(
            state = %TaskState::name(self),
            mission_id = %ctx.mission_id(),
            "entering state"
        );
        self.execute(ctx).await.label()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_machine::SelectGraspOutcome;

    struct Fixed {
        outcome: SelectGraspOutcome,
        preempt: PreemptSignal,
    }

    #[async_trait]
    impl TaskState for Fixed {
        type Outcome = SelectGraspOutcome;

        fn name(&self) -> &str {
            "fixed"
        }

        fn input_keys(&self) -> &'static [ContextKey] {
            &[ContextKey::Object]
        }

        fn preempt_signal(&self) -> Option<&PreemptSignal> {
            Some(&self.preempt)
        }

        async fn execute(&mut self, _ctx: &mut ExecutionContext) -> SelectGraspOutcome {
            self.outcome
        }
    }

    #[tokio::test]
    async fn test_adapter_reports_labels() {
        let mut state = Fixed {
            outcome: SelectGraspOutcome::Side,
            preempt: PreemptSignal::new(),
        };
        let adapter: &mut dyn StateMachineAdapter = &mut state;
        let mut ctx = ExecutionContext::new();

        assert_eq!(adapter.outcomes(), vec!["top", "side", "failed"]);
        assert_eq!(adapter.input_keys(), &[ContextKey::Object]);
        assert!(adapter.output_keys().is_empty());
        assert_eq!(adapter.run(&mut ctx).await, "side");
    }

    #[test]
    fn test_preempt_request_reaches_state_signal() {
        let state = Fixed {
            outcome: SelectGraspOutcome::Top,
            preempt: PreemptSignal::new(),
        };
        assert!(StateMachineAdapter::request_preempt(&state));
        assert!(state.preempt.is_requested());
    }
}
