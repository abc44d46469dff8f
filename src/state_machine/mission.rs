//! # Mission Runner
//!
//! Minimal sequential driver for task states: a transition table maps
//! `(state, outcome)` to the next state or to a mission-level result, and the
//! runner executes one state at a time against a single [`ExecutionContext`].
//!
//! This is not a hierarchical state-machine framework. It exists to exercise the
//! adapter contract end to end and to drive short missions from the command line.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, warn};

use super::adapter::{StateMachineAdapter, TaskState};
use super::context::ExecutionContext;
use super::outcomes::Outcome;
use crate::error::MissionError;
use crate::logging::log_state_outcome;

pub const DEFAULT_STEP_LIMIT: usize = 64;

/// Where an outcome leads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "target", rename_all = "snake_case")]
pub enum Transition {
    /// Continue with the named state
    Next(String),
    /// Finish the mission with this result label
    Finish(String),
}

impl Transition {
    pub fn to(state: impl Into<String>) -> Self {
        Self::Next(state.into())
    }

    pub fn finish(label: impl Into<String>) -> Self {
        Self::Finish(label.into())
    }
}

/// `(state, outcome label) -> transition`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionTable {
    entries: HashMap<String, HashMap<String, Transition>>,
}

impl TransitionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, state: &str, outcome: &str, transition: Transition) {
        self.entries
            .entry(state.to_string())
            .or_default()
            .insert(outcome.to_string(), transition);
    }

    pub fn get(&self, state: &str, outcome: &str) -> Option<&Transition> {
        self.entries.get(state).and_then(|row| row.get(outcome))
    }

    fn row(&self, state: &str) -> impl Iterator<Item = (&String, &Transition)> {
        self.entries.get(state).into_iter().flat_map(|row| row.iter())
    }
}

/// One executed state and the outcome it reported
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionStep {
    pub state: String,
    pub outcome: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionReport {
    /// Label of the `Finish` transition that ended the mission
    pub result: String,
    pub steps: Vec<MissionStep>,
}

impl MissionReport {
    /// How often `state` was visited
    pub fn visits(&self, state: &str) -> usize {
        self.steps.iter().filter(|s| s.state == state).count()
    }
}

pub struct Mission {
    initial: String,
    states: Vec<Box<dyn StateMachineAdapter>>,
    index: HashMap<String, usize>,
    table: TransitionTable,
    step_limit: usize,
}

impl Mission {
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            initial: initial.into(),
            states: Vec::new(),
            index: HashMap::new(),
            table: TransitionTable::new(),
            step_limit: DEFAULT_STEP_LIMIT,
        }
    }

    pub fn with_step_limit(mut self, step_limit: usize) -> Self {
        self.step_limit = step_limit;
        self
    }

    /// Register a state together with the transitions of its outcomes
    pub fn add_state<S>(
        &mut self,
        state: S,
        transitions: impl IntoIterator<Item = (S::Outcome, Transition)>,
    ) -> Result<&mut Self, MissionError>
    where
        S: TaskState + 'static,
    {
        let name = TaskState::name(&state).to_string();
        if self.index.contains_key(&name) {
            return Err(MissionError::DuplicateState(name));
        }

        for (outcome, transition) in transitions {
            self.table.insert(&name, outcome.label(), transition);
        }
        self.index.insert(name, self.states.len());
        self.states.push(Box::new(state));
        Ok(self)
    }

    /// Register an already erased state with label-keyed transitions
    pub fn add_adapter(
        &mut self,
        state: Box<dyn StateMachineAdapter>,
        transitions: impl IntoIterator<Item = (String, Transition)>,
    ) -> Result<&mut Self, MissionError> {
        let name = state.name().to_string();
        if self.index.contains_key(&name) {
            return Err(MissionError::DuplicateState(name));
        }

        for (outcome, transition) in transitions {
            self.table.insert(&name, &outcome, transition);
        }
        self.index.insert(name, self.states.len());
        self.states.push(state);
        Ok(self)
    }

    pub fn table(&self) -> &TransitionTable {
        &self.table
    }

    /// Every declared outcome must be mapped, every mapped outcome declared and
    /// every `Next` target registered
    pub fn validate(&self) -> Result<(), MissionError> {
        if !self.index.contains_key(&self.initial) {
            return Err(MissionError::UnknownState(self.initial.clone()));
        }

        for state in &self.states {
            let name = state.name();
            let declared = state.outcomes();

            for outcome in &declared {
                if self.table.get(name, outcome).is_none() {
                    return Err(MissionError::IncompleteTransitions {
                        state: name.to_string(),
                        outcome: outcome.to_string(),
                    });
                }
            }

            for (outcome, transition) in self.table.row(name) {
                if !declared.contains(&outcome.as_str()) {
                    return Err(MissionError::UndeclaredOutcome {
                        state: name.to_string(),
                        outcome: outcome.clone(),
                    });
                }
                if let Transition::Next(target) = transition {
                    if !self.index.contains_key(target) {
                        return Err(MissionError::UnknownState(target.clone()));
                    }
                }
            }
        }
        Ok(())
    }

    /// Run from the initial state until a `Finish` transition or the step limit
    pub async fn run(&mut self, ctx: &mut ExecutionContext) -> Result<MissionReport, MissionError> {
        self.validate()?;

        let mut current = self.initial.clone();
        let mut steps = Vec::new();

        while steps.len() < self.step_limit {
            let slot = *self
                .index
                .get(&current)
                .ok_or_else(|| MissionError::UnknownState(current.clone()))?;
            let outcome = self.states[slot].run(ctx).await;

            log_state_outcome(&current, outcome, None, None);
            steps.push(MissionStep {
                state: current.clone(),
                outcome: outcome.to_string(),
            });

            match self.table.get(&current, outcome) {
                Some(Transition::Next(next)) => current = next.clone(),
                Some(Transition::Finish(result)) => {
                    info!(
                        mission_id = %ctx.mission_id(),
                        result = %result,
                        steps = steps.len(),
                        "🏁 MISSION finished"
                    );
                    return Ok(MissionReport {
                        result: result.clone(),
                        steps,
                    });
                }
                None => {
                    return Err(MissionError::UnmappedOutcome {
                        state: current,
                        outcome: outcome.to_string(),
                    })
                }
            }
        }

        warn!(
            mission_id = %ctx.mission_id(),
            step_limit = self.step_limit,
            "mission aborted at step limit"
        );
        Err(MissionError::StepLimitExceeded(self.step_limit))
    }

    /// Forward a preemption request to the state named `state`
    pub fn preempt(&self, state: &str) -> Result<bool, MissionError> {
        let slot = self
            .index
            .get(state)
            .ok_or_else(|| MissionError::UnknownState(state.to_string()))?;
        Ok(self.states[*slot].request_preempt())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_machine::{RetryOutcome, SimpleOutcome};
    use async_trait::async_trait;
    use std::collections::VecDeque;

    struct Scripted<O: Outcome> {
        name: &'static str,
        script: VecDeque<O>,
        fallback: O,
    }

    impl<O: Outcome> Scripted<O> {
        fn new(name: &'static str, script: Vec<O>, fallback: O) -> Self {
            Self {
                name,
                script: script.into(),
                fallback,
            }
        }
    }

    #[async_trait]
    impl<O: Outcome> TaskState for Scripted<O> {
        type Outcome = O;

        fn name(&self) -> &str {
            self.name
        }

        async fn execute(&mut self, _ctx: &mut ExecutionContext) -> O {
            self.script.pop_front().unwrap_or(self.fallback)
        }
    }

    fn detect_then_deliver(detect: Vec<RetryOutcome>) -> Mission {
        let mut mission = Mission::new("detect");
        mission
            .add_state(
                Scripted::new("detect", detect, RetryOutcome::Succeeded),
                [
                    (RetryOutcome::Succeeded, Transition::to("deliver")),
                    (RetryOutcome::Retry, Transition::to("detect")),
                    (RetryOutcome::NoMoreRetries, Transition::finish("not_found")),
                    (RetryOutcome::Failed, Transition::finish("failed")),
                ],
            )
            .unwrap()
            .add_state(
                Scripted::new("deliver", vec![], SimpleOutcome::Succeeded),
                [
                    (SimpleOutcome::Succeeded, Transition::finish("done")),
                    (SimpleOutcome::Failed, Transition::finish("failed")),
                ],
            )
            .unwrap();
        mission
    }

    #[tokio::test]
    async fn test_retry_loops_back_until_success() {
        let mut mission = detect_then_deliver(vec![RetryOutcome::Retry, RetryOutcome::Retry]);
        let report = mission.run(&mut ExecutionContext::new()).await.unwrap();

        assert_eq!(report.result, "done");
        assert_eq!(report.visits("detect"), 3);
        assert_eq!(report.visits("deliver"), 1);
    }

    #[tokio::test]
    async fn test_exhaustion_takes_recovery_branch() {
        let mut mission = detect_then_deliver(vec![
            RetryOutcome::Retry,
            RetryOutcome::Retry,
            RetryOutcome::NoMoreRetries,
        ]);
        let report = mission.run(&mut ExecutionContext::new()).await.unwrap();
        assert_eq!(report.result, "not_found");
        assert_eq!(report.steps.last().unwrap().outcome, "no_more_retries");
    }

    #[tokio::test]
    async fn test_step_limit_stops_endless_retry() {
        let mut mission = Mission::new("detect").with_step_limit(5);
        mission
            .add_state(
                Scripted::new("detect", vec![], RetryOutcome::Retry),
                [
                    (RetryOutcome::Succeeded, Transition::finish("done")),
                    (RetryOutcome::Retry, Transition::to("detect")),
                    (RetryOutcome::NoMoreRetries, Transition::finish("not_found")),
                    (RetryOutcome::Failed, Transition::finish("failed")),
                ],
            )
            .unwrap();

        let err = mission.run(&mut ExecutionContext::new()).await.unwrap_err();
        assert_eq!(err, MissionError::StepLimitExceeded(5));
    }

    #[test]
    fn test_validation_rejects_unmapped_outcome() {
        let mut mission = Mission::new("deliver");
        mission
            .add_state(
                Scripted::new("deliver", vec![], SimpleOutcome::Succeeded),
                [(SimpleOutcome::Succeeded, Transition::finish("done"))],
            )
            .unwrap();

        assert_eq!(
            mission.validate().unwrap_err(),
            MissionError::IncompleteTransitions {
                state: "deliver".to_string(),
                outcome: "failed".to_string()
            }
        );
    }

    #[test]
    fn test_validation_rejects_unknown_target_and_duplicates() {
        let mut mission = Mission::new("deliver");
        mission
            .add_state(
                Scripted::new("deliver", vec![], SimpleOutcome::Succeeded),
                [
                    (SimpleOutcome::Succeeded, Transition::to("celebrate")),
                    (SimpleOutcome::Failed, Transition::finish("failed")),
                ],
            )
            .unwrap();
        assert_eq!(
            mission.validate().unwrap_err(),
            MissionError::UnknownState("celebrate".to_string())
        );

        let duplicate = mission.add_state(
            Scripted::new("deliver", vec![], SimpleOutcome::Failed),
            [],
        );
        assert!(matches!(duplicate, Err(MissionError::DuplicateState(_))));
    }

    #[test]
    fn test_validation_rejects_undeclared_label() {
        let mut mission = Mission::new("deliver");
        mission
            .add_adapter(
                Box::new(Scripted::new("deliver", vec![], SimpleOutcome::Succeeded)),
                [
                    ("succeeded".to_string(), Transition::finish("done")),
                    ("failed".to_string(), Transition::finish("failed")),
                    ("retry".to_string(), Transition::to("deliver")),
                ],
            )
            .unwrap();

        assert!(matches!(
            mission.validate(),
            Err(MissionError::UndeclaredOutcome { .. })
        ));
    }
}
