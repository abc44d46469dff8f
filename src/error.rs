use std::time::Duration;
use thiserror::Error;

use crate::collaborators::GoalStatus;

/// Failure reported by an external collaborator (service, action server, transform tree)
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ServiceError {
    /// The service did not become available within its connection timeout
    #[error("service <<{service}>> not available after {waited:?}")]
    Unavailable { service: String, waited: Duration },

    /// The call reached the service but raised mid-flight
    #[error("calling <<{service}>> failed: {reason}")]
    CallFailed { service: String, reason: String },

    /// A pose could not be expressed in the requested frame
    #[error("transformation from {from_frame} to {to_frame} not possible: {reason}")]
    TransformFailed {
        from_frame: String,
        to_frame: String,
        reason: String,
    },

    /// An action finished in a non-success terminal status
    #[error("action on {group} ended with status {status}")]
    ActionFailed { group: String, status: GoalStatus },
}

impl ServiceError {
    pub fn unavailable(service: impl Into<String>, waited: Duration) -> Self {
        Self::Unavailable {
            service: service.into(),
            waited,
        }
    }

    pub fn call_failed(service: impl Into<String>, reason: impl ToString) -> Self {
        Self::CallFailed {
            service: service.into(),
            reason: reason.to_string(),
        }
    }

    /// Name of the service or component that produced the error, for log context
    pub fn service(&self) -> &str {
        match self {
            Self::Unavailable { service, .. } | Self::CallFailed { service, .. } => service,
            Self::TransformFailed { .. } => crate::constants::services::TRANSFORM,
            Self::ActionFailed { group, .. } => group,
        }
    }
}

/// Failure of a single motion command issued through the action invoker
#[derive(Debug, Clone, PartialEq, Error)]
#[error("motion command {group} -> {target} failed")]
pub struct InvocationError {
    pub group: String,
    pub target: String,
    #[source]
    pub source: ServiceError,
}

/// Errors raised while reading or writing the execution context
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("context key '{0}' has not been set")]
    Missing(&'static str),

    #[error("context key '{key}' holds an invalid value: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Errors raised by the mission runner when the transition table is inconsistent
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MissionError {
    #[error("state '{0}' is not registered in the mission")]
    UnknownState(String),

    #[error("state '{state}' returned outcome '{outcome}' which has no transition")]
    UnmappedOutcome { state: String, outcome: String },

    #[error("state '{state}' declares outcome '{outcome}' but the transition table does not map it")]
    IncompleteTransitions { state: String, outcome: String },

    #[error("transition table maps unknown outcome '{outcome}' for state '{state}'")]
    UndeclaredOutcome { state: String, outcome: String },

    #[error("state '{0}' is registered twice")]
    DuplicateState(String),

    #[error("mission exceeded {0} state executions without reaching a terminal outcome")]
    StepLimitExceeded(usize),
}

pub type Result<T> = std::result::Result<T, ServiceError>;
