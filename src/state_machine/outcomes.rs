use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;

/// Closed set of results a task state reports to the orchestrator.
///
/// Each state declares its own enum; the transition table is keyed by
/// [`Outcome::label`], so labels must be unique within one enum.
pub trait Outcome:
    Copy + Eq + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static
{
    /// Every variant, in declaration order
    fn all() -> &'static [Self];

    fn label(&self) -> &'static str;

    /// Outcomes after which the state's retry bookkeeping has been reset
    fn is_terminal(&self) -> bool;

    /// Labels of every variant, in declaration order
    fn labels() -> Vec<&'static str> {
        Self::all().iter().map(Outcome::label).collect()
    }
}

/// Outcome of single-shot states without retry bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimpleOutcome {
    Succeeded,
    Failed,
}

impl Outcome for SimpleOutcome {
    fn all() -> &'static [Self] {
        &[Self::Succeeded, Self::Failed]
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }

    fn is_terminal(&self) -> bool {
        true
    }
}

impl fmt::Display for SimpleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl std::str::FromStr for SimpleOutcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "succeeded" => Ok(Self::Succeeded),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Invalid outcome: {s}")),
        }
    }
}

/// Outcome of the retry-capable states (grasp, door, detection)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryOutcome {
    Succeeded,
    /// Transient failure; the state counted it and wants another visit
    Retry,
    /// Retry budget exhausted; the orchestrator should take a recovery branch
    NoMoreRetries,
    /// Hard failure, not worth retrying
    Failed,
}

impl RetryOutcome {
    pub fn is_retry(&self) -> bool {
        matches!(self, Self::Retry)
    }
}

impl Outcome for RetryOutcome {
    fn all() -> &'static [Self] {
        &[Self::Succeeded, Self::Retry, Self::NoMoreRetries, Self::Failed]
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Retry => "retry",
            Self::NoMoreRetries => "no_more_retries",
            Self::Failed => "failed",
        }
    }

    fn is_terminal(&self) -> bool {
        !self.is_retry()
    }
}

impl fmt::Display for RetryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl std::str::FromStr for RetryOutcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "succeeded" => Ok(Self::Succeeded),
            "retry" => Ok(Self::Retry),
            "no_more_retries" => Ok(Self::NoMoreRetries),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Invalid retry outcome: {s}")),
        }
    }
}

/// Grasp strategy chosen from the object height
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectGraspOutcome {
    Top,
    Side,
    Failed,
}

impl Outcome for SelectGraspOutcome {
    fn all() -> &'static [Self] {
        &[Self::Top, Self::Side, Self::Failed]
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Side => "side",
            Self::Failed => "failed",
        }
    }

    fn is_terminal(&self) -> bool {
        true
    }
}

impl fmt::Display for SelectGraspOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl std::str::FromStr for SelectGraspOutcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "top" => Ok(Self::Top),
            "side" => Ok(Self::Side),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Invalid grasp selection: {s}")),
        }
    }
}

/// Outcome of the delivery state. `retry` here is a caller-level retry: the
/// tray was still occupied when the deadline expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliverOutcome {
    Succeeded,
    Retry,
    Failed,
}

impl Outcome for DeliverOutcome {
    fn all() -> &'static [Self] {
        &[Self::Succeeded, Self::Retry, Self::Failed]
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Retry => "retry",
            Self::Failed => "failed",
        }
    }

    fn is_terminal(&self) -> bool {
        true
    }
}

impl fmt::Display for DeliverOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl std::str::FromStr for DeliverOutcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "succeeded" => Ok(Self::Succeeded),
            "retry" => Ok(Self::Retry),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Invalid delivery outcome: {s}")),
        }
    }
}
