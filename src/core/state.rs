//! Step and scenario execution state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// State of a single step
///
/// Moves forward only: `NotRun -> Skipped`, or
/// `NotRun -> Running -> Success | Warning | Failure`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepState {
    /// Step has not been reached yet
    NotRun,
    /// Step is currently running
    Running { started_at: DateTime<Utc> },
    /// Step finished without complaints
    Success {
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    },
    /// Step finished but recorded warnings
    Warning {
        message: String,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    },
    /// Step failed (assertion, command error or panic)
    Failure {
        message: String,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    },
    /// Step is not applicable on this host
    Skipped { reason: String },
}

impl StepState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StepState::Success { .. }
                | StepState::Warning { .. }
                | StepState::Failure { .. }
                | StepState::Skipped { .. }
        )
    }

    /// Whether moving from this state to `next` is allowed
    pub fn can_transition_to(&self, next: &StepState) -> bool {
        match self {
            StepState::NotRun => matches!(next, StepState::Running { .. } | StepState::Skipped { .. }),
            StepState::Running { .. } => matches!(
                next,
                StepState::Success { .. } | StepState::Warning { .. } | StepState::Failure { .. }
            ),
            _ => false,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            StepState::NotRun => "not_run",
            StepState::Running { .. } => "running",
            StepState::Success { .. } => "success",
            StepState::Warning { .. } => "warning",
            StepState::Failure { .. } => "failure",
            StepState::Skipped { .. } => "skipped",
        }
    }

    /// Failure or warning message, or the skip reason
    pub fn message(&self) -> Option<&str> {
        match self {
            StepState::Warning { message, .. } | StepState::Failure { message, .. } => {
                Some(message.as_str())
            }
            StepState::Skipped { reason } => Some(reason.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for StepState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Aggregate result of a scenario run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioStatus {
    Success,
    Warning,
    Failure,
}

impl ScenarioStatus {
    /// Failure if any step failed, else warning if any warned, else success
    pub fn aggregate<'a>(states: impl IntoIterator<Item = &'a StepState>) -> Self {
        states
            .into_iter()
            .map(|state| match state {
                StepState::Failure { .. } => ScenarioStatus::Failure,
                StepState::Warning { .. } => ScenarioStatus::Warning,
                _ => ScenarioStatus::Success,
            })
            .max()
            .unwrap_or(ScenarioStatus::Success)
    }
}

impl fmt::Display for ScenarioStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScenarioStatus::Success => "success",
            ScenarioStatus::Warning => "warning",
            ScenarioStatus::Failure => "failure",
        };
        f.write_str(name)
    }
}
