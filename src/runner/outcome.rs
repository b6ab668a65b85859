//! Terminal run states and the reducers that compute them.

use std::fmt;

use crate::steps::{StepSnapshot, StepStatus};

/// Overall state of a workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Plan has steps to run and no run has happened yet.
    Required,
    /// A run is executing.
    InProgress,
    /// The run ended without a significant failure.
    Complete,
    /// Presentation-only refinement of `Complete`; the reducers never produce it.
    CompleteWithWarnings,
    /// The run ended with a significant failure.
    Error,
    /// The run was cancelled by the caller.
    Cancelled,
    /// Nothing in the plan applies to the requested workflow.
    Unnecessary,
}

impl RunState {
    /// True for the states a finished run can end in.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunState::Complete
                | RunState::CompleteWithWarnings
                | RunState::Error
                | RunState::Cancelled
        )
    }

    /// True for terminal states that count as success.
    pub fn is_success(&self) -> bool {
        matches!(self, RunState::Complete | RunState::CompleteWithWarnings)
    }

    /// Fold a "has warnings" signal into the state for display.
    ///
    /// Only `Complete` is refined; every other state is returned unchanged.
    pub fn with_warnings(self, has_warnings: bool) -> Self {
        match self {
            RunState::Complete if has_warnings => RunState::CompleteWithWarnings,
            other => other,
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunState::Required => "required",
            RunState::InProgress => "in progress",
            RunState::Complete => "complete",
            RunState::CompleteWithWarnings => "completed with warnings",
            RunState::Error => "error",
            RunState::Cancelled => "cancelled",
            RunState::Unnecessary => "unnecessary",
        };
        write!(f, "{}", s)
    }
}

/// Terminal state of a configure run.
///
/// `steps` are the filtered steps of the run. Cancellation wins without
/// looking at statuses; otherwise any `Error` fails the run.
pub fn reduce_configure(steps: &[StepSnapshot], cancelled: bool) -> RunState {
    if cancelled {
        return RunState::Cancelled;
    }
    if steps.iter().any(|s| s.status == StepStatus::Error) {
        RunState::Error
    } else {
        RunState::Complete
    }
}

/// Terminal state of a remove run.
///
/// Only required failures count: a required top-level step in `Error`, or a
/// required sub-step in `Error` anywhere. Optional failures still yield
/// `Complete`.
pub fn reduce_remove(steps: &[StepSnapshot], cancelled: bool) -> RunState {
    if cancelled {
        return RunState::Cancelled;
    }
    let required_failed = steps.iter().any(|s| {
        (s.required && s.status == StepStatus::Error)
            || s
                .substeps
                .iter()
                .any(|sub| sub.required && sub.status == StepStatus::Error)
    });
    if required_failed {
        RunState::Error
    } else {
        RunState::Complete
    }
}

/// True if any optional failure happened in a remove run.
///
/// Callers use this to label a `Complete` removal as "completed with
/// warnings"; it never changes the terminal state itself.
pub fn has_remove_warnings(steps: &[StepSnapshot]) -> bool {
    steps
        .iter()
        .any(|s| s.status == StepStatus::Error || s.has_failed_substeps())
}
