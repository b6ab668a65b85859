//! Grouped sub-steps for remove workflows.
//!
//! Removing one product usually means several independent actions (stop the
//! service, delete it, remove files). A group runs all of its sub-steps in
//! order and fails only when a required sub-step fails; optional sub-step
//! failures are recorded but leave the group `Finished`.

use std::fmt;
use std::sync::atomic::AtomicBool;

use tracing::{debug, warn};

use crate::runner::events::StatusKind;

use super::step::{invoke, StepBody, StepContext, StepFailure, StepOutcome, StepStatus};

/// One action inside a group step.
pub struct SubStep {
    description: String,
    required: bool,
    body: StepBody,
    status: StepStatus,
    message: Option<String>,
}

impl SubStep {
    /// Create an optional sub-step.
    pub fn new<F>(description: impl Into<String>, body: F) -> Self
    where
        F: FnMut(&mut StepContext<'_>) -> StepOutcome + Send + 'static,
    {
        Self {
            description: description.into(),
            required: false,
            body: Box::new(body),
            status: StepStatus::NotStarted,
            message: None,
        }
    }

    /// Mark the sub-step as required for its group.
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn status(&self) -> StepStatus {
        self.status
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub(crate) fn reset(&mut self) {
        self.status = StepStatus::NotStarted;
        self.message = None;
    }

    pub(crate) fn snapshot(&self) -> SubStepSnapshot {
        SubStepSnapshot {
            description: self.description.clone(),
            required: self.required,
            status: self.status,
            message: self.message.clone(),
        }
    }
}

impl fmt::Debug for SubStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubStep")
            .field("description", &self.description)
            .field("required", &self.required)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// Read-only view of a sub-step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubStepSnapshot {
    pub description: String,
    pub required: bool,
    pub status: StepStatus,
    pub message: Option<String>,
}

/// Run every sub-step in order.
///
/// Returns the first required sub-step failure, if any. Cancellation is not
/// checked between sub-steps; a group is one step from the run's point of view.
pub(crate) fn run_group(
    subs: &mut [SubStep],
    cancelled: &AtomicBool,
    on_status: &dyn Fn(StatusKind, &str),
) -> StepOutcome {
    let mut required_failure: Option<StepFailure> = None;

    for sub in subs.iter_mut() {
        sub.status = StepStatus::Started;
        on_status(StatusKind::Info, &sub.description);

        let outcome = {
            let mut ctx = StepContext::new(&mut sub.description, cancelled, on_status);
            invoke(&mut sub.body, &mut ctx)
        };

        match outcome {
            Ok(()) => {
                debug!("Sub-step '{}' finished", sub.description);
                sub.status = StepStatus::Finished;
            }
            Err(failure) => {
                warn!(
                    "Sub-step '{}' failed (required: {}): {}",
                    sub.description, sub.required, failure
                );
                on_status(
                    StatusKind::Error,
                    &format!("{}: {}", sub.description, failure),
                );
                sub.status = StepStatus::Error;
                sub.message = Some(failure.message.clone());
                if sub.required && required_failure.is_none() {
                    required_failure = Some(failure);
                }
            }
        }
    }

    match required_failure {
        Some(failure) => Err(failure),
        None => Ok(()),
    }
}
