//! Renders orchestrator events through a [`UserInterface`].

use std::sync::mpsc::Receiver;

use tracing::debug;

use crate::runner::{RunEvent, RunState, StatusKind};
use crate::steps::{StepSnapshot, StepStatus};

use super::{SpinnerHandle, UserInterface};

/// Turns a stream of [`RunEvent`]s into spinners and status lines.
///
/// One spinner is live per in-flight step. Status text from the step body is
/// shown as detail lines under it.
pub struct RunReporter<'a> {
    ui: &'a mut dyn UserInterface,
    product: String,
    total: usize,
    position: usize,
    spinner: Option<(String, Box<dyn SpinnerHandle>)>,
}

impl<'a> RunReporter<'a> {
    /// Create a reporter for a run of `total` selected steps.
    pub fn new(ui: &'a mut dyn UserInterface, product: impl Into<String>, total: usize) -> Self {
        Self {
            ui,
            product: product.into(),
            total,
            position: 0,
            spinner: None,
        }
    }

    /// Handle one event. Returns the terminal state once the run has ended.
    pub fn handle(&mut self, event: &RunEvent) -> Option<RunState> {
        match event {
            RunEvent::RunStarted { kind, workflow } => {
                self.position = 0;
                self.ui
                    .show_run_header(&self.product, *kind, *workflow, self.total);
            }
            RunEvent::StepStarting(step) => {
                self.position += 1;
                let label = format!("[{}/{}] {}", self.position, self.total, step.description);
                let spinner = self.ui.start_spinner(&label);
                self.spinner = Some((step.description.clone(), spinner));
            }
            RunEvent::StatusMessage { kind, text } => match kind {
                StatusKind::Info | StatusKind::Waiting => match self.spinner.as_mut() {
                    Some((_, spinner)) => spinner.push_detail(text),
                    None => debug!("Status outside a step: {}", text),
                },
                StatusKind::Error => self.ui.warning(text),
            },
            RunEvent::StepFinished(step) => self.finish_step(step),
            RunEvent::RunTimedOut {
                elapsed,
                budget,
                current_step,
            } => {
                let step = current_step
                    .as_deref()
                    .map(|name| format!(" (in '{}')", name))
                    .unwrap_or_default();
                self.ui.warning(&format!(
                    "Run is taking longer than expected: {}s of {}s{}",
                    elapsed.as_secs(),
                    budget.as_secs(),
                    step
                ));
            }
            RunEvent::RunEnded { state, .. } => {
                if let Some((description, mut spinner)) = self.spinner.take() {
                    spinner.finish_skipped(&format!("{} (cancelled)", description));
                }
                return Some(*state);
            }
        }
        None
    }

    /// Consume events until the run ends.
    ///
    /// Returns `None` if every sender went away first.
    pub fn follow(&mut self, events: &Receiver<RunEvent>) -> Option<RunState> {
        for event in events.iter() {
            if let Some(state) = self.handle(&event) {
                return Some(state);
            }
        }
        None
    }

    fn finish_step(&mut self, step: &StepSnapshot) {
        let Some((_, mut spinner)) = self.spinner.take() else {
            debug!("Finished step '{}' had no spinner", step.name);
            return;
        };

        match step.status {
            StepStatus::Finished if step.has_failed_substeps() => {
                spinner.finish_warning(&format!("{} (with failed actions)", step.description));
                for sub in step
                    .substeps
                    .iter()
                    .filter(|sub| sub.status == StepStatus::Error)
                {
                    let reason = sub.message.as_deref().unwrap_or("failed");
                    self.ui
                        .warning(&format!("{}: {}", sub.description, reason));
                }
            }
            StepStatus::Finished => spinner.finish_success(&step.description),
            StepStatus::Error => {
                let reason = step.message.as_deref().unwrap_or("unknown error");
                let line = format!("{} - {}", step.description, reason);
                if step.required {
                    spinner.finish_error(&line);
                } else {
                    spinner.finish_warning(&line);
                }
            }
            StepStatus::NotStarted | StepStatus::Started => {
                spinner.finish_skipped(&step.description);
            }
        }
    }
}
