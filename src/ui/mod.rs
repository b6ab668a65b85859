//! Terminal user interface.
//!
//! This module provides:
//! - [`UserInterface`] trait for UI abstraction
//! - [`TerminalUI`] for interactive terminal usage
//! - [`NonInteractiveUI`] for CI/headless environments
//! - [`RunReporter`], which renders orchestrator events through a UI
//!
//! # Example
//!
//! ```
//! use stagehand::ui::{create_ui, OutputMode};
//!
//! // Use non-interactive mode for testability
//! let mut ui = create_ui(false, OutputMode::Silent);
//! ui.show_header("demo");
//! ui.success("Configuration complete");
//! ```

pub mod mock;
pub mod non_interactive;
pub mod output;
pub mod reporter;
pub mod spinner;
pub mod terminal;
pub mod theme;

pub use mock::MockUI;
pub use non_interactive::NonInteractiveUI;
pub use output::OutputMode;
pub use reporter::RunReporter;
pub use spinner::ProgressSpinner;
pub use terminal::{create_ui, TerminalUI};
pub use theme::{should_use_colors, StagehandTheme};

use std::time::Duration;

use crate::runner::{RunKind, RunState};
use crate::steps::{StepSnapshot, WorkflowMask};

/// Trait for user interface interactions.
///
/// This trait allows mocking the UI in tests.
pub trait UserInterface {
    /// Get the current output mode.
    fn output_mode(&self) -> OutputMode;

    /// Display a message to the user.
    fn message(&mut self, msg: &str);

    /// Display a success message.
    fn success(&mut self, msg: &str);

    /// Display a warning message.
    fn warning(&mut self, msg: &str);

    /// Display an error message. Shown in every mode.
    fn error(&mut self, msg: &str);

    /// Start a spinner for the in-flight step.
    fn start_spinner(&mut self, message: &str) -> Box<dyn SpinnerHandle>;

    /// Show a header/banner.
    fn show_header(&mut self, title: &str);

    /// Show the banner that opens a run.
    fn show_run_header(
        &mut self,
        product: &str,
        kind: RunKind,
        workflow: WorkflowMask,
        step_count: usize,
    );

    /// Show the per-step table and verdict that close a run.
    fn show_run_summary(&mut self, summary: &RunSummary);

    /// Check if running in interactive mode.
    fn is_interactive(&self) -> bool;
}

/// Handle for controlling a spinner.
pub trait SpinnerHandle {
    /// Update the spinner message.
    fn set_message(&mut self, msg: &str);

    /// Show a line of step output under the spinner.
    fn push_detail(&mut self, line: &str);

    fn finish_success(&mut self, msg: &str);

    /// Finished, but something optional went wrong.
    fn finish_warning(&mut self, msg: &str);

    fn finish_error(&mut self, msg: &str);

    fn finish_skipped(&mut self, msg: &str);
}

/// What a finished run looked like.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub product: String,
    pub kind: RunKind,
    /// Terminal state, already refined with warnings for display.
    pub state: RunState,
    /// Steps the run's workflow selected, in plan order.
    pub steps: Vec<StepSnapshot>,
    pub total_duration: Duration,
}

impl RunSummary {
    /// Number of steps that left `NotStarted`.
    pub fn steps_run(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.status != crate::steps::StepStatus::NotStarted)
            .count()
    }

    /// Number of selected steps that never started.
    pub fn steps_skipped(&self) -> usize {
        self.steps.len() - self.steps_run()
    }
}
