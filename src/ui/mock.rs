//! Mock UI implementation for testing.
//!
//! `MockUI` implements the `UserInterface` trait and captures all
//! interactions for later assertion.
//!
//! # Example
//!
//! ```
//! use stagehand::ui::{MockUI, UserInterface};
//!
//! let mut ui = MockUI::new();
//!
//! // Use ui in code under test...
//! ui.message("Starting configure");
//! ui.success("Done!");
//!
//! // Assert on captured interactions
//! assert!(ui.messages().contains(&"Starting configure".to_string()));
//! assert!(ui.successes().contains(&"Done!".to_string()));
//! ```

use std::sync::{Arc, Mutex, PoisonError};

use crate::runner::RunKind;
use crate::steps::WorkflowMask;

use super::{OutputMode, RunSummary, SpinnerHandle, UserInterface};

/// How a mock spinner was finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpinnerFinish {
    Success(String),
    Warning(String),
    Error(String),
    Skipped(String),
}

/// Everything recorded by the spinners a [`MockUI`] handed out.
///
/// Spinners outlive the borrow of the UI that created them, so their
/// records live behind a shared handle.
#[derive(Debug, Default)]
struct SpinnerLog {
    details: Vec<String>,
    finishes: Vec<SpinnerFinish>,
}

/// Mock UI implementation for testing.
#[derive(Debug, Default)]
pub struct MockUI {
    mode: OutputMode,
    interactive: bool,
    messages: Vec<String>,
    successes: Vec<String>,
    warnings: Vec<String>,
    errors: Vec<String>,
    headers: Vec<String>,
    spinners: Vec<String>,
    run_headers: Vec<(String, RunKind, WorkflowMask, usize)>,
    summaries: Vec<RunSummary>,
    spinner_log: Arc<Mutex<SpinnerLog>>,
}

impl MockUI {
    /// Create a new MockUI with Normal output mode.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new MockUI with a specific output mode.
    pub fn with_mode(mode: OutputMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    /// Set whether this UI reports itself as interactive.
    pub fn set_interactive(&mut self, interactive: bool) {
        self.interactive = interactive;
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn successes(&self) -> &[String] {
        &self.successes
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Messages each spinner was started with, in order.
    pub fn spinners(&self) -> &[String] {
        &self.spinners
    }

    /// Recorded run headers as `(product, kind, workflow, step_count)`.
    pub fn run_headers(&self) -> &[(String, RunKind, WorkflowMask, usize)] {
        &self.run_headers
    }

    pub fn summaries(&self) -> &[RunSummary] {
        &self.summaries
    }

    /// Detail lines pushed to any spinner.
    pub fn details(&self) -> Vec<String> {
        self.log().details.clone()
    }

    /// How each spinner was finished, in order.
    pub fn finishes(&self) -> Vec<SpinnerFinish> {
        self.log().finishes.clone()
    }

    /// Check if a message was displayed (any type).
    pub fn has_message(&self, msg: &str) -> bool {
        self.messages.iter().any(|m| m.contains(msg))
            || self.successes.iter().any(|m| m.contains(msg))
            || self.warnings.iter().any(|m| m.contains(msg))
            || self.errors.iter().any(|m| m.contains(msg))
    }

    fn log(&self) -> std::sync::MutexGuard<'_, SpinnerLog> {
        self.spinner_log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Mock spinner that records into its parent's log.
struct MockSpinner {
    log: Arc<Mutex<SpinnerLog>>,
}

impl MockSpinner {
    fn record(&self, finish: SpinnerFinish) {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .finishes
            .push(finish);
    }
}

impl SpinnerHandle for MockSpinner {
    fn set_message(&mut self, _msg: &str) {}

    fn push_detail(&mut self, line: &str) {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .details
            .push(line.to_string());
    }

    fn finish_success(&mut self, msg: &str) {
        self.record(SpinnerFinish::Success(msg.to_string()));
    }

    fn finish_warning(&mut self, msg: &str) {
        self.record(SpinnerFinish::Warning(msg.to_string()));
    }

    fn finish_error(&mut self, msg: &str) {
        self.record(SpinnerFinish::Error(msg.to_string()));
    }

    fn finish_skipped(&mut self, msg: &str) {
        self.record(SpinnerFinish::Skipped(msg.to_string()));
    }
}

impl UserInterface for MockUI {
    fn output_mode(&self) -> OutputMode {
        self.mode
    }

    fn message(&mut self, msg: &str) {
        self.messages.push(msg.to_string());
    }

    fn success(&mut self, msg: &str) {
        self.successes.push(msg.to_string());
    }

    fn warning(&mut self, msg: &str) {
        self.warnings.push(msg.to_string());
    }

    fn error(&mut self, msg: &str) {
        self.errors.push(msg.to_string());
    }

    fn start_spinner(&mut self, message: &str) -> Box<dyn SpinnerHandle> {
        self.spinners.push(message.to_string());
        Box::new(MockSpinner {
            log: Arc::clone(&self.spinner_log),
        })
    }

    fn show_header(&mut self, title: &str) {
        self.headers.push(title.to_string());
    }

    fn show_run_header(
        &mut self,
        product: &str,
        kind: RunKind,
        workflow: WorkflowMask,
        step_count: usize,
    ) {
        self.run_headers
            .push((product.to_string(), kind, workflow, step_count));
    }

    fn show_run_summary(&mut self, summary: &RunSummary) {
        self.summaries.push(summary.clone());
    }

    fn is_interactive(&self) -> bool {
        self.interactive
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::RunState;
    use std::time::Duration;

    #[test]
    fn captures_messages_by_kind() {
        let mut ui = MockUI::new();
        ui.message("plain");
        ui.success("good");
        ui.warning("careful");
        ui.error("bad");

        assert_eq!(ui.messages(), ["plain"]);
        assert_eq!(ui.successes(), ["good"]);
        assert_eq!(ui.warnings(), ["careful"]);
        assert_eq!(ui.errors(), ["bad"]);
        assert!(ui.has_message("care"));
        assert!(!ui.has_message("missing"));
    }

    #[test]
    fn spinner_records_after_ui_borrow_ends() {
        let mut ui = MockUI::new();
        let mut spinner = ui.start_spinner("[1/1] Step");
        spinner.push_detail("output line");
        spinner.finish_warning("Step");
        drop(spinner);

        assert_eq!(ui.spinners(), ["[1/1] Step"]);
        assert_eq!(ui.details(), vec!["output line".to_string()]);
        assert_eq!(
            ui.finishes(),
            vec![SpinnerFinish::Warning("Step".to_string())]
        );
    }

    #[test]
    fn records_run_header_and_summary() {
        let mut ui = MockUI::with_mode(OutputMode::Quiet);
        ui.show_run_header("demo", RunKind::Remove, WorkflowMask::INSTALL, 3);
        ui.show_run_summary(&RunSummary {
            product: "demo".to_string(),
            kind: RunKind::Remove,
            state: RunState::Complete,
            steps: Vec::new(),
            total_duration: Duration::from_millis(5),
        });

        assert_eq!(ui.output_mode(), OutputMode::Quiet);
        assert_eq!(ui.run_headers()[0].0, "demo");
        assert_eq!(ui.run_headers()[0].3, 3);
        assert_eq!(ui.summaries()[0].state, RunState::Complete);
    }

    #[test]
    fn interactive_flag_is_configurable() {
        let mut ui = MockUI::new();
        assert!(!ui.is_interactive());
        ui.set_interactive(true);
        assert!(ui.is_interactive());
    }
}
