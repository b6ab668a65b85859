//! Non-interactive UI for CI/headless environments.

use crate::runner::RunKind;
use crate::steps::{format_duration, StepStatus, WorkflowMask};

use super::theme::StagehandTheme;
use super::{OutputMode, RunSummary, SpinnerHandle, UserInterface};

/// UI implementation for non-interactive mode.
///
/// Writes plain lines without spinners or colors. Status text from steps is
/// printed only in verbose mode.
pub struct NonInteractiveUI {
    mode: OutputMode,
    theme: StagehandTheme,
}

impl NonInteractiveUI {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            theme: StagehandTheme::plain(),
        }
    }
}

/// Spinner stand-in that prints its final line.
struct LineSpinner {
    mode: OutputMode,
    theme: StagehandTheme,
}

impl LineSpinner {
    fn finish(&self, line: String) {
        if self.mode.shows_spinners() {
            println!("  {}", line);
        }
    }
}

impl SpinnerHandle for LineSpinner {
    fn set_message(&mut self, _msg: &str) {}

    fn push_detail(&mut self, line: &str) {
        if self.mode.shows_command_output() && !line.trim().is_empty() {
            println!("    » {}", line.trim_end());
        }
    }

    fn finish_success(&mut self, msg: &str) {
        self.finish(self.theme.format_success(msg));
    }

    fn finish_warning(&mut self, msg: &str) {
        self.finish(self.theme.format_warning(msg));
    }

    fn finish_error(&mut self, msg: &str) {
        // Failures are always reported.
        println!("  {}", self.theme.format_error(msg));
    }

    fn finish_skipped(&mut self, msg: &str) {
        self.finish(self.theme.format_skipped(msg));
    }
}

impl UserInterface for NonInteractiveUI {
    fn output_mode(&self) -> OutputMode {
        self.mode
    }

    fn message(&mut self, msg: &str) {
        if self.mode.shows_status() {
            println!("{}", msg);
        }
    }

    fn success(&mut self, msg: &str) {
        if self.mode.shows_status() {
            println!("{}", self.theme.format_success(msg));
        }
    }

    fn warning(&mut self, msg: &str) {
        if self.mode.shows_spinners() {
            eprintln!("{}", self.theme.format_warning(msg));
        }
    }

    fn error(&mut self, msg: &str) {
        eprintln!("{}", self.theme.format_error(msg));
    }

    fn start_spinner(&mut self, message: &str) -> Box<dyn SpinnerHandle> {
        if self.mode.shows_status() {
            println!("  {}", message);
        }
        Box::new(LineSpinner {
            mode: self.mode,
            theme: self.theme.clone(),
        })
    }

    fn show_header(&mut self, title: &str) {
        if self.mode.shows_status() {
            println!("\n{}\n", self.theme.format_header(title));
        }
    }

    fn show_run_header(
        &mut self,
        product: &str,
        kind: RunKind,
        workflow: WorkflowMask,
        step_count: usize,
    ) {
        if self.mode.shows_status() {
            let step_label = if step_count == 1 { "step" } else { "steps" };
            println!(
                "\n{} · {} ({}) · {} {}\n",
                self.theme.format_header(product),
                kind,
                workflow,
                step_count,
                step_label
            );
        }
    }

    fn show_run_summary(&mut self, summary: &RunSummary) {
        if self.mode.shows_status() {
            println!();
            for step in &summary.steps {
                match step.status {
                    StepStatus::NotStarted => println!("  ○ {} (not run)", step.description),
                    _ => println!("  {}", step.summary_line()),
                }
            }
            println!(
                "  Total: {} · {} run · {} not run",
                format_duration(summary.total_duration),
                summary.steps_run(),
                summary.steps_skipped()
            );
        }
        if self.mode.shows_spinners() {
            println!("\n{}", self.theme.format_state(summary.state));
        } else if summary.state.is_terminal() && !summary.state.is_success() {
            eprintln!("{}", self.theme.format_state(summary.state));
        }
    }

    fn is_interactive(&self) -> bool {
        false
    }
}
