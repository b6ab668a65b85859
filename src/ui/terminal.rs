//! Interactive terminal UI.

use console::Term;
use std::io::Write;

use crate::runner::RunKind;
use crate::steps::{format_duration, StepStatus, WorkflowMask};

use super::{
    should_use_colors, NonInteractiveUI, OutputMode, ProgressSpinner, RunSummary, SpinnerHandle,
    StagehandTheme, UserInterface,
};

/// Interactive terminal UI implementation.
pub struct TerminalUI {
    term: Term,
    theme: StagehandTheme,
    mode: OutputMode,
}

impl TerminalUI {
    /// Create a new terminal UI.
    pub fn new(mode: OutputMode) -> Self {
        Self::with_colors(mode, should_use_colors())
    }

    pub fn with_colors(mode: OutputMode, colors: bool) -> Self {
        let theme = if colors {
            StagehandTheme::new()
        } else {
            StagehandTheme::plain()
        };

        Self {
            term: Term::stdout(),
            theme,
            mode,
        }
    }
}

impl UserInterface for TerminalUI {
    fn output_mode(&self) -> OutputMode {
        self.mode
    }

    fn message(&mut self, msg: &str) {
        if self.mode.shows_status() {
            writeln!(self.term, "{}", msg).ok();
        }
    }

    fn success(&mut self, msg: &str) {
        if self.mode.shows_status() {
            writeln!(self.term, "{}", self.theme.format_success(msg)).ok();
        }
    }

    fn warning(&mut self, msg: &str) {
        if self.mode.shows_spinners() {
            writeln!(self.term, "{}", self.theme.format_warning(msg)).ok();
        }
    }

    fn error(&mut self, msg: &str) {
        writeln!(self.term, "{}", self.theme.format_error(msg)).ok();
    }

    fn start_spinner(&mut self, message: &str) -> Box<dyn SpinnerHandle> {
        if !self.mode.shows_spinners() {
            return Box::new(ProgressSpinner::hidden());
        }
        let details = if self.mode.shows_command_output() { 3 } else { 1 };
        Box::new(ProgressSpinner::new(message, details, self.theme.clone()))
    }

    fn show_header(&mut self, title: &str) {
        if self.mode.shows_status() {
            writeln!(self.term, "\n{}\n", self.theme.format_header(title)).ok();
        }
    }

    fn show_run_header(
        &mut self,
        product: &str,
        kind: RunKind,
        workflow: WorkflowMask,
        step_count: usize,
    ) {
        if !self.mode.shows_status() {
            return;
        }
        let step_label = if step_count == 1 { "step" } else { "steps" };
        writeln!(
            self.term,
            "\n{} {} {} {}\n",
            self.theme.format_header(product),
            self.theme.dim.apply_to("·"),
            self.theme.dim.apply_to(format!("{} ({})", kind, workflow)),
            self.theme
                .dim
                .apply_to(format!("· {} {}", step_count, step_label)),
        )
        .ok();
    }

    fn show_run_summary(&mut self, summary: &RunSummary) {
        if !self.mode.shows_spinners() {
            return;
        }

        if self.mode.shows_status() {
            let b = &self.theme.border;
            writeln!(self.term).ok();
            writeln!(
                self.term,
                "  {} {}",
                b.apply_to("┌─"),
                b.apply_to("Summary ──────────────────────────")
            )
            .ok();

            for step in &summary.steps {
                let icon = match step.status {
                    StepStatus::Finished if step.has_failed_substeps() => {
                        self.theme.warning.apply_to("⚠")
                    }
                    StepStatus::Finished => self.theme.success.apply_to("✓"),
                    StepStatus::Error => self.theme.error.apply_to("✗"),
                    StepStatus::Started => self.theme.info.apply_to("…"),
                    StepStatus::NotStarted => self.theme.dim.apply_to("○"),
                };
                let detail = match step.status {
                    StepStatus::NotStarted => self.theme.dim.apply_to("not run".to_string()),
                    _ => self
                        .theme
                        .duration
                        .apply_to(format_duration(step.elapsed())),
                };
                writeln!(
                    self.term,
                    "  {} {} {:<32} {}",
                    b.apply_to("│"),
                    icon,
                    step.description,
                    detail,
                )
                .ok();
            }

            writeln!(
                self.term,
                "  {}",
                b.apply_to("├────────────────────────────────────")
            )
            .ok();
            writeln!(
                self.term,
                "  {} Total: {} {} {} run {} {} not run",
                b.apply_to("│"),
                self.theme
                    .duration
                    .apply_to(format_duration(summary.total_duration)),
                self.theme.dim.apply_to("·"),
                summary.steps_run(),
                self.theme.dim.apply_to("·"),
                summary.steps_skipped(),
            )
            .ok();
            writeln!(
                self.term,
                "  {}",
                b.apply_to("└────────────────────────────────────")
            )
            .ok();
        }

        writeln!(self.term, "\n{}", self.theme.format_state(summary.state)).ok();
    }

    fn is_interactive(&self) -> bool {
        self.term.is_term()
    }
}

/// Create the appropriate UI based on context.
pub fn create_ui(interactive: bool, mode: OutputMode) -> Box<dyn UserInterface> {
    if interactive && Term::stdout().is_term() {
        Box::new(TerminalUI::new(mode))
    } else {
        Box::new(NonInteractiveUI::new(mode))
    }
}
