//! Progress spinners.

use indicatif::{ProgressBar, ProgressStyle};
use std::collections::VecDeque;
use std::time::Duration;

use super::theme::StagehandTheme;
use super::SpinnerHandle;

/// Longest detail line shown under a spinner.
const MAX_DETAIL_WIDTH: usize = 72;

/// A spinner for the in-flight step.
///
/// Shows the step label plus the last few lines of step output.
pub struct ProgressSpinner {
    bar: ProgressBar,
    base: String,
    details: VecDeque<String>,
    max_details: usize,
    theme: StagehandTheme,
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
        .template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn message_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

impl ProgressSpinner {
    /// Create a spinner showing up to `max_details` output lines.
    pub fn new(message: &str, max_details: usize, theme: StagehandTheme) -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(spinner_style());
        bar.set_message(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(80));

        Self {
            bar,
            base: message.to_string(),
            details: VecDeque::new(),
            max_details,
            theme,
        }
    }

    /// Create a spinner that doesn't draw.
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
            base: String::new(),
            details: VecDeque::new(),
            max_details: 0,
            theme: StagehandTheme::plain(),
        }
    }

    /// Current message, including detail lines.
    pub fn message(&self) -> String {
        self.bar.message()
    }

    fn redraw(&self) {
        let mut msg = self.base.clone();
        for line in &self.details {
            msg.push_str("\n  ");
            msg.push_str(&self.theme.dim.apply_to(format!("» {}", line)).to_string());
        }
        self.bar.set_message(msg);
    }

    fn finish_with(&mut self, line: String) {
        self.bar.set_style(message_style());
        self.bar.finish_with_message(line);
    }
}

impl SpinnerHandle for ProgressSpinner {
    fn set_message(&mut self, msg: &str) {
        self.base = msg.to_string();
        self.redraw();
    }

    fn push_detail(&mut self, line: &str) {
        let line = line.trim_end();
        if line.is_empty() || self.max_details == 0 {
            return;
        }
        let shown = if line.chars().count() > MAX_DETAIL_WIDTH {
            let cut: String = line.chars().take(MAX_DETAIL_WIDTH - 3).collect();
            format!("{}...", cut)
        } else {
            line.to_string()
        };
        self.details.push_back(shown);
        while self.details.len() > self.max_details {
            self.details.pop_front();
        }
        self.redraw();
    }

    fn finish_success(&mut self, msg: &str) {
        let line = self.theme.format_success(msg);
        self.finish_with(line);
    }

    fn finish_warning(&mut self, msg: &str) {
        let line = self.theme.format_warning(msg);
        self.finish_with(line);
    }

    fn finish_error(&mut self, msg: &str) {
        let line = self.theme.format_error(msg);
        self.finish_with(line);
    }

    fn finish_skipped(&mut self, msg: &str) {
        let line = self.theme.format_skipped(msg);
        self.finish_with(line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hidden_with_details(max: usize) -> ProgressSpinner {
        let mut spinner = ProgressSpinner::hidden();
        spinner.max_details = max;
        spinner.base = "Running".to_string();
        spinner
    }

    #[test]
    fn spinner_lifecycle() {
        let mut spinner = ProgressSpinner::new("Testing...", 2, StagehandTheme::plain());
        spinner.set_message("Updated");
        spinner.finish_success("Done");
    }

    #[test]
    fn details_are_a_ring_buffer() {
        let mut spinner = hidden_with_details(2);
        spinner.push_detail("line 1");
        spinner.push_detail("line 2");
        spinner.push_detail("line 3");

        let msg = spinner.message();
        assert!(msg.starts_with("Running"));
        assert!(!msg.contains("line 1"));
        assert!(msg.contains("line 2"));
        assert!(msg.contains("line 3"));
    }

    #[test]
    fn empty_details_are_skipped() {
        let mut spinner = hidden_with_details(2);
        spinner.push_detail("   ");
        spinner.push_detail("real output");
        assert_eq!(spinner.message().matches('\n').count(), 1);
    }

    #[test]
    fn long_details_are_truncated() {
        let mut spinner = hidden_with_details(1);
        spinner.push_detail(&"x".repeat(100));
        let msg = spinner.message();
        assert!(msg.contains("..."));
        assert!(!msg.contains(&"x".repeat(100)));
    }

    #[test]
    fn hidden_spinner_ignores_details() {
        let mut spinner = ProgressSpinner::hidden();
        spinner.push_detail("ignored");
        assert!(!spinner.message().contains("ignored"));
    }
}
