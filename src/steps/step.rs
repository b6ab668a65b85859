//! A single named unit of work.
//!
//! A [`Step`] carries its display metadata, its required/optional flag, the
//! workflow variants it applies to, and the body that does the real work. The
//! orchestrator is the only caller of [`Step::run`]; everyone else observes a
//! step through [`StepSnapshot`]s.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::runner::events::StatusKind;

use super::group::{run_group, SubStep, SubStepSnapshot};
use super::workflow::WorkflowMask;

/// Status of a step within one run.
///
/// Transitions are forward-only: `NotStarted → Started → {Finished | Error}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StepStatus {
    /// Step has not run in this run.
    #[default]
    NotStarted,

    /// Step body is executing.
    Started,

    /// Step completed successfully.
    Finished,

    /// Step body failed.
    Error,
}

impl StepStatus {
    /// Check if this is a terminal state (no more changes expected this run).
    pub fn is_terminal(&self) -> bool {
        matches!(self, StepStatus::Finished | StepStatus::Error)
    }

    /// Get a display character for this status.
    pub fn display_char(&self) -> char {
        match self {
            StepStatus::NotStarted => '○',
            StepStatus::Started => '◉',
            StepStatus::Finished => '✓',
            StepStatus::Error => '✗',
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StepStatus::NotStarted => "not started",
            StepStatus::Started => "started",
            StepStatus::Finished => "finished",
            StepStatus::Error => "error",
        };
        write!(f, "{}", s)
    }
}

/// Failure reported by a step body.
///
/// The message is shown to the user verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepFailure {
    pub message: String,
}

impl StepFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for StepFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for StepFailure {}

impl From<crate::error::StagehandError> for StepFailure {
    fn from(err: crate::error::StagehandError) -> Self {
        Self::new(err.to_string())
    }
}

/// Outcome of a step body.
pub type StepOutcome = std::result::Result<(), StepFailure>;

/// The work a step performs.
pub type StepBody = Box<dyn FnMut(&mut StepContext<'_>) -> StepOutcome + Send>;

/// Handle given to a running step body.
///
/// Lets a body rewrite its own description, publish free-form progress text,
/// and poll the run's cancellation flag if it wants to stop early.
pub struct StepContext<'a> {
    description: &'a mut String,
    cancelled: &'a AtomicBool,
    on_status: &'a dyn Fn(StatusKind, &str),
}

impl<'a> StepContext<'a> {
    pub(crate) fn new(
        description: &'a mut String,
        cancelled: &'a AtomicBool,
        on_status: &'a dyn Fn(StatusKind, &str),
    ) -> Self {
        Self {
            description,
            cancelled,
            on_status,
        }
    }

    /// Current description of the running step.
    pub fn description(&self) -> &str {
        self.description
    }

    /// Replace the description, e.g. to include a value discovered mid-run.
    pub fn set_description(&mut self, description: impl Into<String>) {
        *self.description = description.into();
    }

    /// Publish an informational progress message.
    pub fn info(&self, text: &str) {
        (self.on_status)(StatusKind::Info, text);
    }

    /// Publish a "waiting on something" progress message.
    pub fn waiting(&self, text: &str) {
        (self.on_status)(StatusKind::Waiting, text);
    }

    /// Publish an error progress message. Does not fail the step.
    pub fn error(&self, text: &str) {
        (self.on_status)(StatusKind::Error, text);
    }

    /// True once cancellation of the run has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

pub(crate) enum StepWork {
    Action(StepBody),
    Group(Vec<SubStep>),
}

/// A named unit of work with required/optional semantics and a status.
pub struct Step {
    name: String,
    description: String,
    estimated_seconds: i64,
    enabled: bool,
    required: bool,
    workflow_mask: Option<WorkflowMask>,
    work: StepWork,
    status: StepStatus,
    started_at: Option<Instant>,
    elapsed: Duration,
    message: Option<String>,
}

impl Step {
    /// Create an enabled, optional step that applies to every workflow.
    pub fn new<F>(name: impl Into<String>, description: impl Into<String>, body: F) -> Self
    where
        F: FnMut(&mut StepContext<'_>) -> StepOutcome + Send + 'static,
    {
        Self::with_work(name, description, StepWork::Action(Box::new(body)))
    }

    /// Create a step made of ordered sub-steps (used by remove workflows).
    ///
    /// The group fails only if a required sub-step fails.
    pub fn group(
        name: impl Into<String>,
        description: impl Into<String>,
        substeps: Vec<SubStep>,
    ) -> Self {
        Self::with_work(name, description, StepWork::Group(substeps))
    }

    fn with_work(name: impl Into<String>, description: impl Into<String>, work: StepWork) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            estimated_seconds: 0,
            enabled: true,
            required: false,
            workflow_mask: None,
            work,
            status: StepStatus::NotStarted,
            started_at: None,
            elapsed: Duration::ZERO,
            message: None,
        }
    }

    /// Set the expected duration used for the watchdog budget.
    pub fn estimated_seconds(mut self, seconds: i64) -> Self {
        self.estimated_seconds = seconds;
        self
    }

    /// Mark the step as required.
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Enable or disable the step.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Restrict the step to the given workflow variants.
    pub fn workflows(mut self, mask: WorkflowMask) -> Self {
        self.workflow_mask = Some(mask);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn estimate(&self) -> i64 {
        self.estimated_seconds
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn workflow_mask(&self) -> Option<WorkflowMask> {
        self.workflow_mask
    }

    pub fn status(&self) -> StepStatus {
        self.status
    }

    /// Failure message recorded by the last run, if it failed.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Time spent in the body; live while `Started`, frozen afterwards.
    pub fn elapsed(&self) -> Duration {
        match (self.status, self.started_at) {
            (StepStatus::Started, Some(started)) => started.elapsed(),
            _ => self.elapsed,
        }
    }

    /// True if this step is a group of sub-steps.
    pub fn is_group(&self) -> bool {
        matches!(self.work, StepWork::Group(_))
    }

    /// Sub-steps of a group step; empty for plain steps.
    pub fn substeps(&self) -> &[SubStep] {
        match &self.work {
            StepWork::Group(subs) => subs,
            StepWork::Action(_) => &[],
        }
    }

    /// True if a non-required sub-step failed while the group itself succeeded
    /// or failed for another reason.
    pub fn has_failed_substeps(&self) -> bool {
        self.substeps()
            .iter()
            .any(|sub| sub.status() == StepStatus::Error)
    }

    /// Whether this step takes part in a run of the given workflow type.
    ///
    /// Steps without a workflow mask apply to every workflow type.
    pub fn applies_to(&self, workflow: WorkflowMask) -> bool {
        self.enabled
            && self
                .workflow_mask
                .map_or(true, |mask| mask.intersects(workflow))
    }

    /// Put the step back to `NotStarted` for a new run.
    pub fn reset(&mut self) {
        self.status = StepStatus::NotStarted;
        self.started_at = None;
        self.elapsed = Duration::ZERO;
        self.message = None;
        if let StepWork::Group(subs) = &mut self.work {
            for sub in subs {
                sub.reset();
            }
        }
    }

    /// Transition to `Started`. Called by the orchestrator right before `run`.
    pub(crate) fn begin(&mut self) {
        self.status = StepStatus::Started;
        self.started_at = Some(Instant::now());
        self.message = None;
    }

    /// Execute the body and record `Finished` or `Error`.
    ///
    /// Never fails: body errors and panics become an `Error` status with the
    /// failure's message.
    pub(crate) fn run(
        &mut self,
        cancelled: &AtomicBool,
        on_status: &dyn Fn(StatusKind, &str),
    ) -> StepStatus {
        if self.status != StepStatus::Started {
            self.begin();
        }
        let started = self.started_at.unwrap_or_else(Instant::now);

        let outcome = match &mut self.work {
            StepWork::Action(body) => {
                let mut ctx = StepContext::new(&mut self.description, cancelled, on_status);
                invoke(body, &mut ctx)
            }
            StepWork::Group(subs) => run_group(subs, cancelled, on_status),
        };

        self.elapsed = started.elapsed();
        match outcome {
            Ok(()) => {
                debug!("Step '{}' finished in {:?}", self.name, self.elapsed);
                self.status = StepStatus::Finished;
            }
            Err(failure) => {
                warn!("Step '{}' failed: {}", self.name, failure);
                self.status = StepStatus::Error;
                self.message = Some(failure.message);
            }
        }
        self.status
    }

    /// Point-in-time copy of the step for observers.
    pub fn snapshot(&self, index: usize) -> StepSnapshot {
        StepSnapshot {
            index,
            name: self.name.clone(),
            description: self.description.clone(),
            required: self.required,
            status: self.status,
            started_at: self.started_at,
            elapsed: self.elapsed,
            message: self.message.clone(),
            substeps: self.substeps().iter().map(SubStep::snapshot).collect(),
        }
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("required", &self.required)
            .field("enabled", &self.enabled)
            .field("workflow_mask", &self.workflow_mask)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// Run a body, turning a panic into a step failure.
pub(crate) fn invoke(body: &mut StepBody, ctx: &mut StepContext<'_>) -> StepOutcome {
    match panic::catch_unwind(AssertUnwindSafe(|| body(ctx))) {
        Ok(outcome) => outcome,
        Err(payload) => Err(StepFailure::new(format!(
            "step panicked: {}",
            panic_message(payload.as_ref())
        ))),
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Read-only view of a step at a point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct StepSnapshot {
    /// Position in the plan.
    pub index: usize,
    pub name: String,
    pub description: String,
    pub required: bool,
    pub status: StepStatus,
    started_at: Option<Instant>,
    elapsed: Duration,
    /// Failure text, if the step ended in `Error`.
    pub message: Option<String>,
    pub substeps: Vec<SubStepSnapshot>,
}

impl StepSnapshot {
    /// Elapsed time; keeps counting while the step is `Started`.
    pub fn elapsed(&self) -> Duration {
        match (self.status, self.started_at) {
            (StepStatus::Started, Some(started)) => started.elapsed(),
            _ => self.elapsed,
        }
    }

    /// True if any sub-step of this (group) step ended in `Error`.
    pub fn has_failed_substeps(&self) -> bool {
        self.substeps
            .iter()
            .any(|sub| sub.status == StepStatus::Error)
    }

    /// Generate a summary line for display.
    pub fn summary_line(&self) -> String {
        let duration = format_duration(self.elapsed());
        match self.status {
            StepStatus::Finished if self.has_failed_substeps() => format!(
                "{} {} ({}, with failed actions)",
                self.status.display_char(),
                self.description,
                duration
            ),
            StepStatus::Finished => {
                format!("{} {} ({})", self.status.display_char(), self.description, duration)
            }
            StepStatus::Error => {
                let error = self.message.as_deref().unwrap_or("unknown error");
                format!("{} {} - {}", self.status.display_char(), self.description, error)
            }
            _ => format!("{} {}", self.status.display_char(), self.description),
        }
    }
}

/// Format a duration for display.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let millis = duration.subsec_millis();

    if secs == 0 {
        format!("{}ms", millis)
    } else if secs < 60 {
        format!("{}.{}s", secs, millis / 100)
    } else {
        let mins = secs / 60;
        let secs = secs % 60;
        format!("{}m {}s", mins, secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn no_status(_: StatusKind, _: &str) {}

    #[test]
    fn successful_body_finishes() {
        let flag = AtomicBool::new(false);
        let mut step = Step::new("ok", "Does nothing", |_| Ok(()));

        assert_eq!(step.run(&flag, &no_status), StepStatus::Finished);
        assert_eq!(step.status(), StepStatus::Finished);
        assert!(step.message().is_none());
    }

    #[test]
    fn failing_body_records_message_verbatim() {
        let flag = AtomicBool::new(false);
        let mut step = Step::new("bad", "Fails", |_| Err(StepFailure::new("disk full")));

        assert_eq!(step.run(&flag, &no_status), StepStatus::Error);
        assert_eq!(step.message(), Some("disk full"));
    }

    #[test]
    fn panicking_body_becomes_error() {
        let flag = AtomicBool::new(false);
        let mut step = Step::new("boom", "Panics", |_| panic!("kaboom"));

        assert_eq!(step.run(&flag, &no_status), StepStatus::Error);
        assert!(step.message().unwrap().contains("kaboom"));
    }

    #[test]
    fn body_can_rewrite_description() {
        let flag = AtomicBool::new(false);
        let mut step = Step::new("discover", "Finding port", |ctx| {
            let text = format!("{} (found 5432)", ctx.description());
            ctx.set_description(text);
            Ok(())
        });

        step.run(&flag, &no_status);
        assert_eq!(step.description(), "Finding port (found 5432)");
    }

    #[test]
    fn body_status_messages_reach_callback() {
        let flag = AtomicBool::new(false);
        let seen = RefCell::new(Vec::new());
        let on_status = |kind: StatusKind, text: &str| {
            seen.borrow_mut().push((kind, text.to_string()));
        };
        let mut step = Step::new("talk", "Talks", |ctx| {
            ctx.info("copying");
            ctx.waiting("service");
            Ok(())
        });

        step.run(&flag, &on_status);
        assert_eq!(
            seen.into_inner(),
            vec![
                (StatusKind::Info, "copying".to_string()),
                (StatusKind::Waiting, "service".to_string())
            ]
        );
    }

    #[test]
    fn body_sees_cancellation_flag() {
        let flag = AtomicBool::new(true);
        let mut step = Step::new("poll", "Polls", |ctx| {
            if ctx.is_cancelled() {
                Err(StepFailure::new("interrupted"))
            } else {
                Ok(())
            }
        });

        assert_eq!(step.run(&flag, &no_status), StepStatus::Error);
    }

    #[test]
    fn reset_returns_to_not_started() {
        let flag = AtomicBool::new(false);
        let mut step = Step::new("bad", "Fails", |_| Err(StepFailure::new("nope")));
        step.run(&flag, &no_status);

        step.reset();
        assert_eq!(step.status(), StepStatus::NotStarted);
        assert!(step.message().is_none());
        assert_eq!(step.elapsed(), Duration::ZERO);
    }

    #[test]
    fn applies_to_respects_mask_and_enabled() {
        let install = Step::new("a", "A", |_| Ok(())).workflows(WorkflowMask::INSTALL);
        assert!(install.applies_to(WorkflowMask::INSTALL));
        assert!(!install.applies_to(WorkflowMask::UPGRADE));

        let unmasked = Step::new("b", "B", |_| Ok(()));
        assert!(unmasked.applies_to(WorkflowMask::UPGRADE));

        let disabled = Step::new("c", "C", |_| Ok(())).enabled(false);
        assert!(!disabled.applies_to(WorkflowMask::ALL));
    }

    #[test]
    fn elapsed_freezes_after_finish() {
        let flag = AtomicBool::new(false);
        let mut step = Step::new("sleep", "Sleeps", |_| {
            std::thread::sleep(Duration::from_millis(20));
            Ok(())
        });
        step.run(&flag, &no_status);

        let first = step.elapsed();
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(step.elapsed(), first);
        assert!(first >= Duration::from_millis(20));
    }

    #[test]
    fn step_status_is_terminal() {
        assert!(!StepStatus::NotStarted.is_terminal());
        assert!(!StepStatus::Started.is_terminal());
        assert!(StepStatus::Finished.is_terminal());
        assert!(StepStatus::Error.is_terminal());
    }

    #[test]
    fn snapshot_summary_line_includes_message() {
        let flag = AtomicBool::new(false);
        let mut step = Step::new("bad", "Write config", |_| Err(StepFailure::new("denied")));
        step.run(&flag, &no_status);

        let line = step.snapshot(0).summary_line();
        assert!(line.contains('✗'));
        assert!(line.contains("Write config"));
        assert!(line.contains("denied"));
    }

    #[test]
    fn format_duration_formats_correctly() {
        assert_eq!(format_duration(Duration::from_millis(500)), "500ms");
        assert_eq!(format_duration(Duration::from_secs(5)), "5.0s");
        assert_eq!(format_duration(Duration::from_secs(65)), "1m 5s");
    }
}
