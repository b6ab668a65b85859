//! Step-execution orchestration.
//!
//! The [`Orchestrator`] owns a [`StepPlan`] and runs it on one background
//! worker thread per run. It enforces the required-step rules of the
//! configure and remove workflows, arms a [`Watchdog`] with the plan's time
//! budget, honors cooperative cancellation between steps, and reduces every
//! run to a single [`RunState`].
//!
//! # Threads
//!
//! - The caller starts, cancels, and waits on runs.
//! - The worker is the only code that mutates steps. The plan moves into the
//!   worker for the duration of a run and comes back on [`Orchestrator::wait`].
//! - The watchdog thread only reads the current step and the cancellation flag.
//!
//! Observers read progress through events or through [`Orchestrator::steps`],
//! a board of snapshots the worker republishes at every transition.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::anyhow;
use tracing::{debug, info, warn};

use crate::error::{Result, StagehandError};
use crate::steps::step::panic_message;
use crate::steps::{StepPlan, StepSnapshot, StepStatus, WorkflowMask};

use super::events::{Events, RunEvent, RunKind, StatusKind};
use super::outcome::{reduce_configure, reduce_remove, RunState};
use super::watchdog::Watchdog;

/// Tuning knobs for an [`Orchestrator`].
#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    /// Real time represented by one estimated second. Tests shrink this.
    pub budget_unit: Duration,
    /// Cancel the run automatically when the watchdog reports an overrun.
    pub cancel_on_timeout: bool,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            budget_unit: Duration::from_secs(1),
            cancel_on_timeout: false,
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Shared state of one run.
struct Run {
    kind: RunKind,
    workflow: WorkflowMask,
    cancelled: Arc<AtomicBool>,
    finalized: AtomicBool,
    state: Mutex<RunState>,
    watchdog: Mutex<Option<Watchdog>>,
    current_step: Mutex<Option<String>>,
    started_at: Instant,
    events: Events,
}

impl Run {
    fn new(kind: RunKind, workflow: WorkflowMask, events: Events) -> Self {
        Self {
            kind,
            workflow,
            cancelled: Arc::new(AtomicBool::new(false)),
            finalized: AtomicBool::new(false),
            state: Mutex::new(RunState::InProgress),
            watchdog: Mutex::new(None),
            current_step: Mutex::new(None),
            started_at: Instant::now(),
            events,
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn is_finalized(&self) -> bool {
        self.finalized.load(Ordering::SeqCst)
    }

    fn state(&self) -> RunState {
        *lock(&self.state)
    }

    fn current_step(&self) -> Option<String> {
        lock(&self.current_step).clone()
    }

    fn set_current_step(&self, description: Option<String>) {
        *lock(&self.current_step) = description;
    }

    fn disarm_watchdog(&self) {
        if let Some(mut dog) = lock(&self.watchdog).take() {
            dog.disarm();
        }
    }

    /// Compute and publish the terminal state. Only the first call has an
    /// effect; later calls return the state already recorded.
    ///
    /// The state is stored before `finalized` becomes visible, both under the
    /// state lock, so a caller that sees a finalized run never reads
    /// `InProgress`.
    fn finalize(&self, reduce: impl FnOnce(bool) -> RunState) -> RunState {
        let state = {
            let mut current = lock(&self.state);
            if self.is_finalized() {
                return *current;
            }
            self.disarm_watchdog();
            let state = reduce(self.is_cancelled());
            *current = state;
            self.finalized.store(true, Ordering::SeqCst);
            state
        };

        info!(
            "{} run ended: {} after {:?}",
            self.kind,
            state,
            self.started_at.elapsed()
        );
        self.events.emit(&RunEvent::RunEnded {
            kind: self.kind,
            state,
        });
        state
    }

    fn cancel(&self) -> RunState {
        if self.is_finalized() {
            return self.state();
        }
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            info!("Cancellation requested for {} run", self.kind);
        }
        self.disarm_watchdog();
        self.finalize(|_| RunState::Cancelled)
    }
}

/// Cancels whichever run its orchestrator is currently executing.
///
/// Obtainable before a run starts, so subscribers and other threads can hold
/// one while the orchestrator itself is borrowed by [`Orchestrator::wait`].
#[derive(Clone, Default)]
pub struct CancelHandle {
    current: Arc<Mutex<Option<Arc<Run>>>>,
}

impl CancelHandle {
    /// Request cancellation and finalize the current run as `Cancelled`
    /// without waiting for the in-flight step.
    ///
    /// Returns the run's terminal state, or `None` if no run was started yet.
    /// Cancelling a run that already ended leaves its state untouched.
    pub fn cancel(&self) -> Option<RunState> {
        let run = lock(&self.current).clone();
        run.map(|run| run.cancel())
    }

    /// True if the current run has been asked to stop.
    pub fn is_cancelled(&self) -> bool {
        lock(&self.current)
            .as_ref()
            .is_some_and(|run| run.is_cancelled())
    }

    fn run(&self) -> Option<Arc<Run>> {
        lock(&self.current).clone()
    }

    fn replace(&self, run: Arc<Run>) {
        *lock(&self.current) = Some(run);
    }
}

/// Drives a step plan through configure and remove runs.
pub struct Orchestrator {
    plan: Option<StepPlan>,
    worker: Option<JoinHandle<StepPlan>>,
    board: Arc<RwLock<Vec<StepSnapshot>>>,
    handle: CancelHandle,
    events: Events,
    options: OrchestratorOptions,
    /// Workflow types that have at least one enabled step.
    coverage: WorkflowMask,
    last: Option<(RunKind, WorkflowMask)>,
}

impl Orchestrator {
    /// Create an orchestrator with default options.
    pub fn new(plan: StepPlan) -> Self {
        Self::with_options(plan, OrchestratorOptions::default())
    }

    pub fn with_options(plan: StepPlan, options: OrchestratorOptions) -> Self {
        let coverage = plan
            .steps()
            .iter()
            .filter(|step| step.is_enabled())
            .fold(WorkflowMask::NONE, |acc, step| {
                acc | step.workflow_mask().unwrap_or(WorkflowMask::ALL)
            });
        let board = Arc::new(RwLock::new(plan.snapshots()));
        Self {
            plan: Some(plan),
            worker: None,
            board,
            handle: CancelHandle::default(),
            events: Events::new(),
            options,
            coverage,
            last: None,
        }
    }

    /// Register an event callback. Applies to runs started afterwards.
    pub fn subscribe<F>(&mut self, callback: F)
    where
        F: Fn(&RunEvent) + Send + Sync + 'static,
    {
        self.events.subscribe(callback);
    }

    /// Register an event channel. Applies to runs started afterwards.
    pub fn events_channel(&mut self) -> mpsc::Receiver<RunEvent> {
        self.events.channel()
    }

    pub fn options(&self) -> &OrchestratorOptions {
        &self.options
    }

    /// The plan, when no worker holds it.
    pub fn plan(&self) -> Option<&StepPlan> {
        self.plan.as_ref()
    }

    /// Latest snapshot of every step in plan order.
    pub fn steps(&self) -> Vec<StepSnapshot> {
        self.board
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// State a run of `workflow` starts from: `Unnecessary` when no enabled
    /// step matches it, `Required` otherwise.
    pub fn initial_state(&self, workflow: WorkflowMask) -> RunState {
        if self.coverage.intersects(workflow) {
            RunState::Required
        } else {
            RunState::Unnecessary
        }
    }

    /// Current run state.
    ///
    /// Before the first run no workflow type is known yet, so this is
    /// `Required` if any workflow type has work; use
    /// [`Orchestrator::initial_state`] for a specific one.
    pub fn state(&self) -> RunState {
        self.handle
            .run()
            .map_or_else(|| self.initial_state(WorkflowMask::ALL), |run| run.state())
    }

    /// Kind and workflow type of the most recent run.
    pub fn last_run(&self) -> Option<(RunKind, WorkflowMask)> {
        self.last
    }

    /// True while the worker thread is executing.
    pub fn is_running(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|worker| !worker.is_finished())
    }

    /// Handle for cancelling runs from other threads or event callbacks.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.handle.clone()
    }

    /// Start a configure run in the background.
    pub fn configure(&mut self, workflow: WorkflowMask) -> Result<()> {
        self.start(RunKind::Configure, workflow)
    }

    /// Start a remove run in the background.
    pub fn remove(&mut self, workflow: WorkflowMask) -> Result<()> {
        self.start(RunKind::Remove, workflow)
    }

    /// Run a configure workflow and block until the worker exits.
    pub fn configure_blocking(&mut self, workflow: WorkflowMask) -> Result<RunState> {
        self.configure(workflow)?;
        self.wait()
    }

    /// Run a remove workflow and block until the worker exits.
    pub fn remove_blocking(&mut self, workflow: WorkflowMask) -> Result<RunState> {
        self.remove(workflow)?;
        self.wait()
    }

    /// Re-run the last workflow from its first step.
    ///
    /// All steps are reset to `NotStarted`; a retry never resumes from the
    /// point of failure.
    pub fn retry(&mut self) -> Result<()> {
        let (kind, workflow) = self.last.ok_or(StagehandError::NothingToRetry)?;
        self.start(kind, workflow)
    }

    /// Retry and block until the worker exits.
    pub fn retry_blocking(&mut self) -> Result<RunState> {
        self.retry()?;
        self.wait()
    }

    /// Cancel the current run.
    ///
    /// No new step starts after this call. The in-flight step, if any, keeps
    /// running until its body returns; the run is finalized as `Cancelled`
    /// immediately.
    pub fn cancel(&self) -> RunState {
        self.handle
            .cancel()
            .unwrap_or_else(|| self.initial_state(WorkflowMask::ALL))
    }

    /// Block until the worker exits and take the plan back.
    ///
    /// After a cancel this waits for the in-flight step to return.
    pub fn wait(&mut self) -> Result<RunState> {
        self.join_worker()?;
        Ok(self.state())
    }

    fn start(&mut self, kind: RunKind, workflow: WorkflowMask) -> Result<()> {
        self.reclaim()?;
        let mut plan = self.plan.take().ok_or_else(|| {
            StagehandError::Other(anyhow!("step plan was lost by a failed worker"))
        })?;

        plan.reset();
        *self.board.write().unwrap_or_else(PoisonError::into_inner) = plan.snapshots();

        let run = Arc::new(Run::new(kind, workflow, self.events.clone()));
        self.handle.replace(Arc::clone(&run));
        self.last = Some((kind, workflow));

        info!("Starting {} run (workflow: {})", kind, workflow);
        self.events.emit(&RunEvent::RunStarted { kind, workflow });

        let budget_secs = plan.total_budget_seconds(workflow);
        if budget_secs > 0 && !run.is_cancelled() {
            let budget = self
                .options
                .budget_unit
                .saturating_mul(u32::try_from(budget_secs).unwrap_or(u32::MAX));
            let dog = arm_watchdog(&run, budget, self.options.cancel_on_timeout);
            *lock(&run.watchdog) = Some(dog);
            if run.is_finalized() {
                run.disarm_watchdog();
            }
        } else {
            debug!("Watchdog not armed for {} run", kind);
        }

        let board = Arc::clone(&self.board);
        let worker_run = Arc::clone(&run);
        let worker = thread::Builder::new()
            .name(format!("stagehand-{}", kind))
            .spawn(move || execute(plan, &worker_run, &board))?;
        self.worker = Some(worker);
        Ok(())
    }

    /// Take the plan back from a finished (or cancelled) worker.
    fn reclaim(&mut self) -> Result<()> {
        if let (Some(worker), Some(run)) = (&self.worker, self.handle.run()) {
            if !worker.is_finished() && !run.is_finalized() {
                return Err(StagehandError::RunInProgress {
                    kind: run.kind.to_string(),
                });
            }
        }
        self.join_worker()
    }

    fn join_worker(&mut self) -> Result<()> {
        if let Some(worker) = self.worker.take() {
            let plan = worker.join().map_err(|payload| {
                StagehandError::Other(anyhow!(
                    "step worker panicked: {}",
                    panic_message(payload.as_ref())
                ))
            })?;
            self.plan = Some(plan);
        }
        Ok(())
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        if self.is_running() {
            debug!("Orchestrator dropped mid-run; cancelling");
            self.handle.cancel();
        }
    }
}

fn arm_watchdog(run: &Arc<Run>, budget: Duration, cancel_on_timeout: bool) -> Watchdog {
    let weak: Weak<Run> = Arc::downgrade(run);
    Watchdog::arm(budget, Arc::clone(&run.cancelled), move |overrun| {
        let Some(run) = weak.upgrade() else {
            return;
        };
        let current_step = run.current_step();
        warn!(
            "{} run exceeded its {:?} budget (elapsed {:?}, step: {})",
            run.kind,
            overrun.budget,
            overrun.elapsed,
            current_step.as_deref().unwrap_or("none")
        );
        run.events.emit(&RunEvent::RunTimedOut {
            elapsed: overrun.elapsed,
            budget: overrun.budget,
            current_step,
        });
        if cancel_on_timeout {
            run.cancel();
        }
    })
}

fn publish(board: &RwLock<Vec<StepSnapshot>>, snapshot: StepSnapshot) {
    let mut board = board.write().unwrap_or_else(PoisonError::into_inner);
    if let Some(slot) = board.get_mut(snapshot.index) {
        *slot = snapshot;
    }
}

/// Worker body: run the filtered steps in order, then finalize.
fn execute(mut plan: StepPlan, run: &Run, board: &RwLock<Vec<StepSnapshot>>) -> StepPlan {
    let indices = plan.filtered_indices(run.workflow);
    let total = indices.len();
    let on_status = |kind: StatusKind, text: &str| {
        run.events.emit(&RunEvent::StatusMessage {
            kind,
            text: text.to_string(),
        });
    };

    for (position, &index) in indices.iter().enumerate() {
        if run.is_cancelled() {
            info!(
                "Cancellation observed before step {}/{}; stopping",
                position + 1,
                total
            );
            break;
        }
        let Some(step) = plan.step_mut(index) else {
            continue;
        };

        step.begin();
        let starting = step.snapshot(index);
        publish(board, starting.clone());
        run.set_current_step(Some(step.description().to_string()));
        debug!("[{}/{}] {}", position + 1, total, step.description());
        run.events.emit(&RunEvent::StepStarting(starting));

        let status = step.run(&run.cancelled, &on_status);

        let finished = step.snapshot(index);
        publish(board, finished.clone());
        run.events.emit(&RunEvent::StepFinished(finished));

        if status == StepStatus::Error && run.kind == RunKind::Configure && step.is_required() {
            warn!(
                "Required step '{}' failed; skipping the remaining {} step(s)",
                step.name(),
                total - position - 1
            );
            break;
        }
    }
    run.set_current_step(None);

    let snapshots: Vec<StepSnapshot> = indices
        .iter()
        .filter_map(|&i| plan.steps().get(i).map(|step| step.snapshot(i)))
        .collect();
    run.finalize(|cancelled| match run.kind {
        RunKind::Configure => reduce_configure(&snapshots, cancelled),
        RunKind::Remove => reduce_remove(&snapshots, cancelled),
    });

    plan
}
