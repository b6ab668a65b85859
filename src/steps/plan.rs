//! Ordered, filterable step collections.

use crate::runner::outcome::RunState;

use super::step::{Step, StepSnapshot};
use super::workflow::WorkflowMask;

/// Budget substituted for steps without a positive estimate.
pub const DEFAULT_STEP_BUDGET_SECS: u64 = 30;

/// An ordered list of steps for one workflow.
///
/// The same plan can serve several workflow variants; [`StepPlan::filtered`]
/// selects the steps that take part in a given run.
#[derive(Debug, Default)]
pub struct StepPlan {
    steps: Vec<Step>,
}

impl StepPlan {
    /// Create a plan from steps in execution order.
    pub fn new(steps: Vec<Step>) -> Self {
        Self { steps }
    }

    /// Append a step.
    pub fn push(&mut self, step: Step) {
        self.steps.push(step);
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// All steps, including disabled and non-matching ones.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Look up a step by name.
    pub fn get(&self, name: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.name() == name)
    }

    /// Steps that run for `workflow`, in plan order.
    pub fn filtered(&self, workflow: WorkflowMask) -> impl Iterator<Item = &Step> {
        self.steps.iter().filter(move |s| s.applies_to(workflow))
    }

    /// Plan positions of the steps that run for `workflow`.
    pub fn filtered_indices(&self, workflow: WorkflowMask) -> Vec<usize> {
        self.steps
            .iter()
            .enumerate()
            .filter(|(_, s)| s.applies_to(workflow))
            .map(|(i, _)| i)
            .collect()
    }

    /// Watchdog budget for `workflow`, in seconds.
    ///
    /// Sums the estimates of the filtered steps, counting
    /// [`DEFAULT_STEP_BUDGET_SECS`] for any step with a zero or negative
    /// estimate. Zero when no step matches.
    pub fn total_budget_seconds(&self, workflow: WorkflowMask) -> u64 {
        self.filtered(workflow)
            .map(|s| match u64::try_from(s.estimate()) {
                Ok(secs) if secs > 0 => secs,
                _ => DEFAULT_STEP_BUDGET_SECS,
            })
            .sum()
    }

    /// State of the workflow before any run: `Required` if at least one step
    /// would run, `Unnecessary` otherwise.
    pub fn initial_state(&self, workflow: WorkflowMask) -> RunState {
        if self.filtered(workflow).next().is_some() {
            RunState::Required
        } else {
            RunState::Unnecessary
        }
    }

    /// Put every step back to `NotStarted`.
    pub fn reset(&mut self) {
        for step in &mut self.steps {
            step.reset();
        }
    }

    /// Snapshots of every step.
    pub fn snapshots(&self) -> Vec<StepSnapshot> {
        self.steps
            .iter()
            .enumerate()
            .map(|(i, s)| s.snapshot(i))
            .collect()
    }

    pub(crate) fn step_mut(&mut self, index: usize) -> Option<&mut Step> {
        self.steps.get_mut(index)
    }
}

impl FromIterator<Step> for StepPlan {
    fn from_iter<I: IntoIterator<Item = Step>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
