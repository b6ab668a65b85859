//! Steps and step plans.
//!
//! This module provides the units the orchestrator drives:
//!
//! - [`Step`] - A named unit of work with a status
//! - [`SubStep`] - One action inside a remove-workflow group step
//! - [`StepPlan`] - An ordered, workflow-filterable list of steps
//! - [`WorkflowMask`] - Bitset of workflow variants a step applies to
//! - [`StepSnapshot`] - Read-only view handed to observers
//!
//! # Example
//!
//! ```
//! use stagehand::steps::{Step, StepFailure, StepPlan, WorkflowMask};
//!
//! let plan = StepPlan::new(vec![
//!     Step::new("config", "Write configuration", |_| Ok(()))
//!         .required(true)
//!         .estimated_seconds(5),
//!     Step::new("upgrade-db", "Migrate database", |_| {
//!         Err(StepFailure::new("database is locked"))
//!     })
//!     .workflows(WorkflowMask::UPGRADE),
//! ]);
//!
//! assert_eq!(plan.filtered(WorkflowMask::INSTALL).count(), 1);
//! assert_eq!(plan.total_budget_seconds(WorkflowMask::INSTALL), 5);
//! ```

pub mod group;
pub mod plan;
pub mod step;
pub mod workflow;

pub use group::{SubStep, SubStepSnapshot};
pub use plan::{StepPlan, DEFAULT_STEP_BUDGET_SECS};
pub use step::{
    format_duration, Step, StepBody, StepContext, StepFailure, StepOutcome, StepSnapshot,
    StepStatus,
};
pub use workflow::WorkflowMask;
