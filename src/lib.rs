//! Stagehand - Step orchestration for product configure and remove workflows.
//!
//! Stagehand drives an ordered plan of installer steps on a background
//! worker, enforcing required/optional failure rules, reporting progress as
//! events, and watching the run against its estimated time budget.
//!
//! # Modules
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`config`] - Product manifest loading, validation, and interpolation
//! - [`error`] - Error types and result aliases
//! - [`registry`] - Product controllers that turn manifests into step plans
//! - [`runner`] - Orchestrator, run states, events, and the watchdog
//! - [`settings`] - Installer settings, keyword overrides, and persistence
//! - [`shell`] - Shell command execution
//! - [`steps`] - Steps, grouped sub-steps, and step plans
//! - [`ui`] - Spinners, terminal output, and event reporting
//!
//! # Example
//!
//! ```
//! use stagehand::runner::{Orchestrator, RunState};
//! use stagehand::steps::{Step, StepFailure, StepPlan, WorkflowMask};
//!
//! let plan = StepPlan::new(vec![
//!     Step::new("config", "Write configuration", |_| Ok(())).required(true),
//!     Step::new("docs", "Install documentation", |_| {
//!         Err(StepFailure::new("docs package missing"))
//!     }),
//! ]);
//!
//! let mut orchestrator = Orchestrator::new(plan);
//! let state = orchestrator.configure_blocking(WorkflowMask::INSTALL).unwrap();
//!
//! // Optional failures do not fail a configure run.
//! assert_eq!(state, RunState::Complete);
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod registry;
pub mod runner;
pub mod settings;
pub mod shell;
pub mod steps;
pub mod ui;

pub use error::{Result, StagehandError};
