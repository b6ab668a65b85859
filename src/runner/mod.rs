//! Step execution orchestration.
//!
//! - [`Orchestrator`] - Runs a step plan on a background worker
//! - [`Watchdog`] - Advisory overrun timer
//! - [`Events`] - Fan-out of run events to subscribers
//! - [`reduce_configure`] / [`reduce_remove`] - Terminal state reducers

pub mod events;
pub mod orchestrator;
pub mod outcome;
pub mod watchdog;

pub use events::{EventCallback, Events, RunEvent, RunKind, StatusKind};
pub use orchestrator::{CancelHandle, Orchestrator, OrchestratorOptions};
pub use outcome::{has_remove_warnings, reduce_configure, reduce_remove, RunState};
pub use watchdog::{Overrun, Watchdog};
