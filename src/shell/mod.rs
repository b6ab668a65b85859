//! Shell command execution for step bodies.

pub mod command;
pub mod platform;

pub use command::{execute_streaming, CommandOptions, CommandResult, OutputLine};
pub use platform::{is_ci, is_elevated};
