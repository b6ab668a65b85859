//! Command dispatching.
//!
//! This module provides the core command infrastructure:
//! - [`Command`] trait for implementing commands
//! - [`CommandResult`] for uniform result reporting
//! - [`CommandDispatcher`] for routing CLI subcommands

use std::path::{Path, PathBuf};

use crate::cli::args::{Cli, Commands, RunArgs};
use crate::error::Result;
use crate::runner::RunKind;
use crate::ui::UserInterface;

/// Exit code for a missing manifest.
pub const EXIT_NO_MANIFEST: i32 = 2;

/// Exit code for a cancelled run (128 + SIGINT).
pub const EXIT_CANCELLED: i32 = 130;

/// Trait for command implementations.
///
/// Each CLI subcommand implements this trait to provide its execution logic.
pub trait Command {
    /// Execute the command.
    ///
    /// # Arguments
    ///
    /// * `ui` - User interface for displaying output
    ///
    /// # Returns
    ///
    /// A [`CommandResult`] indicating success/failure and exit code.
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult>;
}

/// Result of command execution.
#[derive(Debug)]
pub struct CommandResult {
    /// Whether the command succeeded.
    pub success: bool,

    /// Exit code to use (0 for success, non-zero for failure).
    pub exit_code: i32,
}

impl CommandResult {
    /// Create a successful result.
    pub fn success() -> Self {
        Self {
            success: true,
            exit_code: 0,
        }
    }

    /// Create a failure result.
    pub fn failure(exit_code: i32) -> Self {
        Self {
            success: false,
            exit_code,
        }
    }
}

/// Dispatches CLI commands to their implementations.
pub struct CommandDispatcher {
    project_root: PathBuf,
    manifest: Option<PathBuf>,
}

impl CommandDispatcher {
    /// Create a new dispatcher for the given project root.
    pub fn new(project_root: PathBuf) -> Self {
        Self {
            project_root,
            manifest: None,
        }
    }

    /// Load the manifest from `path` instead of the project default.
    pub fn with_manifest(mut self, path: Option<PathBuf>) -> Self {
        self.manifest = path;
        self
    }

    /// Get the project root path.
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Dispatch and execute a command.
    ///
    /// Routes the CLI subcommand to the appropriate command implementation
    /// and executes it.
    pub fn dispatch(&self, cli: &Cli, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let manifest = self.manifest.as_deref();
        match &cli.command {
            Some(Commands::Configure(args)) => super::run::RunCommand::new(
                &self.project_root,
                manifest,
                RunKind::Configure,
                args.clone(),
            )
            .execute(ui),
            Some(Commands::Remove(args)) => super::run::RunCommand::new(
                &self.project_root,
                manifest,
                RunKind::Remove,
                args.clone(),
            )
            .execute(ui),
            Some(Commands::List(args)) => {
                let cmd = super::list::ListCommand::new(&self.project_root, manifest, args.clone());
                cmd.execute(ui)
            }
            Some(Commands::Settings(args)) => {
                let cmd = super::settings::SettingsCommand::new(
                    &self.project_root,
                    manifest,
                    args.clone(),
                );
                cmd.execute(ui)
            }
            Some(Commands::Completions(args)) => {
                let cmd = super::completions::CompletionsCommand::new(args.clone());
                cmd.execute(ui)
            }
            None => {
                // Default to configure with default args
                let cmd = super::run::RunCommand::new(
                    &self.project_root,
                    manifest,
                    RunKind::Configure,
                    RunArgs::default(),
                );
                cmd.execute(ui)
            }
        }
    }
}
