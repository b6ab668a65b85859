//! CLI argument definitions.
//!
//! This module defines all CLI arguments using clap's derive macros.
//! The main entry point is the [`Cli`] struct.

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// Stagehand - Step orchestration for product configure and remove workflows.
#[derive(Debug, Parser)]
#[command(name = "stagehand")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to manifest file (overrides default .stagehand/product.yml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to project root (overrides current directory)
    #[arg(short, long, global = true)]
    pub project: Option<PathBuf>,

    /// Show verbose output, including command output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the configure workflow (default if no command specified)
    Configure(RunArgs),

    /// Run the remove workflow
    Remove(RunArgs),

    /// List the product's configure and remove steps
    List(ListArgs),

    /// Show or change saved settings
    Settings(SettingsArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Arguments shared by `configure` and `remove`.
#[derive(Debug, Clone, clap::Args)]
pub struct RunArgs {
    /// Workflow type: install, upgrade, repair, or all
    #[arg(short, long, default_value = "install")]
    pub workflow: String,

    /// Report commands without executing them
    #[arg(long)]
    pub dry_run: bool,

    /// Retry a failed run this many times
    #[arg(long, default_value_t = 0)]
    pub retries: u32,

    /// Cancel the run once it exceeds its time budget
    #[arg(long)]
    pub cancel_on_timeout: bool,

    /// Plain output without spinners
    #[arg(long)]
    pub non_interactive: bool,

    /// Settings overrides for this run
    #[arg(value_name = "KEYWORD=VALUE")]
    pub overrides: Vec<String>,
}

impl Default for RunArgs {
    fn default() -> Self {
        Self {
            workflow: "install".to_string(),
            dry_run: false,
            retries: 0,
            cancel_on_timeout: false,
            non_interactive: false,
            overrides: Vec::new(),
        }
    }
}

/// Arguments for the `list` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct ListArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `settings` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct SettingsArgs {
    /// Assignments to save
    #[arg(value_name = "KEYWORD=VALUE")]
    pub assignments: Vec<String>,
}

/// Arguments for the `completions` command.
#[derive(Debug, Clone, clap::Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn configure_accepts_overrides_and_flags() {
        let cli = Cli::parse_from([
            "stagehand",
            "configure",
            "--workflow",
            "upgrade",
            "--retries",
            "2",
            "PORT=9000",
            "SERVICE_NAME=demo",
        ]);
        let Some(Commands::Configure(args)) = cli.command else {
            panic!("expected configure");
        };
        assert_eq!(args.workflow, "upgrade");
        assert_eq!(args.retries, 2);
        assert_eq!(args.overrides, ["PORT=9000", "SERVICE_NAME=demo"]);
        assert!(!args.dry_run);
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from(["stagehand", "remove", "--dry-run", "--quiet"]);
        assert!(cli.quiet);
        assert!(matches!(cli.command, Some(Commands::Remove(ref args)) if args.dry_run));
    }

    #[test]
    fn no_subcommand_is_allowed() {
        let cli = Cli::parse_from(["stagehand"]);
        assert!(cli.command.is_none());
    }

    #[test]
    fn run_args_default_matches_clap_default() {
        let cli = Cli::parse_from(["stagehand", "configure"]);
        let Some(Commands::Configure(args)) = cli.command else {
            panic!("expected configure");
        };
        let default = RunArgs::default();
        assert_eq!(args.workflow, default.workflow);
        assert_eq!(args.retries, default.retries);
    }
}
