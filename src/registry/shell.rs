//! Controllers that run manifest commands through the shell.
//!
//! Commands and descriptions are interpolated when the step runs, so
//! settings changed by earlier steps are visible to later ones. A command
//! can update a setting by printing a line of the form
//! `stagehand:set KEYWORD=value` on stdout.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, warn};

use super::controller::{ProductContext, ProductController};
use crate::config::interpolation::{resolve_string, resolve_string_with_default};
use crate::config::schema::{ConfigureStepConfig, RemoveStepConfig};
use crate::config::InterpolationContext;
use crate::error::Result;
use crate::settings::{keywords, InstallSettings};
use crate::shell::{execute_streaming, CommandOptions, OutputLine};
use crate::steps::{Step, StepContext, StepFailure, StepOutcome, StepPlan, SubStep, WorkflowMask};

/// Prefix of stdout lines that update settings.
pub const SET_DIRECTIVE: &str = "stagehand:set ";

/// What a command body does with its command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Execution {
    /// Run it.
    Run,
    /// Report it and succeed.
    DryRun,
}

/// Runs manifest commands, or only reports them in dry-run mode.
pub struct ShellController {
    context: ProductContext,
    execution: Execution,
}

impl ShellController {
    pub fn new(context: ProductContext, execution: Execution) -> Self {
        Self { context, execution }
    }

    /// Registry constructor for the `shell` kind.
    pub fn create(context: ProductContext) -> Box<dyn ProductController> {
        Box::new(Self::new(context, Execution::Run))
    }

    /// Registry constructor for the `dry-run` kind.
    pub fn create_dry_run(context: ProductContext) -> Box<dyn ProductController> {
        Box::new(Self::new(context, Execution::DryRun))
    }

    fn command(&self, template: &str) -> CommandBody {
        CommandBody {
            template: template.to_string(),
            product: self.context.manifest.product.clone(),
            project_root: self.context.project_root.clone(),
            settings: Arc::clone(&self.context.settings),
            execution: self.execution,
        }
    }

    fn configure_step(
        &self,
        config: &ConfigureStepConfig,
        preview: &InterpolationContext,
    ) -> Result<Step> {
        let workflows = if config.workflows.is_empty() {
            WorkflowMask::ALL
        } else {
            WorkflowMask::from_names(&config.workflows)?
        };
        let description_template = config
            .description
            .clone()
            .unwrap_or_else(|| config.name.clone());
        let description = resolve_string_with_default(&description_template, preview, "?");

        let body = self.command(&config.command);
        let step = Step::new(&config.name, description, move |ctx: &mut StepContext<'_>| {
            let vars = body.interpolation();
            if let Ok(resolved) = resolve_string(&description_template, &vars) {
                ctx.set_description(resolved);
            }
            body.run(ctx)
        })
        .estimated_seconds(config.estimated_seconds)
        .required(config.required)
        .enabled(config.enabled)
        .workflows(workflows);
        Ok(step)
    }

    fn remove_step(&self, config: &RemoveStepConfig, preview: &InterpolationContext) -> Step {
        let description = resolve_string_with_default(
            config.description.as_deref().unwrap_or(&config.name),
            preview,
            "?",
        );

        let step = match &config.command {
            Some(command) if !config.is_group() => {
                let body = self.command(command);
                Step::new(&config.name, description, move |ctx: &mut StepContext<'_>| {
                    body.run(ctx)
                })
            }
            _ => {
                let actions = config
                    .actions
                    .iter()
                    .map(|action| {
                        let body = self.command(&action.command);
                        SubStep::new(
                            resolve_string_with_default(&action.description, preview, "?"),
                            move |ctx: &mut StepContext<'_>| body.run(ctx),
                        )
                        .required(action.required)
                    })
                    .collect();
                Step::group(&config.name, description, actions)
            }
        };

        step.estimated_seconds(config.estimated_seconds)
            .required(config.required)
            .enabled(config.enabled)
    }
}

impl ProductController for ShellController {
    fn kind(&self) -> &str {
        match self.execution {
            Execution::Run => "shell",
            Execution::DryRun => "dry-run",
        }
    }

    fn context(&self) -> &ProductContext {
        &self.context
    }

    fn configure_plan(&self) -> Result<StepPlan> {
        let preview = self.context.interpolation();
        self.context
            .manifest
            .configure
            .iter()
            .map(|config| self.configure_step(config, &preview))
            .collect()
    }

    fn remove_plan(&self) -> Result<StepPlan> {
        let preview = self.context.interpolation();
        Ok(self
            .context
            .manifest
            .remove
            .iter()
            .map(|config| self.remove_step(config, &preview))
            .collect())
    }
}

/// One shell command bound to the shared settings.
struct CommandBody {
    template: String,
    product: String,
    project_root: PathBuf,
    settings: Arc<RwLock<InstallSettings>>,
    execution: Execution,
}

impl CommandBody {
    fn current_settings(&self) -> InstallSettings {
        self.settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn interpolation(&self) -> InterpolationContext {
        InterpolationContext::new()
            .with_product(&self.product, &self.project_root)
            .with_settings(&self.current_settings())
    }

    /// `STAGEHAND_<KEYWORD>` variables for the child process.
    fn environment(&self) -> HashMap<String, String> {
        let settings = self.current_settings();
        let mut env: HashMap<String, String> = keywords::KEYWORDS
            .iter()
            .map(|k| (format!("STAGEHAND_{}", k.keyword), (k.get)(&settings)))
            .collect();
        env.insert("STAGEHAND_PRODUCT".to_string(), self.product.clone());
        env
    }

    fn apply_directive(&self, assignment: &str) -> std::result::Result<(), String> {
        let mut settings = self.settings.write().unwrap_or_else(PoisonError::into_inner);
        keywords::apply(&mut settings, &[assignment]).map_err(|e| e.to_string())
    }

    fn run(&self, ctx: &mut StepContext<'_>) -> StepOutcome {
        let command = resolve_string(&self.template, &self.interpolation())?;

        if self.execution == Execution::DryRun {
            ctx.info(&format!("would run: {}", command));
            return Ok(());
        }

        debug!("Running: {}", command);
        let options = CommandOptions {
            cwd: Some(self.project_root.clone()),
            env: self.environment(),
        };
        let ctx = &*ctx;
        let result = execute_streaming(
            &command,
            &options,
            &mut |line| match line {
                OutputLine::Stdout(text) => match text.strip_prefix(SET_DIRECTIVE) {
                    Some(assignment) => {
                        if let Err(message) = self.apply_directive(assignment.trim()) {
                            warn!("Ignoring settings directive '{}': {}", assignment, message);
                            ctx.error(&message);
                        }
                    }
                    None => ctx.info(&text),
                },
                OutputLine::Stderr(text) => ctx.info(&text),
            },
            &|| ctx.is_cancelled(),
        )?;

        if result.stopped {
            return Err(StepFailure::new("stopped: run was cancelled"));
        }
        if !result.success {
            let code = result
                .exit_code
                .map_or_else(|| "signal".to_string(), |c| c.to_string());
            let tail = result.stderr_tail(3);
            let message = if tail.is_empty() {
                format!("'{}' exited with {}", command, code)
            } else {
                format!("'{}' exited with {}: {}", command, code, tail)
            };
            return Err(StepFailure::new(message));
        }
        Ok(())
    }
}
