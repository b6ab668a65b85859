//! List command implementation.
//!
//! The `stagehand list` command lists the configure and remove steps of
//! the product, as the controller builds them.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::cli::args::ListArgs;
use crate::error::{Result, StagehandError};
use crate::registry::ProductRegistry;
use crate::steps::{Step, StepPlan, WorkflowMask};
use crate::ui::{StagehandTheme, UserInterface};

use super::dispatcher::{Command, CommandResult, EXIT_NO_MANIFEST};
use super::project::Project;

/// One listed step.
#[derive(Debug, Serialize)]
pub struct ListedStep {
    pub name: String,
    pub description: String,
    pub required: bool,
    pub enabled: bool,
    pub workflows: String,
    pub estimated_seconds: i64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<ListedAction>,
}

/// One action of a grouped remove step.
#[derive(Debug, Serialize)]
pub struct ListedAction {
    pub description: String,
    pub required: bool,
}

/// Everything `list --json` prints.
#[derive(Debug, Serialize)]
pub struct Listing {
    pub product: String,
    pub kind: String,
    pub configure: Vec<ListedStep>,
    pub remove: Vec<ListedStep>,
}

impl ListedStep {
    fn from_step(step: &Step) -> Self {
        Self {
            name: step.name().to_string(),
            description: step.description().to_string(),
            required: step.is_required(),
            enabled: step.is_enabled(),
            workflows: step.workflow_mask().unwrap_or(WorkflowMask::ALL).to_string(),
            estimated_seconds: step.estimate(),
            actions: step
                .substeps()
                .iter()
                .map(|sub| ListedAction {
                    description: sub.description().to_string(),
                    required: sub.is_required(),
                })
                .collect(),
        }
    }

    /// Tags shown after the description.
    fn tags(&self) -> Vec<String> {
        let mut tags = Vec::new();
        if self.required {
            tags.push("required".to_string());
        }
        if !self.enabled {
            tags.push("disabled".to_string());
        }
        if self.workflows != "all" {
            tags.push(self.workflows.clone());
        }
        if self.estimated_seconds > 0 {
            tags.push(format!("~{}s", self.estimated_seconds));
        }
        tags
    }
}

fn list_plan(plan: &StepPlan) -> Vec<ListedStep> {
    plan.steps().iter().map(ListedStep::from_step).collect()
}

/// The list command implementation.
pub struct ListCommand {
    project_root: PathBuf,
    manifest: Option<PathBuf>,
    args: ListArgs,
}

impl ListCommand {
    /// Create a new list command.
    pub fn new(project_root: &Path, manifest: Option<&Path>, args: ListArgs) -> Self {
        Self {
            project_root: project_root.to_path_buf(),
            manifest: manifest.map(Path::to_path_buf),
            args,
        }
    }

    /// Build the listing for a loaded project.
    pub fn listing(project: &Project) -> Result<Listing> {
        let registry = ProductRegistry::with_builtins();
        let controller = registry.create(project.context(project.settings.clone()))?;
        Ok(Listing {
            product: project.manifest.product.clone(),
            kind: project.manifest.kind.clone(),
            configure: list_plan(&controller.configure_plan()?),
            remove: list_plan(&controller.remove_plan()?),
        })
    }

    fn show_section(
        ui: &mut dyn UserInterface,
        theme: &StagehandTheme,
        title: &str,
        steps: &[ListedStep],
    ) {
        ui.message(&format!("{}", theme.key.apply_to(title)));
        if steps.is_empty() {
            ui.message(&format!("  {}", theme.dim.apply_to("(none)")));
        }
        for step in steps {
            let tags = step.tags();
            let tags = if tags.is_empty() {
                String::new()
            } else {
                format!(" {}", theme.dim.apply_to(format!("[{}]", tags.join(", "))))
            };
            ui.message(&format!(
                "  {}: {}{}",
                theme.highlight.apply_to(&step.name),
                step.description,
                tags
            ));
            for action in &step.actions {
                let required = if action.required { " [required]" } else { "" };
                ui.message(&format!("    - {}{}", action.description, required));
            }
        }
    }
}

impl Command for ListCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let manifest = self.manifest.as_deref();
        let Some(project) = Project::load_or_report(&self.project_root, manifest, ui)? else {
            return Ok(CommandResult::failure(EXIT_NO_MANIFEST));
        };
        let listing = Self::listing(&project)?;

        if self.args.json {
            let json = serde_json::to_string_pretty(&listing)
                .map_err(|e| StagehandError::Other(anyhow::anyhow!(e)))?;
            println!("{}", json);
            return Ok(CommandResult::success());
        }

        let theme = StagehandTheme::new();
        ui.message(&format!(
            "{} {}",
            theme.header.apply_to(&listing.product),
            theme.dim.apply_to(format!("({})", listing.kind))
        ));
        ui.message("");
        Self::show_section(ui, &theme, "Configure steps:", &listing.configure);
        ui.message("");
        Self::show_section(ui, &theme, "Remove steps:", &listing.remove);

        Ok(CommandResult::success())
    }
}
