//! Configure and remove command implementation.
//!
//! The `stagehand configure` and `stagehand remove` commands build the
//! product's step plan and drive it through the orchestrator, rendering
//! progress as events arrive.

use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::Instant;

use tracing::{debug, warn};

use crate::cli::args::RunArgs;
use crate::error::Result;
use crate::registry::ProductRegistry;
use crate::runner::{
    has_remove_warnings, CancelHandle, Orchestrator, OrchestratorOptions, RunEvent, RunKind,
    RunState,
};
use crate::settings::keywords;
use crate::shell::is_elevated;
use crate::steps::WorkflowMask;
use crate::ui::{RunReporter, RunSummary, UserInterface};

use super::dispatcher::{Command, CommandResult, EXIT_CANCELLED, EXIT_NO_MANIFEST};
use super::project::Project;

/// Run that Ctrl-C cancels.
fn interrupt_target() -> &'static Mutex<Option<CancelHandle>> {
    static TARGET: OnceLock<Mutex<Option<CancelHandle>>> = OnceLock::new();
    TARGET.get_or_init(|| {
        let installed = ctrlc::set_handler(|| {
            let handle = interrupt_target()
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone();
            if let Some(handle) = handle {
                handle.cancel();
            }
        });
        if let Err(e) = installed {
            warn!("Ctrl-C will not cancel the run: {}", e);
        }
        Mutex::new(None)
    })
}

/// Discard events still queued after a run ended, such as the late
/// `StepFinished` of a step that was in flight when the run was cancelled.
fn drain_late_events(events: &Receiver<RunEvent>) -> usize {
    let late = events.try_iter().count();
    if late > 0 {
        debug!("Dropped {} event(s) that arrived after the run ended", late);
    }
    late
}

fn set_interrupt_target(handle: Option<CancelHandle>) {
    *interrupt_target()
        .lock()
        .unwrap_or_else(PoisonError::into_inner) = handle;
}

/// Map a terminal state to a process exit code.
pub fn exit_code(state: Option<RunState>) -> i32 {
    match state {
        Some(state) if state.is_success() => 0,
        Some(RunState::Unnecessary) => 0,
        Some(RunState::Cancelled) => EXIT_CANCELLED,
        _ => 1,
    }
}

/// The configure/remove command implementation.
pub struct RunCommand {
    project_root: PathBuf,
    manifest: Option<PathBuf>,
    kind: RunKind,
    args: RunArgs,
}

impl RunCommand {
    /// Create a new run command.
    pub fn new(project_root: &Path, manifest: Option<&Path>, kind: RunKind, args: RunArgs) -> Self {
        Self {
            project_root: project_root.to_path_buf(),
            manifest: manifest.map(Path::to_path_buf),
            kind,
            args,
        }
    }

    /// Get the command arguments.
    pub fn args(&self) -> &RunArgs {
        &self.args
    }

    /// Start the first attempt, or retry the previous one.
    fn start(
        &self,
        orchestrator: &mut Orchestrator,
        workflow: WorkflowMask,
        attempt: u32,
    ) -> Result<()> {
        if attempt > 0 {
            return orchestrator.retry();
        }
        match self.kind {
            RunKind::Configure => orchestrator.configure(workflow),
            RunKind::Remove => orchestrator.remove(workflow),
        }
    }
}

impl Command for RunCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let manifest = self.manifest.as_deref();
        let Some(project) = Project::load_or_report(&self.project_root, manifest, ui)? else {
            return Ok(CommandResult::failure(EXIT_NO_MANIFEST));
        };

        let workflow: WorkflowMask = self.args.workflow.parse()?;
        let snapshot = project.settings.snapshot();
        let mut settings = project.settings.clone();
        keywords::apply(&mut settings, &self.args.overrides)?;

        let context = project.context(settings);
        let shared_settings = Arc::clone(&context.settings);
        let registry = ProductRegistry::with_builtins();
        let controller = if self.args.dry_run {
            registry.create_as("dry-run", context)?
        } else {
            registry.create(context)?
        };
        let plan = match self.kind {
            RunKind::Configure => controller.configure_plan()?,
            RunKind::Remove => controller.remove_plan()?,
        };

        let selected = plan.filtered_indices(workflow);
        if selected.is_empty() {
            ui.message(&format!(
                "Nothing to {} for {} ({})",
                self.kind, project.manifest.product, workflow
            ));
            return Ok(CommandResult::success());
        }

        if self.args.dry_run {
            ui.message("Running in dry-run mode; no commands will be executed");
        } else if !is_elevated() {
            ui.warning("Not running as root; steps that modify the system may fail");
        }

        let options = OrchestratorOptions {
            cancel_on_timeout: self.args.cancel_on_timeout,
            ..Default::default()
        };
        let mut orchestrator = Orchestrator::with_options(plan, options);
        let events = orchestrator.events_channel();
        set_interrupt_target(Some(orchestrator.cancel_handle()));

        let started = Instant::now();
        let mut state = None;
        for attempt in 0..=self.args.retries {
            if attempt > 0 {
                ui.warning(&format!(
                    "Retrying {} (attempt {} of {})",
                    self.kind,
                    attempt + 1,
                    self.args.retries + 1
                ));
            }
            self.start(&mut orchestrator, workflow, attempt)?;
            let mut reporter = RunReporter::new(ui, &project.manifest.product, selected.len());
            state = reporter.follow(&events);
            let final_state = orchestrator.wait()?;
            drain_late_events(&events);
            state = state.or(Some(final_state));
            debug!("Attempt {} ended: {:?}", attempt + 1, state);
            if state != Some(RunState::Error) {
                break;
            }
        }
        set_interrupt_target(None);

        let steps: Vec<_> = orchestrator
            .steps()
            .into_iter()
            .filter(|step| selected.contains(&step.index))
            .collect();
        let display_state = state.map(|s| match self.kind {
            RunKind::Remove => s.with_warnings(has_remove_warnings(&steps)),
            RunKind::Configure => s,
        });
        if let Some(display_state) = display_state {
            ui.show_run_summary(&RunSummary {
                product: project.manifest.product.clone(),
                kind: self.kind,
                state: display_state,
                steps,
                total_duration: started.elapsed(),
            });
        }

        if self.args.dry_run {
            debug!("Dry run; settings left untouched");
        } else {
            let current = shared_settings
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .clone();
            if project.store.save_if_changed(&current, &snapshot)? {
                ui.message(&format!(
                    "Saved settings: {}",
                    current.changed_keys(&snapshot).join(", ")
                ));
            }
        }

        let code = exit_code(state);
        Ok(if code == 0 {
            CommandResult::success()
        } else {
            CommandResult::failure(code)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::MockUI;
    use std::fs;
    use tempfile::TempDir;

    fn setup_project(manifest: &str) -> TempDir {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join(".stagehand");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("product.yml"), manifest).unwrap();
        temp
    }

    fn run(temp: &TempDir, kind: RunKind, args: RunArgs, ui: &mut MockUI) -> CommandResult {
        RunCommand::new(temp.path(), None, kind, args)
            .execute(ui)
            .unwrap()
    }

    #[test]
    fn late_events_are_drained_before_the_next_attempt() {
        use crate::steps::{Step, StepPlan};
        use std::sync::mpsc;

        let (release, gate) = mpsc::channel::<()>();
        let gate = Mutex::new(gate);
        let plan = StepPlan::new(vec![Step::new("slow", "Slow", move |_| {
            let _ = gate.lock().unwrap().recv();
            Ok(())
        })]);
        let mut orchestrator = Orchestrator::new(plan);
        let events = orchestrator.events_channel();
        orchestrator.configure(WorkflowMask::ALL).unwrap();

        for event in events.iter() {
            if matches!(event, RunEvent::StepStarting(_)) {
                break;
            }
        }
        orchestrator.cancel();
        let mut reporter_ui = MockUI::new();
        let followed = RunReporter::new(&mut reporter_ui, "demo", 1).follow(&events);
        assert_eq!(followed, Some(RunState::Cancelled));

        release.send(()).unwrap();
        orchestrator.wait().unwrap();

        assert_eq!(drain_late_events(&events), 1);
        assert_eq!(events.try_iter().count(), 0);
    }

    #[test]
    fn exit_codes_by_state() {
        assert_eq!(exit_code(Some(RunState::Complete)), 0);
        assert_eq!(exit_code(Some(RunState::CompleteWithWarnings)), 0);
        assert_eq!(exit_code(Some(RunState::Unnecessary)), 0);
        assert_eq!(exit_code(Some(RunState::Error)), 1);
        assert_eq!(exit_code(Some(RunState::Cancelled)), 130);
        assert_eq!(exit_code(None), 1);
    }

    #[test]
    fn missing_manifest_exits_with_two() {
        let temp = TempDir::new().unwrap();
        let mut ui = MockUI::new();

        let result = run(&temp, RunKind::Configure, RunArgs::default(), &mut ui);
        assert_eq!(result.exit_code, EXIT_NO_MANIFEST);
    }

    #[test]
    fn dry_run_reports_without_running() {
        let temp = setup_project(
            r#"
product: demo
configure:
  - name: touch
    description: Create marker
    command: touch marker
"#,
        );
        let mut ui = MockUI::new();
        let args = RunArgs {
            dry_run: true,
            ..Default::default()
        };

        let result = run(&temp, RunKind::Configure, args, &mut ui);

        assert!(result.success);
        assert!(!temp.path().join("marker").exists());
        assert_eq!(ui.summaries()[0].state, RunState::Complete);
    }

    #[test]
    fn no_matching_steps_is_success() {
        let temp = setup_project(
            r#"
product: demo
configure:
  - name: migrate
    command: "true"
    workflows: [upgrade]
"#,
        );
        let mut ui = MockUI::new();

        let result = run(&temp, RunKind::Configure, RunArgs::default(), &mut ui);

        assert!(result.success);
        assert!(ui.has_message("Nothing to configure"));
        assert!(ui.summaries().is_empty());
    }

    #[test]
    fn dry_run_does_not_save_overrides() {
        let temp = setup_project("product: demo\nconfigure:\n  - name: a\n    command: \"true\"\n");
        let mut ui = MockUI::new();
        let args = RunArgs {
            dry_run: true,
            overrides: vec!["PORT=9000".to_string()],
            ..Default::default()
        };

        run(&temp, RunKind::Configure, args, &mut ui);

        assert!(!temp.path().join(".stagehand/settings.yml").exists());
    }

    #[test]
    fn bad_override_is_an_error() {
        let temp = setup_project("product: demo\n");
        let mut ui = MockUI::new();
        let args = RunArgs {
            overrides: vec!["PORT=http".to_string()],
            ..Default::default()
        };

        let result = RunCommand::new(temp.path(), None, RunKind::Configure, args).execute(&mut ui);
        assert!(result.is_err());
    }

    #[cfg(unix)]
    #[test]
    fn remove_with_failed_optional_action_completes_with_warnings() {
        let temp = setup_project(
            r#"
product: demo
remove:
  - name: cleanup
    description: Clean up
    required: true
    actions:
      - description: Delete cache
        command: "exit 3"
      - description: Delete logs
        command: "true"
"#,
        );
        let mut ui = MockUI::new();

        let result = run(&temp, RunKind::Remove, RunArgs::default(), &mut ui);

        assert!(result.success);
        assert_eq!(ui.summaries()[0].state, RunState::CompleteWithWarnings);
    }

    #[cfg(unix)]
    #[test]
    fn retries_rerun_the_whole_plan() {
        let temp = setup_project(
            r#"
product: demo
configure:
  - name: count
    command: "echo run >> attempts.log"
  - name: fail
    command: "exit 1"
    required: true
"#,
        );
        let mut ui = MockUI::new();
        let args = RunArgs {
            retries: 2,
            ..Default::default()
        };

        let result = run(&temp, RunKind::Configure, args, &mut ui);

        assert_eq!(result.exit_code, 1);
        let attempts = fs::read_to_string(temp.path().join("attempts.log")).unwrap();
        assert_eq!(attempts.lines().count(), 3);
        assert_eq!(ui.run_headers().len(), 3);
    }
}
