//! Settings command implementation.
//!
//! `stagehand settings` shows the effective settings. With `KEYWORD=value`
//! arguments it validates them, applies them, and saves the result.

use std::path::{Path, PathBuf};

use crate::cli::args::SettingsArgs;
use crate::error::Result;
use crate::settings::{keywords, KEYWORDS};
use crate::ui::{StagehandTheme, UserInterface};

use super::dispatcher::{Command, CommandResult, EXIT_NO_MANIFEST};
use super::project::Project;

/// The settings command implementation.
pub struct SettingsCommand {
    project_root: PathBuf,
    manifest: Option<PathBuf>,
    args: SettingsArgs,
}

impl SettingsCommand {
    pub fn new(project_root: &Path, manifest: Option<&Path>, args: SettingsArgs) -> Self {
        Self {
            project_root: project_root.to_path_buf(),
            manifest: manifest.map(Path::to_path_buf),
            args,
        }
    }
}

impl Command for SettingsCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let manifest = self.manifest.as_deref();
        let Some(project) = Project::load_or_report(&self.project_root, manifest, ui)? else {
            return Ok(CommandResult::failure(EXIT_NO_MANIFEST));
        };

        let snapshot = project.settings.snapshot();
        let mut settings = project.settings.clone();
        keywords::apply(&mut settings, &self.args.assignments)?;

        if project.store.save_if_changed(&settings, &snapshot)? {
            ui.success(&format!(
                "Saved {} to {}",
                settings.changed_keys(&snapshot).join(", "),
                project.store.path().display()
            ));
        } else if !self.args.assignments.is_empty() {
            ui.message("Settings unchanged");
        }

        let theme = StagehandTheme::new();
        for keyword in KEYWORDS {
            ui.message(&format!(
                "  {:<14} {}  {}",
                theme.key.apply_to(keyword.keyword),
                (keyword.get)(&settings),
                theme.dim.apply_to(format!("# {}", keyword.description))
            ));
        }

        Ok(CommandResult::success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::SettingsStore;
    use crate::ui::MockUI;
    use std::fs;
    use tempfile::TempDir;

    fn setup_project() -> TempDir {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join(".stagehand");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("product.yml"), "product: demo\n").unwrap();
        temp
    }

    fn run(temp: &TempDir, assignments: &[&str], ui: &mut MockUI) -> Result<CommandResult> {
        let args = SettingsArgs {
            assignments: assignments.iter().map(|a| a.to_string()).collect(),
        };
        SettingsCommand::new(temp.path(), None, args).execute(ui)
    }

    #[test]
    fn shows_every_keyword() {
        let temp = setup_project();
        let mut ui = MockUI::new();

        run(&temp, &[], &mut ui).unwrap();

        for keyword in KEYWORDS {
            assert!(ui.has_message(keyword.keyword));
        }
        assert!(!SettingsStore::for_project(temp.path()).exists());
    }

    #[test]
    fn assignments_are_saved() {
        let temp = setup_project();
        let mut ui = MockUI::new();

        run(&temp, &["port=9000", "START_SERVICE=no"], &mut ui).unwrap();

        assert!(ui.successes()[0].contains("PORT, START_SERVICE"));
        let saved = SettingsStore::for_project(temp.path())
            .load_or(Default::default())
            .unwrap();
        assert_eq!(saved.port, 9000);
        assert!(!saved.start_service);
    }

    #[test]
    fn invalid_assignment_saves_nothing() {
        let temp = setup_project();
        let mut ui = MockUI::new();

        let result = run(&temp, &["PORT=9000", "SERVICE_NAME=bad name"], &mut ui);

        assert!(result.is_err());
        assert!(!SettingsStore::for_project(temp.path()).exists());
    }

    #[test]
    fn unchanged_assignment_is_reported() {
        let temp = setup_project();
        let mut ui = MockUI::new();

        run(&temp, &["PORT=8080"], &mut ui).unwrap();

        assert!(ui.has_message("Settings unchanged"));
    }
}
