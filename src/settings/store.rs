//! Settings file persistence.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::model::{InstallSettings, SettingsSnapshot};
use crate::error::{Result, StagehandError};

/// Settings file location relative to the project root.
pub const SETTINGS_FILE: &str = ".stagehand/settings.yml";

/// Reads and writes `.stagehand/settings.yml`.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store for the given project root.
    pub fn for_project(project_root: &Path) -> Self {
        Self::new(project_root.join(SETTINGS_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load saved settings, or `defaults` if nothing was saved yet.
    ///
    /// Fields missing from the file keep the built-in defaults.
    pub fn load_or(&self, defaults: InstallSettings) -> Result<InstallSettings> {
        if !self.path.exists() {
            debug!("No settings file at {}", self.path.display());
            return Ok(defaults);
        }
        let content = fs::read_to_string(&self.path)?;
        serde_yaml::from_str(&content).map_err(|e| StagehandError::ParseError {
            path: self.path.clone(),
            message: e.to_string(),
        })
    }

    /// Write settings unconditionally.
    pub fn save(&self, settings: &InstallSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(settings)
            .map_err(|e| StagehandError::Other(anyhow::anyhow!(e)))?;
        fs::write(&self.path, content)?;
        debug!("Saved settings to {}", self.path.display());
        Ok(())
    }

    /// Write settings only if they changed since `snapshot`.
    ///
    /// Returns true if the file was written.
    pub fn save_if_changed(
        &self,
        settings: &InstallSettings,
        snapshot: &SettingsSnapshot,
    ) -> Result<bool> {
        if !settings.changed_since(snapshot) {
            return Ok(false);
        }
        self.save(settings)?;
        Ok(true)
    }
}
