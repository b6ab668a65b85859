//! Manifest and settings loading shared by the commands.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::{load_manifest, ProductManifest};
use crate::error::{Result, StagehandError};
use crate::registry::ProductContext;
use crate::settings::{InstallSettings, SettingsStore};
use crate::ui::UserInterface;

/// A product manifest together with its saved settings.
#[derive(Debug, Clone)]
pub struct Project {
    pub root: PathBuf,
    pub manifest: ProductManifest,
    pub store: SettingsStore,
    /// Manifest defaults overlaid with the saved settings file.
    pub settings: InstallSettings,
}

impl Project {
    /// Load the manifest and saved settings for `root`.
    pub fn load(root: &Path, manifest_override: Option<&Path>) -> Result<Self> {
        let manifest = load_manifest(root, manifest_override)?;
        let store = SettingsStore::for_project(root);
        let settings = store.load_or(manifest.settings.clone())?;
        debug!(
            "Loaded {} ({}) with settings from {}",
            manifest.product,
            manifest.kind,
            store.path().display()
        );
        Ok(Self {
            root: root.to_path_buf(),
            manifest,
            store,
            settings,
        })
    }

    /// Load, reporting a missing manifest through `ui` instead of failing.
    ///
    /// Returns `Ok(None)` when there is no manifest.
    pub fn load_or_report(
        root: &Path,
        manifest_override: Option<&Path>,
        ui: &mut dyn UserInterface,
    ) -> Result<Option<Self>> {
        match Self::load(root, manifest_override) {
            Ok(project) => Ok(Some(project)),
            Err(StagehandError::ManifestNotFound { path }) => {
                ui.error(&format!("No manifest found at {}", path.display()));
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Controller context with the given settings.
    pub fn context(&self, settings: InstallSettings) -> ProductContext {
        ProductContext::new(self.manifest.clone(), settings, &self.root)
    }
}
