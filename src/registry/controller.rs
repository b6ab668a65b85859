//! Product controllers build step plans for a product.

use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

use crate::config::schema::ProductManifest;
use crate::config::InterpolationContext;
use crate::error::Result;
use crate::settings::InstallSettings;
use crate::steps::StepPlan;

/// Everything a controller needs to build its plans.
#[derive(Debug, Clone)]
pub struct ProductContext {
    pub manifest: ProductManifest,
    /// Shared with step bodies; bodies read it when they run and may update it.
    pub settings: Arc<RwLock<InstallSettings>>,
    pub project_root: PathBuf,
}

impl ProductContext {
    pub fn new(
        manifest: ProductManifest,
        settings: InstallSettings,
        project_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            manifest,
            settings: Arc::new(RwLock::new(settings)),
            project_root: project_root.into(),
        }
    }

    /// Copy of the current settings.
    pub fn settings(&self) -> InstallSettings {
        self.settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Interpolation context for the current settings.
    pub fn interpolation(&self) -> InterpolationContext {
        InterpolationContext::new()
            .with_product(&self.manifest.product, &self.project_root)
            .with_settings(&self.settings())
    }
}

/// Builds the configure and remove plans of one product.
pub trait ProductController: Send {
    /// Registry kind this controller was created for.
    fn kind(&self) -> &str;

    fn context(&self) -> &ProductContext;

    fn configure_plan(&self) -> Result<StepPlan>;

    fn remove_plan(&self) -> Result<StepPlan>;
}

/// Constructor stored in the registry.
pub type ControllerFactory = fn(ProductContext) -> Box<dyn ProductController>;
