//! Product registry.
//!
//! Maps a manifest's `kind` to the controller that builds its step plans.
//! The registry is an explicit value built at startup; there is no global
//! registration.
//!
//! # Built-in kinds
//!
//! - `shell` - Runs manifest commands through `/bin/sh`
//! - `dry-run` - Reports manifest commands without running them
//!
//! # Example
//!
//! ```
//! use stagehand::config::parse_manifest;
//! use stagehand::registry::{ProductContext, ProductRegistry};
//! use std::path::Path;
//!
//! let manifest = parse_manifest("product: demo", Path::new("product.yml")).unwrap();
//! let settings = manifest.settings.clone();
//! let registry = ProductRegistry::with_builtins();
//!
//! let controller = registry
//!     .create(ProductContext::new(manifest, settings, "."))
//!     .unwrap();
//! assert_eq!(controller.kind(), "shell");
//! ```

pub mod controller;
pub mod shell;

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{Result, StagehandError};

pub use controller::{ControllerFactory, ProductContext, ProductController};
pub use shell::{Execution, ShellController, SET_DIRECTIVE};

/// Kind → controller constructor.
#[derive(Debug, Clone, Default)]
pub struct ProductRegistry {
    factories: BTreeMap<String, ControllerFactory>,
}

impl ProductRegistry {
    /// A registry with no kinds.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A registry with the built-in `shell` and `dry-run` kinds.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register("shell", ShellController::create);
        registry.register("dry-run", ShellController::create_dry_run);
        registry
    }

    /// Add or replace a kind.
    pub fn register(&mut self, kind: impl Into<String>, factory: ControllerFactory) {
        self.factories.insert(kind.into(), factory);
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    /// Registered kinds in sorted order.
    pub fn kinds(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Build the controller for the manifest's own kind.
    pub fn create(&self, context: ProductContext) -> Result<Box<dyn ProductController>> {
        let kind = context.manifest.kind.clone();
        self.create_as(&kind, context)
    }

    /// Build a controller of `kind`, regardless of the manifest's kind.
    pub fn create_as(
        &self,
        kind: &str,
        context: ProductContext,
    ) -> Result<Box<dyn ProductController>> {
        let factory = self
            .factories
            .get(kind)
            .ok_or_else(|| StagehandError::UnknownProductKind {
                kind: kind.to_string(),
            })?;
        debug!("Creating '{}' controller for {}", kind, context.manifest.product);
        Ok(factory(context))
    }
}
