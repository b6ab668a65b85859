//! Product manifest loading, validation, and interpolation.
//!
//! - Schema definitions in [`schema`]
//! - File discovery and loading in [`loader`]
//! - Validation in [`validator`]
//! - Variable interpolation in [`interpolation`]
//!
//! # Example
//!
//! ```
//! use stagehand::config::load_manifest;
//! use tempfile::TempDir;
//! use std::fs;
//!
//! let temp = TempDir::new().unwrap();
//! let dir = temp.path().join(".stagehand");
//! fs::create_dir_all(&dir).unwrap();
//! fs::write(dir.join("product.yml"), "product: demo").unwrap();
//!
//! let manifest = load_manifest(temp.path(), None).unwrap();
//! assert_eq!(manifest.product, "demo");
//! ```

pub mod interpolation;
pub mod loader;
pub mod schema;
pub mod validator;

pub use schema::{ConfigureStepConfig, ProductManifest, RemoveActionConfig, RemoveStepConfig};

pub use loader::{
    find_project_root, load_manifest, load_manifest_file, manifest_path, parse_manifest,
    MANIFEST_FILE,
};

pub use validator::{validate, validate_manifest, ValidationError};

pub use interpolation::{
    extract_variables, has_interpolation, parse_interpolation, resolve_string,
    resolve_string_with_default, InterpolationContext, Segment,
};
