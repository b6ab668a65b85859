//! Manifest discovery and loading.

use crate::config::schema::ProductManifest;
use crate::config::validator::validate;
use crate::error::{Result, StagehandError};
use std::fs;
use std::path::{Path, PathBuf};

/// Manifest location relative to the project root.
pub const MANIFEST_FILE: &str = ".stagehand/product.yml";

/// Default manifest path for a project root.
pub fn manifest_path(project_root: &Path) -> PathBuf {
    project_root.join(MANIFEST_FILE)
}

/// Find the project root by walking up from `start`.
///
/// Looks for:
/// 1. `.stagehand` directory (primary indicator)
/// 2. `.git` directory (fallback)
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        if current.join(".stagehand").is_dir() {
            return Some(current);
        }

        if current.join(".git").exists() {
            return Some(current);
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Load and parse a manifest file without validating it.
///
/// # Errors
///
/// Returns `ManifestNotFound` if the file doesn't exist.
/// Returns `ParseError` if the YAML is invalid.
pub fn load_manifest_file(path: &Path) -> Result<ProductManifest> {
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            StagehandError::ManifestNotFound {
                path: path.to_path_buf(),
            }
        } else {
            StagehandError::Io(e)
        }
    })?;

    parse_manifest(&content, path)
}

/// Parse YAML content into a manifest.
///
/// `source_path` is only used for error reporting.
pub fn parse_manifest(content: &str, source_path: &Path) -> Result<ProductManifest> {
    serde_yaml::from_str(content).map_err(|e| StagehandError::ParseError {
        path: source_path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Load and validate the manifest for a project.
///
/// If `manifest_override` is provided it is loaded instead of
/// `.stagehand/product.yml`.
pub fn load_manifest(
    project_root: &Path,
    manifest_override: Option<&Path>,
) -> Result<ProductManifest> {
    let path = manifest_override
        .map(Path::to_path_buf)
        .unwrap_or_else(|| manifest_path(project_root));
    let manifest = load_manifest_file(&path)?;
    validate(&manifest)?;
    Ok(manifest)
}
