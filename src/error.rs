//! Error types for Stagehand operations.
//!
//! This module defines [`StagehandError`], the primary error type used
//! throughout the application, and a [`Result`] type alias for convenience.
//!
//! # Error Handling Strategy
//!
//! - Step bodies never surface a `StagehandError` to the orchestrator; their
//!   failures are recorded as [`StepFailure`](crate::steps::StepFailure) on the
//!   step itself
//! - Use `StagehandError` for errors in the tool around the core (manifest,
//!   settings, registry, CLI)
//! - Use `anyhow::Error` (via `StagehandError::Other`) for unexpected errors

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for Stagehand operations.
#[derive(Debug, Error)]
pub enum StagehandError {
    /// Product manifest not found at expected location.
    #[error("Manifest not found: {path}")]
    ManifestNotFound { path: PathBuf },

    /// Failed to parse a manifest or settings file.
    #[error("Failed to parse {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    /// Manifest is structurally valid YAML but semantically wrong.
    #[error("Invalid manifest: {message}")]
    ManifestValidationError { message: String },

    /// Workflow name could not be mapped to a workflow type.
    #[error("Unknown workflow type: {name}")]
    UnknownWorkflow { name: String },

    /// No controller is registered for a product kind.
    #[error("Unknown product kind: {kind}")]
    UnknownProductKind { kind: String },

    /// Settings keyword is not in the keyword table.
    #[error("Unknown setting: {keyword}")]
    UnknownSetting { keyword: String },

    /// Settings value was rejected by the keyword's validator.
    #[error("Invalid value for {keyword}: {message}")]
    InvalidSetting { keyword: String, message: String },

    /// Interpolation referenced a value that does not exist.
    #[error("Undefined variable in '{input}': {name}")]
    UndefinedVariable { input: String, name: String },

    /// A run was requested while the orchestrator's worker still owns the plan.
    #[error("A {kind} run is already in progress")]
    RunInProgress { kind: String },

    /// Retry was requested before any run happened.
    #[error("Nothing to retry: no run has been started")]
    NothingToRetry,

    /// Shell command could not be spawned.
    #[error("Command failed with exit code {code:?}: {command}")]
    CommandFailed { command: String, code: Option<i32> },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for Stagehand operations.
pub type Result<T> = std::result::Result<T, StagehandError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_not_found_displays_path() {
        let err = StagehandError::ManifestNotFound {
            path: PathBuf::from("/foo/product.yml"),
        };
        assert!(err.to_string().contains("/foo/product.yml"));
    }

    #[test]
    fn parse_error_displays_path_and_message() {
        let err = StagehandError::ParseError {
            path: PathBuf::from("/product.yml"),
            message: "invalid syntax".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("/product.yml"));
        assert!(msg.contains("invalid syntax"));
    }

    #[test]
    fn invalid_setting_displays_keyword_and_message() {
        let err = StagehandError::InvalidSetting {
            keyword: "PORT".into(),
            message: "must be between 1 and 65535".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("PORT"));
        assert!(msg.contains("65535"));
    }

    #[test]
    fn run_in_progress_displays_kind() {
        let err = StagehandError::RunInProgress {
            kind: "configure".into(),
        };
        assert_eq!(err.to_string(), "A configure run is already in progress");
    }

    #[test]
    fn io_error_converts_from_std() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err: StagehandError = io_err.into();
        assert!(matches!(err, StagehandError::Io(_)));
    }

    #[test]
    fn anyhow_error_converts() {
        let err: StagehandError = anyhow::anyhow!("boom").into();
        assert_eq!(err.to_string(), "boom");
    }
}
