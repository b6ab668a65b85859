//! Manifest validation rules.
//!
//! - Step names must be unique within each workflow section
//! - Remove steps must have exactly one of `command` or `actions`
//! - Workflow names must be known workflow types

use std::collections::HashSet;

use crate::config::schema::ProductManifest;
use crate::error::{Result, StagehandError};
use crate::steps::WorkflowMask;

/// Validation error with context.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Rule identifier
    pub rule: String,
    /// Human-readable error message
    pub message: String,
    /// Step name if error is step-specific
    pub step: Option<String>,
}

impl ValidationError {
    fn new(rule: &str, step: &str, message: String) -> Self {
        Self {
            rule: rule.to_string(),
            message,
            step: Some(step.to_string()),
        }
    }
}

/// Validate a manifest and return all errors.
///
/// Collects every problem rather than stopping at the first one.
pub fn validate_manifest(manifest: &ProductManifest) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if manifest.product.trim().is_empty() {
        errors.push(ValidationError {
            rule: "missing-product".to_string(),
            message: "'product' must not be empty".to_string(),
            step: None,
        });
    }

    errors.extend(duplicate_names(
        "configure",
        manifest.configure.iter().map(|s| s.name.as_str()),
    ));
    errors.extend(duplicate_names(
        "remove",
        manifest.remove.iter().map(|s| s.name.as_str()),
    ));

    for step in &manifest.configure {
        if step.command.trim().is_empty() {
            errors.push(ValidationError::new(
                "missing-command",
                &step.name,
                format!("Configure step '{}' has an empty command", step.name),
            ));
        }
        for workflow in &step.workflows {
            if workflow.parse::<WorkflowMask>().is_err() {
                errors.push(ValidationError::new(
                    "unknown-workflow",
                    &step.name,
                    format!(
                        "Configure step '{}' names unknown workflow '{}'",
                        step.name, workflow
                    ),
                ));
            }
        }
    }

    for step in &manifest.remove {
        match (&step.command, step.is_group()) {
            (Some(_), true) => errors.push(ValidationError::new(
                "command-and-actions",
                &step.name,
                format!(
                    "Remove step '{}' must have either 'command' or 'actions', not both",
                    step.name
                ),
            )),
            (None, false) => errors.push(ValidationError::new(
                "missing-command",
                &step.name,
                format!(
                    "Remove step '{}' must have either 'command' or 'actions'",
                    step.name
                ),
            )),
            _ => {}
        }
    }

    errors
}

fn duplicate_names<'a>(
    section: &str,
    names: impl Iterator<Item = &'a str>,
) -> Vec<ValidationError> {
    let mut seen = HashSet::new();
    names
        .filter(|name| !seen.insert(*name))
        .map(|name| {
            ValidationError::new(
                "duplicate-step",
                name,
                format!("Step '{}' appears more than once in '{}'", name, section),
            )
        })
        .collect()
}

/// Validate a manifest, failing with all messages joined.
pub fn validate(manifest: &ProductManifest) -> Result<()> {
    let errors = validate_manifest(manifest);
    if errors.is_empty() {
        return Ok(());
    }
    Err(StagehandError::ManifestValidationError {
        message: errors
            .iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join("; "),
    })
}
