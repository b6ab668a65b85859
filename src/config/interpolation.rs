//! `${name}` interpolation of settings into manifest strings.
//!
//! # Syntax
//!
//! - `${variable_name}` - replaced with variable value
//! - `$${escaped}` - produces literal `${escaped}` in output
//!
//! # Example
//!
//! ```
//! use stagehand::config::{resolve_string, InterpolationContext};
//! use stagehand::settings::InstallSettings;
//!
//! let ctx = InterpolationContext::new().with_settings(&InstallSettings::default());
//! let command = resolve_string("systemctl start ${service_name}", &ctx).unwrap();
//! assert_eq!(command, "systemctl start stagehand");
//! ```

use crate::error::{Result, StagehandError};
use crate::settings::InstallSettings;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// A segment of an interpolated string.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// Literal text
    Literal(String),
    /// Variable reference: ${name}
    Variable(String),
}

/// Parse a string containing `${var}` interpolations into segments.
pub fn parse_interpolation(input: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut chars = input.chars().peekable();
    let mut current_literal = String::new();

    while let Some(c) = chars.next() {
        if c != '$' {
            current_literal.push(c);
            continue;
        }
        match chars.peek() {
            Some('$') => {
                chars.next();
                if chars.peek() == Some(&'{') {
                    // $${...} -> literal ${...}
                    chars.next();
                    current_literal.push_str("${");
                    for c in chars.by_ref() {
                        current_literal.push(c);
                        if c == '}' {
                            break;
                        }
                    }
                } else {
                    current_literal.push('$');
                }
            }
            Some('{') => {
                chars.next();
                if !current_literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut current_literal)));
                }

                let mut var_name = String::new();
                for c in chars.by_ref() {
                    if c == '}' {
                        break;
                    }
                    var_name.push(c);
                }
                segments.push(Segment::Variable(var_name.trim().to_string()));
            }
            _ => current_literal.push(c),
        }
    }

    if !current_literal.is_empty() {
        segments.push(Segment::Literal(current_literal));
    }

    segments
}

/// Unique variable names referenced by a string.
pub fn extract_variables(input: &str) -> HashSet<String> {
    parse_interpolation(input)
        .into_iter()
        .filter_map(|seg| match seg {
            Segment::Variable(name) => Some(name),
            _ => None,
        })
        .collect()
}

/// Check if a string contains any interpolation.
pub fn has_interpolation(input: &str) -> bool {
    parse_interpolation(input)
        .iter()
        .any(|seg| matches!(seg, Segment::Variable(_)))
}

/// Context for variable resolution.
///
/// Variables are resolved in priority order:
/// 1. Settings values (highest priority)
/// 2. Environment variables
/// 3. Built-in variables (lowest priority)
#[derive(Debug, Default, Clone)]
pub struct InterpolationContext {
    /// Settings keyed by lower-case name
    pub settings: HashMap<String, String>,

    /// Environment variables
    pub env: HashMap<String, String>,

    /// Built-in variables (product, project_root, stagehand_version)
    pub builtins: HashMap<String, String>,
}

impl InterpolationContext {
    /// Create a new context with built-in variables.
    pub fn new() -> Self {
        let mut builtins = HashMap::new();
        builtins.insert(
            "stagehand_version".to_string(),
            env!("CARGO_PKG_VERSION").to_string(),
        );

        Self {
            builtins,
            ..Default::default()
        }
    }

    /// Add product information to builtins.
    pub fn with_product(mut self, product: &str, root: &Path) -> Self {
        self.builtins
            .insert("product".to_string(), product.to_string());
        self.builtins
            .insert("project_root".to_string(), root.display().to_string());
        self
    }

    /// Replace the settings layer.
    pub fn with_settings(mut self, settings: &InstallSettings) -> Self {
        self.settings = settings.to_variables().into_iter().collect();
        self
    }

    /// Add environment variables from a HashMap.
    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }

    /// Resolve a variable name to its value.
    pub fn resolve(&self, name: &str) -> Option<String> {
        self.settings
            .get(name)
            .or_else(|| self.env.get(name))
            .or_else(|| self.builtins.get(name))
            .cloned()
    }
}

/// Resolve all variables in an interpolated string.
///
/// # Errors
///
/// Returns `UndefinedVariable` for the first name not found in the context.
pub fn resolve_string(input: &str, context: &InterpolationContext) -> Result<String> {
    let mut result = String::new();

    for segment in parse_interpolation(input) {
        match segment {
            Segment::Literal(text) => result.push_str(&text),
            Segment::Variable(name) => {
                let value =
                    context
                        .resolve(&name)
                        .ok_or_else(|| StagehandError::UndefinedVariable {
                            input: input.to_string(),
                            name: name.clone(),
                        })?;
                result.push_str(&value);
            }
        }
    }

    Ok(result)
}

/// Resolve a string, replacing missing variables with `default`.
pub fn resolve_string_with_default(
    input: &str,
    context: &InterpolationContext,
    default: &str,
) -> String {
    parse_interpolation(input)
        .into_iter()
        .map(|segment| match segment {
            Segment::Literal(text) => text,
            Segment::Variable(name) => context
                .resolve(&name)
                .unwrap_or_else(|| default.to_string()),
        })
        .collect()
}
