//! Keyword table for `KEYWORD=value` settings overrides.
//!
//! Each entry binds a public keyword to accessors on [`InstallSettings`].
//! `validate` runs before `set`, so setters may assume well-formed input.

use super::model::InstallSettings;
use crate::error::{Result, StagehandError};

/// One bindable setting.
pub struct Keyword {
    pub keyword: &'static str,
    pub description: &'static str,
    pub get: fn(&InstallSettings) -> String,
    pub set: fn(&mut InstallSettings, &str),
    pub validate: fn(&str) -> std::result::Result<(), String>,
}

impl std::fmt::Debug for Keyword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keyword")
            .field("keyword", &self.keyword)
            .finish()
    }
}

/// All settings keywords, in display order.
pub static KEYWORDS: &[Keyword] = &[
    Keyword {
        keyword: "INSTALL_DIR",
        description: "Directory the product is installed into",
        get: |s| s.install_dir.clone(),
        set: |s, v| s.install_dir = v.to_string(),
        validate: non_empty,
    },
    Keyword {
        keyword: "DATA_DIR",
        description: "Directory the product stores data in",
        get: |s| s.data_dir.clone(),
        set: |s, v| s.data_dir = v.to_string(),
        validate: non_empty,
    },
    Keyword {
        keyword: "SERVICE_NAME",
        description: "Name of the registered service",
        get: |s| s.service_name.clone(),
        set: |s, v| s.service_name = v.to_string(),
        validate: service_name,
    },
    Keyword {
        keyword: "PORT",
        description: "Port the service listens on",
        get: |s| s.port.to_string(),
        set: |s, v| {
            if let Ok(port) = v.parse() {
                s.port = port;
            }
        },
        validate: port,
    },
    Keyword {
        keyword: "START_SERVICE",
        description: "Start the service after configuration (true/false)",
        get: |s| s.start_service.to_string(),
        set: |s, v| {
            if let Some(flag) = parse_bool(v) {
                s.start_service = flag;
            }
        },
        validate: |v| {
            parse_bool(v)
                .map(|_| ())
                .ok_or_else(|| "expected true or false".to_string())
        },
    },
];

fn non_empty(value: &str) -> std::result::Result<(), String> {
    if value.trim().is_empty() {
        Err("value must not be empty".to_string())
    } else {
        Ok(())
    }
}

fn service_name(value: &str) -> std::result::Result<(), String> {
    non_empty(value)?;
    if value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        Ok(())
    } else {
        Err("only letters, digits, '-' and '_' are allowed".to_string())
    }
}

fn port(value: &str) -> std::result::Result<(), String> {
    match value.parse::<u16>() {
        Ok(0) => Err("port must be between 1 and 65535".to_string()),
        Ok(_) => Ok(()),
        Err(_) => Err(format!("'{}' is not a port number", value)),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Some(true),
        "false" | "no" | "0" | "off" => Some(false),
        _ => None,
    }
}

/// Find a keyword, ignoring case.
pub fn lookup(keyword: &str) -> Option<&'static Keyword> {
    KEYWORDS
        .iter()
        .find(|k| k.keyword.eq_ignore_ascii_case(keyword))
}

/// Split `KEYWORD=value` into its parts.
pub fn parse_assignment(input: &str) -> Result<(&str, &str)> {
    let (keyword, value) = input
        .split_once('=')
        .ok_or_else(|| StagehandError::InvalidSetting {
            keyword: input.to_string(),
            message: "expected KEYWORD=value".to_string(),
        })?;
    Ok((keyword.trim(), value.trim()))
}

/// Validate and apply a single keyword assignment.
pub fn set(settings: &mut InstallSettings, keyword: &str, value: &str) -> Result<()> {
    let entry = lookup(keyword).ok_or_else(|| StagehandError::UnknownSetting {
        keyword: keyword.to_string(),
    })?;
    (entry.validate)(value).map_err(|message| StagehandError::InvalidSetting {
        keyword: entry.keyword.to_string(),
        message,
    })?;
    (entry.set)(settings, value);
    Ok(())
}

/// Apply `KEYWORD=value` assignments in order. Stops at the first bad one.
pub fn apply<S: AsRef<str>>(settings: &mut InstallSettings, assignments: &[S]) -> Result<()> {
    for assignment in assignments {
        let (keyword, value) = parse_assignment(assignment.as_ref())?;
        set(settings, keyword, value)?;
    }
    Ok(())
}
