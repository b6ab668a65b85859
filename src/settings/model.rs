//! Installer settings and change detection.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Values a product's steps are configured with.
///
/// Loaded from the manifest defaults, overlaid with the saved settings file,
/// then with `KEYWORD=value` overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallSettings {
    /// Where the product is installed.
    pub install_dir: String,

    /// Where the product keeps its data.
    pub data_dir: String,

    /// Name of the service the product registers.
    pub service_name: String,

    /// Port the service listens on.
    pub port: u16,

    /// Start the service at the end of configuration.
    pub start_service: bool,
}

impl Default for InstallSettings {
    fn default() -> Self {
        Self {
            install_dir: "/opt/stagehand".to_string(),
            data_dir: "/var/lib/stagehand".to_string(),
            service_name: "stagehand".to_string(),
            port: 8080,
            start_service: true,
        }
    }
}

impl InstallSettings {
    /// Capture the current values for later comparison.
    pub fn snapshot(&self) -> SettingsSnapshot {
        SettingsSnapshot(self.clone())
    }

    /// True if any value differs from the snapshot.
    pub fn changed_since(&self, snapshot: &SettingsSnapshot) -> bool {
        *self != snapshot.0
    }

    /// Keywords whose values differ from the snapshot, in table order.
    pub fn changed_keys(&self, snapshot: &SettingsSnapshot) -> Vec<&'static str> {
        super::keywords::KEYWORDS
            .iter()
            .filter(|k| (k.get)(self) != (k.get)(&snapshot.0))
            .map(|k| k.keyword)
            .collect()
    }

    /// Values keyed by lower-case field name, for `${name}` interpolation.
    pub fn to_variables(&self) -> BTreeMap<String, String> {
        super::keywords::KEYWORDS
            .iter()
            .map(|k| (k.keyword.to_ascii_lowercase(), (k.get)(self)))
            .collect()
    }
}

/// Frozen copy of settings taken before a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsSnapshot(InstallSettings);

impl SettingsSnapshot {
    pub fn settings(&self) -> &InstallSettings {
        &self.0
    }
}
