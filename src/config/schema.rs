//! Product manifest schema.
//!
//! These structs map to `.stagehand/product.yml`.

use serde::{Deserialize, Serialize};

use crate::settings::InstallSettings;

/// Root of a product manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductManifest {
    /// Product name, shown in output and available as `${product}`.
    pub product: String,

    /// Controller kind used to build step plans.
    #[serde(default = "default_kind")]
    pub kind: String,

    /// Default settings; the saved settings file overrides them.
    #[serde(default)]
    pub settings: InstallSettings,

    /// Configure steps, in execution order.
    #[serde(default)]
    pub configure: Vec<ConfigureStepConfig>,

    /// Remove steps, in execution order.
    #[serde(default)]
    pub remove: Vec<RemoveStepConfig>,
}

fn default_kind() -> String {
    "shell".to_string()
}

fn default_true() -> bool {
    true
}

fn is_true(value: &bool) -> bool {
    *value
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// A configure step definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigureStepConfig {
    /// Stable identifier.
    pub name: String,

    /// Display text; supports `${setting}` interpolation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Shell command; supports `${setting}` interpolation.
    pub command: String,

    /// Estimate used for the overrun budget. Zero or negative uses the default.
    #[serde(default)]
    pub estimated_seconds: i64,

    /// A failed required step stops the configure run.
    #[serde(default, skip_serializing_if = "is_false")]
    pub required: bool,

    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub enabled: bool,

    /// Workflow types this step runs for. Empty means all.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub workflows: Vec<String>,
}

/// A remove step definition: either a single command or a group of actions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoveStepConfig {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Single command. Mutually exclusive with `actions`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    /// Grouped sub-steps. Mutually exclusive with `command`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<RemoveActionConfig>,

    #[serde(default)]
    pub estimated_seconds: i64,

    /// A failed required step fails the removal; it never stops it.
    #[serde(default, skip_serializing_if = "is_false")]
    pub required: bool,

    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub enabled: bool,
}

impl RemoveStepConfig {
    pub fn is_group(&self) -> bool {
        !self.actions.is_empty()
    }
}

/// One action inside a grouped remove step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoveActionConfig {
    pub description: String,

    pub command: String,

    /// Only required actions can fail the removal.
    #[serde(default, skip_serializing_if = "is_false")]
    pub required: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"
product: demo
settings:
  port: 9000
configure:
  - name: write-config
    description: Write config to ${install_dir}
    command: echo configured
    estimated_seconds: 5
    required: true
    workflows: [install, upgrade]
  - name: migrate
    command: echo migrate
    enabled: false
remove:
  - name: stop
    command: echo stop
    required: true
  - name: files
    description: Remove files
    actions:
      - description: Delete binaries
        command: echo rm
        required: true
      - description: Delete logs
        command: echo logs
"#;

    #[test]
    fn parses_full_manifest() {
        let manifest: ProductManifest = serde_yaml::from_str(MANIFEST).unwrap();

        assert_eq!(manifest.product, "demo");
        assert_eq!(manifest.kind, "shell");
        assert_eq!(manifest.settings.port, 9000);
        assert_eq!(manifest.configure.len(), 2);
        assert_eq!(manifest.configure[0].workflows, vec!["install", "upgrade"]);
        assert!(manifest.configure[0].required);
        assert!(!manifest.configure[1].enabled);
        assert!(manifest.configure[1].description.is_none());
    }

    #[test]
    fn remove_groups_and_commands() {
        let manifest: ProductManifest = serde_yaml::from_str(MANIFEST).unwrap();

        assert!(!manifest.remove[0].is_group());
        assert!(manifest.remove[1].is_group());
        assert!(manifest.remove[1].actions[0].required);
        assert!(!manifest.remove[1].actions[1].required);
    }

    #[test]
    fn minimal_manifest_uses_defaults() {
        let manifest: ProductManifest = serde_yaml::from_str("product: bare").unwrap();

        assert_eq!(manifest.kind, "shell");
        assert!(manifest.configure.is_empty());
        assert!(manifest.remove.is_empty());
        assert_eq!(manifest.settings, InstallSettings::default());
    }

    #[test]
    fn serialization_skips_defaults() {
        let step = ConfigureStepConfig {
            name: "a".to_string(),
            description: None,
            command: "true".to_string(),
            estimated_seconds: 0,
            required: false,
            enabled: true,
            workflows: Vec::new(),
        };
        let yaml = serde_yaml::to_string(&step).unwrap();
        assert!(!yaml.contains("required"));
        assert!(!yaml.contains("enabled"));
        assert!(!yaml.contains("workflows"));
    }
}
