//! Installer settings.
//!
//! - [`InstallSettings`] - The values steps are configured with
//! - [`SettingsSnapshot`] - Pre-run copy used for change detection
//! - [`keywords`] - `KEYWORD=value` binding table
//! - [`SettingsStore`] - `.stagehand/settings.yml` persistence

pub mod keywords;
pub mod model;
pub mod store;

pub use keywords::{Keyword, KEYWORDS};
pub use model::{InstallSettings, SettingsSnapshot};
pub use store::{SettingsStore, SETTINGS_FILE};
