use crate::EditorError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONFIG_NAME: &str = "daybook.config.json";

/// Autosave timing, in milliseconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutosaveConfig {
    /// Quiet period after the last edit before a save is issued
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// How long the success status stays visible
    #[serde(default = "default_success_display_ms")]
    pub success_display_ms: u64,

    /// How long the error status stays visible
    #[serde(default = "default_error_display_ms")]
    pub error_display_ms: u64,
}

fn default_debounce_ms() -> u64 {
    2000
}

fn default_success_display_ms() -> u64 {
    2000
}

fn default_error_display_ms() -> u64 {
    3000
}

impl AutosaveConfig {
    /// Load config from a directory, falling back to defaults when the file
    /// does not exist
    pub fn load(dir: &Path) -> Result<Self, EditorError> {
        let config_path = dir.join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            serde_json::from_str(&content)
                .map_err(|e| EditorError::Config(format!("{}: {}", config_path.display(), e)))
        } else {
            Ok(AutosaveConfig::default())
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn success_display(&self) -> Duration {
        Duration::from_millis(self.success_display_ms)
    }

    pub fn error_display(&self) -> Duration {
        Duration::from_millis(self.error_display_ms)
    }
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            success_display_ms: default_success_display_ms(),
            error_display_ms: default_error_display_ms(),
        }
    }
}
