use crate::AutosaveConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// User-visible save indicator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SaveStatus {
    #[default]
    Idle,
    Saving,
    Success,
    Error,
}

impl SaveStatus {
    /// How long the status stays up before reverting to `Idle`.
    /// `None` means it stays until the next transition.
    pub fn display_duration(&self, config: &AutosaveConfig) -> Option<Duration> {
        match self {
            SaveStatus::Idle | SaveStatus::Saving => None,
            SaveStatus::Success => Some(config.success_display()),
            SaveStatus::Error => Some(config.error_display()),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SaveStatus::Idle => "idle",
            SaveStatus::Saving => "saving",
            SaveStatus::Success => "success",
            SaveStatus::Error => "error",
        }
    }
}

impl fmt::Display for SaveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
