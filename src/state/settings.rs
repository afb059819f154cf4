// SPDX-License-Identifier: MPL-2.0

use crate::archive::{MediaFailurePolicy, TimestampOrder};
use crate::config::{APP_ID, DEFAULT_SERVICE, DEFAULT_USER_AGENT};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Persistent settings, overridden per run by command-line flags.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Base URL of the messaging API
    pub service_url: String,
    pub user_agent: String,
    pub media_failures: MediaFailurePolicy,
    pub timestamp_order: TimestampOrder,
    /// No timeout when absent
    pub request_timeout_secs: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            service_url: DEFAULT_SERVICE.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            media_failures: MediaFailurePolicy::default(),
            timestamp_order: TimestampOrder::default(),
            request_timeout_secs: None,
        }
    }
}

impl Settings {
    /// Get the settings file path (~/.config/io.github.sethcottle.DmVault/settings.json)
    fn settings_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut p| {
            p.push(APP_ID);
            p.push("settings.json");
            p
        })
    }

    /// Load settings from disk, or return defaults if not found
    pub fn load() -> Self {
        match Self::settings_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}
