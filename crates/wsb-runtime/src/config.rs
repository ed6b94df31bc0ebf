//! Session configuration and persisted user settings

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use wsb_core::{WsbError, WsbResult, DEFAULT_MIN_LIVE_STATE_YEAR};
use wsb_remote::uri::DEFAULT_URL;

/// Default settings file name, looked up in the working directory
pub const SETTINGS_FILE_NAME: &str = "WwiseStateBrowser.toml";

/// Session configuration
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// WAAPI endpoint
    pub url: String,
    /// Remotes released before this year run in restricted mode
    pub min_live_state_year: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            url: DEFAULT_URL.to_string(),
            min_live_state_year: DEFAULT_MIN_LIVE_STATE_YEAR,
        }
    }
}

/// User settings of the state browser
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Apply remote changes to the view as they arrive
    pub enable_autosync: bool,
    /// Label groups with their full path instead of the leaf name
    pub visible_stategroup_path: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            enable_autosync: true,
            visible_stategroup_path: false,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SettingsFile {
    #[serde(default)]
    settings: Settings,
}

impl Settings {
    /// Load settings from `path`, writing the defaults there if it is missing
    pub fn load_or_default(path: &Path) -> WsbResult<Self> {
        match fs::read_to_string(path) {
            Ok(text) => {
                let file: SettingsFile = toml::from_str(&text)
                    .map_err(|e| config_error(path, e.to_string()))?;
                Ok(file.settings)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                let settings = Settings::default();
                settings.save(path)?;
                tracing::info!(path = %path.display(), "default settings written");
                Ok(settings)
            }
            Err(e) => Err(config_error(path, e.to_string())),
        }
    }

    pub fn save(&self, path: &Path) -> WsbResult<()> {
        let text = toml::to_string_pretty(&SettingsFile {
            settings: self.clone(),
        })
        .map_err(|e| config_error(path, e.to_string()))?;
        fs::write(path, text).map_err(|e| config_error(path, e.to_string()))
    }
}

fn config_error(path: &Path, reason: String) -> WsbError {
    WsbError::Config(format!("{}: {}", path.display(), reason))
}
