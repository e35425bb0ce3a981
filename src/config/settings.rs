//! TOML-based configuration for strata.
//!
//! Example configuration:
//! ```toml
//! [layout]
//! pretty_threshold = 100
//!
//! [layout.geometry]
//! column_width = 120
//! row_height = 24
//!
//! [redaction]
//! padding_char = " "
//! redaction_char = "*"
//!
//! [date]
//! time_zone = "UTC"
//!
//! [logging]
//! filter = "strata=info"
//! json = false
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::layout::{Geometry, LayoutEngine, DEFAULT_PRETTY_THRESHOLD};
use crate::types::parse_time_zone;

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub layout: LayoutSettings,
    pub redaction: RedactionSettings,
    pub date: DateSettings,
    pub logging: LoggingSettings,
}

/// Layout engine configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LayoutSettings {
    /// Level size above which the layout falls back to declared counts.
    pub pretty_threshold: usize,

    pub geometry: Geometry,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            pretty_threshold: DEFAULT_PRETTY_THRESHOLD,
            geometry: Geometry::default(),
        }
    }
}

impl LayoutSettings {
    pub fn engine(&self) -> LayoutEngine {
        LayoutEngine::new(self.pretty_threshold, self.geometry)
    }
}

/// Defaults for new redaction specifications.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RedactionSettings {
    pub padding_char: char,
    pub redaction_char: char,
}

impl Default for RedactionSettings {
    fn default() -> Self {
        Self {
            padding_char: ' ',
            redaction_char: '*',
        }
    }
}

/// Defaults for new date specifications.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DateSettings {
    /// Fixed offset such as `UTC` or `+02:00`.
    pub time_zone: String,
}

impl Default for DateSettings {
    fn default() -> Self {
        Self {
            time_zone: "UTC".to_string(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `tracing_subscriber::EnvFilter` directive, overridden by `STRATA_LOG`.
    pub filter: String,

    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "strata=info".to_string(),
            json: false,
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `STRATA_CONFIG`
    /// 2. `./strata.toml`
    /// 3. `~/.config/strata/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("STRATA_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("strata.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("strata").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }

    /// Check values serde cannot.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.layout.pretty_threshold == 0 {
            return Err(SettingsError::InvalidConfig(
                "layout.pretty_threshold must be positive".to_string(),
            ));
        }
        let geometry = &self.layout.geometry;
        if geometry.column_width <= 0 || geometry.row_height <= 0 {
            return Err(SettingsError::InvalidConfig(
                "layout.geometry sizes must be positive".to_string(),
            ));
        }
        parse_time_zone(&self.date.time_zone)
            .map_err(|e| SettingsError::InvalidConfig(format!("date.time_zone: {}", e)))?;
        Ok(())
    }
}
