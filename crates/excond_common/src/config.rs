//! excond configuration.
//!
//! Read from a TOML file (default `excond.toml` in the working directory,
//! overridable with `EXCOND_CONFIG`). Installed once per process with
//! [`init`] and read-only afterwards.
//!
//! ```toml
//! [report]
//! pretty = false
//! qualify_fields = true
//!
//! [log]
//! level = "info"
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::error::{ExcondError, Result};

const CONFIG_FILE: &str = "excond.toml";
const CONFIG_ENV: &str = "EXCOND_CONFIG";

static GLOBAL: OnceLock<ExcondConfig> = OnceLock::new();

/// Report serialization settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSettings {
    /// Indent the JSON array
    #[serde(default)]
    pub pretty: bool,

    /// Rewrite instance fields as `this.<field>` when method context is known
    #[serde(default = "default_qualify_fields")]
    pub qualify_fields: bool,
}

fn default_qualify_fields() -> bool {
    true
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            pretty: false,
            qualify_fields: default_qualify_fields(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExcondConfig {
    #[serde(default)]
    pub report: ReportSettings,

    #[serde(default)]
    pub log: LogConfig,
}

/// Config file location: `EXCOND_CONFIG` if set, else `./excond.toml`.
pub fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE))
}

impl ExcondConfig {
    /// Load from the default location. A missing file yields defaults; a
    /// file that exists but cannot be read or parsed is an error.
    pub fn load() -> Result<Self> {
        let path = config_path();
        if !path.exists() {
            tracing::debug!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load from an explicit path; errors are reported, not swallowed.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| ExcondError::Config(e.to_string()))
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| ExcondError::Config(e.to_string()))
    }
}

/// Install the process-wide configuration. Returns `false` if one was
/// already installed; the first one wins.
pub fn init(config: ExcondConfig) -> bool {
    GLOBAL.set(config).is_ok()
}

/// Process-wide configuration, defaults if [`init`] was never called.
pub fn get() -> &'static ExcondConfig {
    GLOBAL.get_or_init(ExcondConfig::default)
}
