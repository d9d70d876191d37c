//! Bootstrap configuration loading and database path resolution
//!
//! Settings sources, highest priority first:
//! 1. Command-line arguments
//! 2. Environment variables (`SKUM_DATABASE`)
//! 3. TOML configuration file
//! 4. Compiled defaults
//!
//! A missing TOML file is not an error: the tools run on defaults. A TOML
//! file that exists but does not parse is. Loading does not log; callers
//! report the returned [`ConfigSource`] once their subscriber is installed.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming the database file
pub const DATABASE_ENV_VAR: &str = "SKUM_DATABASE";

/// Database file used when no other source names one
pub const DEFAULT_DATABASE_FILE: &str = "skum.db";

/// Where [`load_config`] found its settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Path given on the command line or via `SKUM_CONFIG`
    Explicit(PathBuf),
    /// First existing file among the platform locations
    Discovered(PathBuf),
    /// No file found; compiled defaults
    Defaults,
}

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct TomlConfig {
    /// Path to the SQLite database holding the target table
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Target table and the columns the dedup pass works on
    #[serde(default)]
    pub table: TableConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Target table layout
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct TableConfig {
    #[serde(default = "default_table_name")]
    pub name: String,

    /// Business key column (rows sharing it are duplicates)
    #[serde(default = "default_key_column")]
    pub key_column: String,

    /// Column overwritten with the canonical value
    #[serde(default = "default_payload_column")]
    pub payload_column: String,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            name: default_table_name(),
            key_column: default_key_column(),
            payload_column: default_payload_column(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_table_name() -> String {
    "Sheet1$".to_string()
}

fn default_key_column() -> String {
    "PluCode".to_string()
}

fn default_payload_column() -> String {
    "SkuCode".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Load configuration from an explicit path, or from the platform location
///
/// An explicit path that does not exist is an error. A missing file at the
/// platform location gives the compiled defaults and [`ConfigSource::Defaults`].
pub fn load_config(explicit: Option<&Path>) -> Result<(TomlConfig, ConfigSource)> {
    if let Some(path) = explicit {
        if !path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        let config = load_toml_config(path)?;
        return Ok((config, ConfigSource::Explicit(path.to_path_buf())));
    }

    match default_config_path() {
        Some(path) => {
            let config = load_toml_config(&path)?;
            Ok((config, ConfigSource::Discovered(path)))
        }
        None => Ok((TomlConfig::default(), ConfigSource::Defaults)),
    }
}

/// First existing config file among the platform locations
///
/// Linux checks `~/.config/skum/config.toml`, then `/etc/skum/config.toml`;
/// other platforms only the user config directory.
pub fn default_config_path() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("skum").join("config.toml"));
    if let Some(path) = user_config.filter(|p| p.exists()) {
        return Some(path);
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/skum/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Resolve the database path: CLI, then `SKUM_DATABASE`, then TOML, then default
pub fn resolve_database_path(cli_arg: Option<&Path>, config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(DATABASE_ENV_VAR) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &config.database_path {
        return path.clone();
    }

    PathBuf::from(DEFAULT_DATABASE_FILE)
}
