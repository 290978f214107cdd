//! Configuration loading and store path resolution
//!
//! Settings come from four tiers, highest priority first:
//! 1. Command-line argument
//! 2. Environment variable (`SHOTLOG_STORE`, `SHOTLOG_CONFIG`)
//! 3. TOML config file
//! 4. OS-dependent compiled default
//!
//! A missing or unreadable TOML file never stops startup: a warning is logged
//! and compiled defaults are used.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable overriding the snapshot store path
pub const STORE_ENV_VAR: &str = "SHOTLOG_STORE";

/// Environment variable overriding the TOML config file location
pub const CONFIG_ENV_VAR: &str = "SHOTLOG_CONFIG";

/// How a batch of shots is written to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchMode {
    /// All rows commit together or none do
    #[default]
    Atomic,
    /// Each row is attempted on its own; failing rows are skipped and counted
    BestEffort,
}

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Snapshot file the store is loaded from and saved to
    #[serde(default)]
    pub store_path: Option<PathBuf>,

    /// Remote durable-save endpoint; when set, snapshots are POSTed there
    /// instead of being written to `store_path`
    #[serde(default)]
    pub save_endpoint: Option<String>,

    /// Remote structured log endpoint
    #[serde(default)]
    pub log_endpoint: Option<String>,

    #[serde(default)]
    pub batch_mode: BatchMode,

    /// Timeout for durable-save and log requests
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            store_path: None,
            save_endpoint: None,
            log_endpoint: None,
            batch_mode: BatchMode::default(),
            request_timeout_ms: default_request_timeout_ms(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
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

fn default_log_level() -> String {
    "info".to_string()
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

/// Compiled fallback values for the current platform
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub store_path: PathBuf,
    pub log_level: String,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        Self {
            store_path: default_data_folder().join("shotlog.db"),
            log_level: default_log_level(),
        }
    }
}

/// Get OS-dependent default data folder
fn default_data_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        dirs::data_local_dir()
            .map(|d| d.join("shotlog"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/shotlog"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("shotlog"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/shotlog"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("shotlog"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\shotlog"))
    } else {
        PathBuf::from("./shotlog_data")
    }
}

/// Locate the TOML config file
///
/// Returns `None` when no candidate exists; that is not an error.
pub fn config_file_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    let user_config = dirs::config_dir().map(|d| d.join("shotlog").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/shotlog/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Load the config file if one can be found, falling back to defaults
pub fn load_or_default(cli_arg: Option<&Path>) -> TomlConfig {
    let Some(path) = config_file_path(cli_arg) else {
        debug!("No config file found, using compiled defaults");
        return TomlConfig::default();
    };

    match load_toml_config(&path) {
        Ok(config) => {
            debug!("Loaded config from {}", path.display());
            config
        }
        Err(e) => {
            warn!("{}; using compiled defaults", e);
            TomlConfig::default()
        }
    }
}

/// Resolve the snapshot store path
pub fn resolve_store_path(cli_arg: Option<&Path>, config: &TomlConfig) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(STORE_ENV_VAR) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Some(path) = &config.store_path {
        return path.clone();
    }

    // Priority 4: OS-dependent compiled default
    CompiledDefaults::for_current_platform().store_path
}

/// Write a TOML config atomically (temp file + rename)
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let temp_path = path.with_extension("toml.tmp");
    std::fs::write(&temp_path, content)?;
    std::fs::rename(&temp_path, path)?;

    Ok(())
}
