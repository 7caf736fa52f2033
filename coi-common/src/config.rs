//! Configuration loading and data folder resolution
//!
//! Bootstrap configuration comes from a single TOML file. Every key has a
//! built-in default, so a missing file only produces a warning.
//!
//! # Data Folder Priority
//!
//! 1. Command-line argument (`--data-folder`)
//! 2. Environment variable (`COI_DATA_FOLDER`)
//! 3. TOML configuration file (`data_folder`)
//! 4. OS-dependent compiled default

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the data folder
pub const DATA_FOLDER_ENV: &str = "COI_DATA_FOLDER";

/// Application directory name under the platform config/data dirs
const APP_DIR: &str = "coi-dblp";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TomlConfig {
    /// Folder holding the persisted corpus snapshot
    #[serde(default)]
    pub data_folder: Option<PathBuf>,

    /// Publications older than this year are dropped while indexing.
    /// `None` keeps every year.
    #[serde(default = "default_min_year")]
    pub min_year: Option<i32>,

    /// What to do with records whose year is not a number
    #[serde(default)]
    pub year_policy: YearPolicy,

    /// Regex over publication keys shown next to candidates during
    /// manual disambiguation
    #[serde(default = "default_venue_filter")]
    pub venue_filter: String,

    /// dblp web service settings
    #[serde(default)]
    pub dblp: DblpConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            data_folder: None,
            min_year: default_min_year(),
            year_policy: YearPolicy::default(),
            venue_filter: default_venue_filter(),
            dblp: DblpConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Handling of records whose `<year>` is present but not numeric
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum YearPolicy {
    /// Treat the year as unknown and keep the record
    #[default]
    Include,
    /// Drop the record
    Skip,
}

/// dblp web service settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DblpConfig {
    /// Base URL of the dblp web site
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum number of hits requested from the author search
    #[serde(default = "default_search_results")]
    pub search_results: u32,

    /// Request rate limit
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,
}

impl Default for DblpConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            search_results: default_search_results(),
            requests_per_second: default_requests_per_second(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_min_year() -> Option<i32> {
    Some(2015)
}

fn default_venue_filter() -> String {
    "conf/(sigir|ecir)".to_string()
}

fn default_base_url() -> String {
    "https://dblp.org".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_search_results() -> u32 {
    30
}

fn default_requests_per_second() -> u32 {
    1
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Default configuration file location (`~/.config/coi-dblp/config.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml"))
}

/// Where the active configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Parsed from this file
    File(PathBuf),
    /// Built-in defaults; carries the default path that was tried, if any
    Defaults(Option<PathBuf>),
}

/// Configuration plus its origin
///
/// Loading happens before the subscriber exists, so the origin is reported
/// afterwards through [`LoadedConfig::log_source`].
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: TomlConfig,
    pub source: ConfigSource,
}

impl LoadedConfig {
    pub fn log_source(&self) {
        match &self.source {
            ConfigSource::File(path) => info!("Loaded configuration from {}", path.display()),
            ConfigSource::Defaults(Some(path)) => {
                warn!("No config file at {}, using built-in defaults", path.display())
            }
            ConfigSource::Defaults(None) => {
                warn!("Could not determine config directory, using built-in defaults")
            }
        }
    }
}

/// Load TOML configuration
///
/// An explicit path must exist and parse. Without one, the default location
/// is tried and built-in defaults are used when it is absent.
pub fn load_toml_config(explicit: Option<&Path>) -> Result<LoadedConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match default_config_path() {
            Some(path) if path.exists() => path,
            missing => {
                return Ok(LoadedConfig {
                    config: TomlConfig::default(),
                    source: ConfigSource::Defaults(missing),
                })
            }
        },
    };

    let content = std::fs::read_to_string(&path).map_err(|e| Error::io(&path, e))?;
    let config: TomlConfig = toml::from_str(&content).map_err(|source| Error::ConfigParse {
        path: path.clone(),
        source,
    })?;

    Ok(LoadedConfig {
        config,
        source: ConfigSource::File(path),
    })
}

/// Data folder resolution following CLI → ENV → TOML → default priority
#[derive(Debug, Clone, Default)]
pub struct DataFolderResolver {
    cli_arg: Option<PathBuf>,
    toml_value: Option<PathBuf>,
}

impl DataFolderResolver {
    pub fn new(cli_arg: Option<PathBuf>, toml_value: Option<PathBuf>) -> Self {
        Self { cli_arg, toml_value }
    }

    /// Resolve the data folder. Never fails; falls back to the OS default.
    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            info!("Data folder: {} (from command line)", path.display());
            return path.clone();
        }

        if let Ok(path) = std::env::var(DATA_FOLDER_ENV) {
            if !path.trim().is_empty() {
                info!("Data folder: {} (from {})", path, DATA_FOLDER_ENV);
                return PathBuf::from(path);
            }
        }

        if let Some(path) = &self.toml_value {
            info!("Data folder: {} (from TOML)", path.display());
            return path.clone();
        }

        let path = default_data_folder();
        info!("Data folder: {} (default)", path.display());
        path
    }

    /// Resolve and create the folder if missing
    pub fn ensure(&self) -> Result<PathBuf> {
        let path = self.resolve();
        std::fs::create_dir_all(&path).map_err(|e| Error::io(&path, e))?;
        Ok(path)
    }
}

/// OS-dependent default data folder
pub fn default_data_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("./coi_data"))
}
