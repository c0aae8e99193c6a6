use crate::paths::AppDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

const CURRENT_CONFIG_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_config_version")]
    pub config_version: u32,
    #[serde(default)]
    pub library: LibraryConfig,
    #[serde(default)]
    pub mpc: MpcConfig,
    #[serde(default)]
    pub suggest: SuggestConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_version: default_config_version(),
            library: LibraryConfig::default(),
            mpc: MpcConfig::default(),
            suggest: SuggestConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LibraryConfig {
    /// Library database; defaults to `library.db` in the data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl LibraryConfig {
    pub fn resolve_path(&self, dirs: &AppDirs) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| dirs.default_library_path())
    }
}

/// Settings for the `mpc` play statistics tracker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MpcConfig {
    #[serde(default = "default_mpc_host")]
    pub host: String,
    #[serde(default = "default_mpc_port")]
    pub port: u16,
    #[serde(default)]
    pub password: String,
    /// Prefix for the relative paths reported by the daemon.
    #[serde(default)]
    pub music_directory: String,
    /// When set, statistics are mirrored into `attribute[user]`.
    #[serde(default)]
    pub user: String,
    #[serde(default = "default_true")]
    pub rating: bool,
    #[serde(default = "default_rating_mix")]
    pub rating_mix: f64,
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_retry_interval_secs")]
    pub retry_interval_secs: u64,
}

impl Default for MpcConfig {
    fn default() -> Self {
        Self {
            host: default_mpc_host(),
            port: default_mpc_port(),
            password: String::new(),
            music_directory: String::new(),
            user: String::new(),
            rating: true,
            rating_mix: default_rating_mix(),
            retries: default_retries(),
            retry_interval_secs: default_retry_interval_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestConfig {
    /// Number of similar artists requested per seed artist.
    #[serde(default = "default_suggest_limit")]
    pub limit: u32,
    /// Candidates must score strictly above this value.
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_lastfm_base_url")]
    pub base_url: String,
}

impl Default for SuggestConfig {
    fn default() -> Self {
        Self {
            limit: default_suggest_limit(),
            threshold: default_threshold(),
            api_key: None,
            base_url: default_lastfm_base_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: LogLevel,
    #[serde(default = "default_max_log_files")]
    pub max_log_files: usize,
    #[serde(default = "default_true")]
    pub stderr: bool,
    #[serde(default)]
    pub file_name: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_log_files: default_max_log_files(),
            stderr: true,
            file_name: None,
        }
    }
}

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter_directive(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    /// Raise the level by `steps` (one per `-v` flag), saturating at trace.
    pub fn raised(self, steps: u8) -> Self {
        let order = [
            LogLevel::Error,
            LogLevel::Warn,
            LogLevel::Info,
            LogLevel::Debug,
            LogLevel::Trace,
        ];
        let current = order.iter().position(|l| *l == self).unwrap_or(2);
        let index = (current + steps as usize).min(order.len() - 1);
        order[index]
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("config validation failed: {0}")]
    Validation(ValidationError),
    #[error("failed to prepare configuration directories: {0}")]
    Directories(#[from] crate::paths::DirsError),
}

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("unsupported config_version {found}, expected {expected}")]
    UnsupportedVersion { found: u32, expected: u32 },
    #[error("{field} must be between 0 and 1, got {value}")]
    OutOfUnitRange { field: &'static str, value: f64 },
    #[error("{field} must be at least 1")]
    Zero { field: &'static str },
}

impl Config {
    pub fn load_or_default(dirs: &AppDirs) -> Result<Self, ConfigError> {
        dirs.ensure_exists()?;
        let path = Self::config_path(dirs);
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        Self::from_toml_str(&contents).map_err(|err| match err {
            ConfigError::Parse { source, .. } => ConfigError::Parse { path, source },
            other => other,
        })
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source,
        })?;
        config.validate().map_err(ConfigError::Validation)?;
        Ok(config)
    }

    pub fn config_path(dirs: &AppDirs) -> PathBuf {
        dirs.config_dir().join("config.toml")
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.config_version != CURRENT_CONFIG_VERSION {
            return Err(ValidationError::UnsupportedVersion {
                found: self.config_version,
                expected: CURRENT_CONFIG_VERSION,
            });
        }
        check_unit_range("mpc.rating_mix", self.mpc.rating_mix)?;
        check_unit_range("suggest.threshold", self.suggest.threshold)?;
        if self.mpc.retries == 0 {
            return Err(ValidationError::Zero {
                field: "mpc.retries",
            });
        }
        if self.suggest.limit == 0 {
            return Err(ValidationError::Zero {
                field: "suggest.limit",
            });
        }
        Ok(())
    }
}

fn check_unit_range(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::OutOfUnitRange { field, value })
    }
}

fn default_config_version() -> u32 {
    CURRENT_CONFIG_VERSION
}

fn default_mpc_host() -> String {
    "127.0.0.1".into()
}

fn default_mpc_port() -> u16 {
    6600
}

fn default_true() -> bool {
    true
}

fn default_rating_mix() -> f64 {
    0.75
}

fn default_retries() -> u32 {
    10
}

fn default_retry_interval_secs() -> u64 {
    5
}

fn default_suggest_limit() -> u32 {
    5
}

fn default_threshold() -> f64 {
    0.5
}

fn default_lastfm_base_url() -> String {
    "https://ws.audioscrobbler.com/2.0/".into()
}

fn default_log_level() -> LogLevel {
    LogLevel::Info
}

fn default_max_log_files() -> usize {
    7
}
