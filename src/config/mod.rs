//! Configuration module for epicharts
//!
//! This module handles application configuration including:
//! - Viewer settings (`config.toml`): where data comes from and how charts are sized
//! - Persisted chart state (which charts are hidden, which runs are loaded)
//! - Key-value storage backends the chart state is written to
//!
//! # App Data Location
//!
//! Application data is stored in the platform-appropriate location:
//! - **Linux**: `~/.local/share/dev.epicharts.viewer/`
//! - **macOS**: `~/Library/Application Support/dev.epicharts.viewer/`
//! - **Windows**: `%APPDATA%\dev.epicharts.viewer\`
//!
//! # Files
//!
//! - `config.toml` - Viewer settings, see [`AppConfig`]
//! - `chartState-v1.json` - Persisted chart state, see [`chart_state`]
//! - `logs/` - Daily rolling log files

pub mod chart_state;
pub mod storage;

pub use chart_state::{PersistedChart, PersistedRun, PersistedState, StateStore};
pub use storage::{FileStorage, MemoryStorage, Storage};

use crate::error::{ChartsError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier for data directories
pub const APP_ID: &str = "dev.epicharts.viewer";

/// Config filename
pub const CONFIG_FILE: &str = "config.toml";

/// Storage key of the persisted chart state
pub const DEFAULT_STATE_KEY: &str = "chartState-v1";

/// Path of the run index, relative to the data root
pub const DEFAULT_RUNS_INDEX: &str = "api/runs.json";

/// Stat fields shown for loaded runs, in display order
pub const DEFAULT_STAT_FIELDS: [&str; 6] = ["cached", "seed", "CRICoef", "duration", "run", "diff"];

// ==================== App Data Directory ====================

/// Get the application data directory path
pub fn app_data_dir() -> Option<PathBuf> {
    dirs_next::data_dir().map(|p| p.join(APP_ID))
}

/// Ensure the app data directory exists
pub fn ensure_app_data_dir() -> Result<PathBuf> {
    let dir = app_data_dir().ok_or_else(|| {
        ChartsError::Config("Could not determine app data directory".to_string())
    })?;

    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| {
            ChartsError::Config(format!("Failed to create app data directory: {}", e))
        })?;
    }

    Ok(dir)
}

/// Get the path to the config file
pub fn config_path() -> Option<PathBuf> {
    app_data_dir().map(|p| p.join(CONFIG_FILE))
}

// ==================== Data Source ====================

/// Where the run index and run payloads are read from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "location", rename_all = "snake_case")]
pub enum DataSource {
    /// An HTTP server serving the `api/` tree
    Url(String),
    /// A local directory holding the `api/` tree
    Directory(PathBuf),
}

impl Default for DataSource {
    fn default() -> Self {
        DataSource::Directory(PathBuf::from("."))
    }
}

impl DataSource {
    /// Interpret a command line argument: anything with a URL scheme is a URL
    pub fn parse(arg: &str) -> Self {
        if arg.starts_with("http://") || arg.starts_with("https://") {
            DataSource::Url(arg.to_string())
        } else {
            DataSource::Directory(PathBuf::from(arg))
        }
    }
}

impl std::fmt::Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataSource::Url(url) => write!(f, "{}", url),
            DataSource::Directory(dir) => write!(f, "{}", dir.display()),
        }
    }
}

// ==================== View Sizes ====================

/// Size of a chart view in points
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewSize {
    pub width: f32,
    pub height: f32,
}

impl ViewSize {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

fn default_mini_size() -> ViewSize {
    ViewSize::new(100.0, 40.0)
}

fn default_full_size() -> ViewSize {
    ViewSize::new(600.0, 450.0)
}

// ==================== App Config ====================

/// Viewer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Version for future migration support
    #[serde(default = "default_config_version")]
    pub version: u32,

    /// Data source for runs and run payloads
    #[serde(default)]
    pub source: DataSource,

    /// Run index path, relative to the data source
    #[serde(default = "default_runs_index")]
    pub runs_index: String,

    /// Storage key of the persisted chart state
    #[serde(default = "default_state_key")]
    pub state_key: String,

    /// Directory holding the persisted chart state; the app data directory when unset
    #[serde(default)]
    pub state_dir: Option<PathBuf>,

    /// Reload runs that were loaded when the viewer last closed
    #[serde(default = "default_true")]
    pub restore_loaded_runs: bool,

    /// Stat fields shown for loaded runs
    #[serde(default = "default_stat_fields")]
    pub stat_fields: Vec<String>,

    /// Size of preview charts
    #[serde(default = "default_mini_size")]
    pub mini_size: ViewSize,

    /// Size of detail charts
    #[serde(default = "default_full_size")]
    pub full_size: ViewSize,
}

fn default_config_version() -> u32 {
    1
}

fn default_runs_index() -> String {
    DEFAULT_RUNS_INDEX.to_string()
}

fn default_state_key() -> String {
    DEFAULT_STATE_KEY.to_string()
}

fn default_true() -> bool {
    true
}

fn default_stat_fields() -> Vec<String> {
    DEFAULT_STAT_FIELDS.iter().map(|s| s.to_string()).collect()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: 1,
            source: DataSource::default(),
            runs_index: default_runs_index(),
            state_key: default_state_key(),
            state_dir: None,
            restore_loaded_runs: true,
            stat_fields: default_stat_fields(),
            mini_size: default_mini_size(),
            full_size: default_full_size(),
        }
    }
}

impl AppConfig {
    /// Load the config from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ChartsError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        toml::from_str(&content).map_err(|e| {
            ChartsError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })
    }

    /// Load the config from `path`, or from the app data directory when `None`.
    ///
    /// A missing file silently yields defaults; an unreadable or invalid one
    /// yields defaults with a warning.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let path = match path.map(Path::to_path_buf).or_else(config_path) {
            Some(path) => path,
            None => return Self::default(),
        };

        if !path.exists() {
            tracing::debug!("No config file at {:?}, using defaults", path);
            return Self::default();
        }

        match Self::load(&path) {
            Ok(config) => {
                tracing::info!("Loaded config from {:?}", path);
                config
            }
            Err(e) => {
                tracing::warn!("{}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Save the config as TOML
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ChartsError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| ChartsError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content).map_err(|e| {
            ChartsError::Config(format!("Failed to write config file {:?}: {}", path, e))
        })
    }

    /// Directory the chart state is stored in
    pub fn state_dir(&self) -> Result<PathBuf> {
        match &self.state_dir {
            Some(dir) => Ok(dir.clone()),
            None => ensure_app_data_dir(),
        }
    }
}
