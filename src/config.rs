use std::{
    fs,
    io,
    path::{Path, PathBuf},
};

use directories::ProjectDirs;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::{CountdownError, ReadFailurePolicy, Result, DEFAULT_STORAGE_KEY};

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "COUNTDOWNS_DATA_DIR";

/// Application configuration settings.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Directory holding the storage files
    pub data_dir: PathBuf,

    /// Key the event collection is stored under
    pub storage_key: String,

    /// How often live countdowns refresh (in milliseconds)
    pub refresh_interval_ms: u64,

    /// Fail loads on unreadable storage instead of starting empty
    pub strict_reads: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            refresh_interval_ms: 1000,
            strict_reads: false,
        }
    }
}

impl Config {
    /// Default location of the configuration file
    pub fn default_path() -> PathBuf {
        project_dirs()
            .map(|dirs| dirs.config_dir().join("config.json"))
            .unwrap_or_else(|| PathBuf::from(".countdowns").join("config.json"))
    }

    /// Loads configuration from `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No config file at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => return Err(CountdownError::Io(e)),
        };

        let config: Config =
            serde_json::from_str(&content).map_err(|e| CountdownError::ConfigError {
                message: format!("{}: {}", path.display(), e),
            })?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        info!("Saved configuration to {}", path.display());
        Ok(())
    }

    /// Applies the data directory override from the environment, if set.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|d| !d.is_empty()) {
            self.data_dir = PathBuf::from(dir);
        }
        self
    }

    pub fn read_policy(&self) -> ReadFailurePolicy {
        if self.strict_reads {
            ReadFailurePolicy::Surface
        } else {
            ReadFailurePolicy::FallbackEmpty
        }
    }

    pub fn refresh_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.refresh_interval_ms)
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "countdowns")
}

fn default_data_dir() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".countdowns"))
}
