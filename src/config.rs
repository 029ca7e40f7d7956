use crate::app_dirs::AppDirs;
use crate::session::{SessionConfig, DEFAULT_GRID_SIZE, DEFAULT_TIMEOUT_MS, DEFAULT_TOTAL_ROUNDS};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Settings remembered between runs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub grid_size: usize,
    pub total_rounds: u32,
    pub timeout_ms: u64,
    pub save_results: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            grid_size: DEFAULT_GRID_SIZE,
            total_rounds: DEFAULT_TOTAL_ROUNDS,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            save_results: true,
        }
    }
}

impl From<&Config> for SessionConfig {
    fn from(cfg: &Config) -> Self {
        Self {
            grid_size: cfg.grid_size,
            total_rounds: cfg.total_rounds,
            timeout_ms: cfg.timeout_ms,
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new() -> Self {
        let path = AppDirs::config_path().unwrap_or_else(|| PathBuf::from("focustap_config.json"));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(_) => {
                debug!(path = ?self.path, "no config file, using defaults");
                return Config::default();
            }
        };
        match serde_json::from_slice::<Config>(&bytes) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!(path = ?self.path, error = %e, "unreadable config, using defaults");
                Config::default()
            }
        }
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)
    }
}
