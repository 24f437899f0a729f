use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::core::{RefRepathError, Result};
use crate::scene::SaveMode;
use crate::worker::WorkerOptions;

/// File name looked up in the scan root.
pub const PROJECT_CONFIG_FILE: &str = "refrepath.toml";

/// Environment variable naming the host executable.
pub const HOST_ENV: &str = "REFREPATH_HOST";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub batch: BatchConfig,

    #[serde(default)]
    pub host: HostConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Wall-clock budget of one worker, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub save_mode: SaveMode,

    /// Keep a `.refrepathbackup` copy before saving in place
    #[serde(default = "default_backup")]
    pub backup: bool,

    /// Fail references whose new target is missing on disk
    #[serde(default)]
    pub check_exists: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostConfig {
    /// Executable invoked as `<executable> worker`. Defaults to this binary.
    #[serde(default)]
    pub executable: Option<PathBuf>,
}

fn default_timeout_secs() -> u64 {
    600
}

fn default_backup() -> bool {
    true
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            save_mode: SaveMode::default(),
            backup: default_backup(),
            check_exists: false,
        }
    }
}

impl BatchConfig {
    pub fn worker_options(&self, dry_run: bool) -> WorkerOptions {
        WorkerOptions {
            save_mode: self.save_mode,
            backup: self.backup,
            check_exists: self.check_exists,
            dry_run,
        }
    }
}

impl Config {
    /// Load the first config file found, in priority order:
    ///
    /// 1. `<scan root>/refrepath.toml`
    /// 2. `<config dir>/refrepath/config.toml`
    ///
    /// Built-in defaults apply when neither exists.
    pub fn load(scan_root: Option<&Path>) -> Result<Self> {
        let candidates = scan_root
            .map(|root| root.join(PROJECT_CONFIG_FILE))
            .into_iter()
            .chain(Self::global_config_path());

        for path in candidates {
            if path.is_file() {
                info!("Loading config from {}", path.display());
                return Self::load_from_file(&path);
            }
        }

        debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| RefRepathError::ConfigError {
            file: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let config: Config = toml::from_str(&contents).map_err(|e| RefRepathError::ConfigError {
            file: path.to_path_buf(),
            message: e.to_string(),
        })?;

        if config.batch.timeout_secs == 0 {
            return Err(RefRepathError::ConfigError {
                file: path.to_path_buf(),
                message: "batch.timeout_secs must be greater than zero".to_string(),
            });
        }
        Ok(config)
    }

    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("refrepath").join("config.toml"))
    }
}

/// Pick the worker host: the explicit choice (flag or `REFREPATH_HOST`),
/// then the config file, then this executable itself.
///
/// Bare names are looked up on `PATH`.
pub fn resolve_host(explicit: Option<&Path>, config: &HostConfig) -> Result<PathBuf> {
    let chosen = explicit
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .or_else(|| config.executable.clone());

    let Some(chosen) = chosen else {
        return std::env::current_exe()
            .map_err(|e| RefRepathError::HostNotFound(format!("cannot locate own executable: {}", e)));
    };

    if chosen.is_file() {
        return Ok(chosen);
    }
    if chosen.components().count() == 1 {
        if let Ok(found) = which::which(&chosen) {
            debug!("Host {} found at {}", chosen.display(), found.display());
            return Ok(found);
        }
    }
    Err(RefRepathError::HostNotFound(chosen.display().to_string()))
}
