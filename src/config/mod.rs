//! Configuration management for Crucible

pub mod schema;

pub use schema::Config;

use crate::error::{CrucibleError, CrucibleResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Project-local configuration filename
const LOCAL_CONFIG_NAME: &str = ".crucible.toml";

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new config manager with the default path
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Create a config manager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("crucible")
            .join("config.toml")
    }

    /// Path this manager reads from
    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Walk up from `start` looking for a project-local config file
    pub fn find_local_config(start: &Path) -> Option<PathBuf> {
        let mut dir = Some(start);
        while let Some(current) = dir {
            let candidate = current.join(LOCAL_CONFIG_NAME);
            if candidate.is_file() {
                return Some(candidate);
            }
            dir = current.parent();
        }
        None
    }

    /// Load configuration, using defaults when no file exists
    pub async fn load(&self) -> CrucibleResult<Config> {
        if !self.config_path.exists() {
            debug!("Config file not found, using defaults");
            return Ok(Config::default());
        }
        Self::load_from_file(&self.config_path).await
    }

    /// Load configuration from a specific file
    pub async fn load_from_file(path: &Path) -> CrucibleResult<Config> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| CrucibleError::io(format!("reading config from {}", path.display()), e))?;

        toml::from_str(&content).map_err(|e| CrucibleError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Load the global config, then apply a local override file if given.
    ///
    /// Local values win wholesale per section field: image, workdir and
    /// volume names replace the global ones; local extra packages are
    /// appended.
    pub async fn load_merged(&self, local: Option<&Path>) -> CrucibleResult<Config> {
        let mut config = self.load().await?;

        if let Some(path) = local {
            debug!("Merging local config: {}", path.display());
            let local = Self::load_from_file(path).await?;
            let defaults = Config::default();

            if local.environment.image != defaults.environment.image {
                config.environment.image = local.environment.image;
            }
            if local.environment.workdir != defaults.environment.workdir {
                config.environment.workdir = local.environment.workdir;
            }
            for package in local.environment.packages {
                if !config.environment.packages.contains(&package) {
                    config.environment.packages.push(package);
                }
            }
            if local.cache.cargo_home_volume != defaults.cache.cargo_home_volume {
                config.cache.cargo_home_volume = local.cache.cargo_home_volume;
            }
            if local.cache.rustup_home_volume != defaults.cache.rustup_home_volume {
                config.cache.rustup_home_volume = local.cache.rustup_home_volume;
            }
            if local.cache.target_volume != defaults.cache.target_volume {
                config.cache.target_volume = local.cache.target_volume;
            }
            config.general.verbose |= local.general.verbose;
        }

        Ok(config)
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}
