//! Configuration loader with inheritance support.
//!
//! Loads configuration from multiple sources and merges them:
//! 1. Global config: `~/.mongrate/config.toml`
//! 2. Local config: `.mongrate/config.toml` (working directory)
//! 3. CLI overrides
//!
//! Later sources override earlier ones.

use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::{ConfigOverrides, MigrationConfig};

/// Configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Configuration directory name, global and local.
const CONFIG_DIR: &str = ".mongrate";

/// Configuration loader.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Global config directory (e.g., `~/.mongrate`)
    global_config_dir: Option<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a loader rooted at the detected home directory.
    pub fn new() -> Self {
        Self {
            global_config_dir: dirs::home_dir().map(|home| home.join(CONFIG_DIR)),
        }
    }

    /// Create a loader with a custom global config directory.
    ///
    /// Useful for testing.
    pub fn with_global_dir(global_dir: impl Into<PathBuf>) -> Self {
        Self {
            global_config_dir: Some(global_dir.into()),
        }
    }

    /// Get the global config file path.
    pub fn global_config_path(&self) -> Option<PathBuf> {
        self.global_config_dir
            .as_ref()
            .map(|dir| dir.join(CONFIG_FILE_NAME))
    }

    /// Get the local config file path under a working directory.
    pub fn local_config_path(&self, working_dir: &Path) -> PathBuf {
        working_dir.join(CONFIG_DIR).join(CONFIG_FILE_NAME)
    }

    /// Load configuration with optional CLI overrides.
    ///
    /// Merges in order: defaults → global → local → overrides.
    pub fn load(
        &self,
        working_dir: &Path,
        overrides: Option<&ConfigOverrides>,
    ) -> Result<MigrationConfig, ConfigError> {
        let mut config = MigrationConfig::default();

        if let Some(global) = self.load_global()? {
            config = global;
        }
        if let Some(local) = self.load_local(working_dir)? {
            config = local;
        }
        if let Some(overrides) = overrides {
            config.apply_overrides(overrides);
        }
        Ok(config)
    }

    /// Load only the global configuration, if present.
    pub fn load_global(&self) -> Result<Option<MigrationConfig>, ConfigError> {
        let Some(global_path) = self.global_config_path() else {
            debug!("no home directory found, skipping global config");
            return Ok(None);
        };
        if !global_path.exists() {
            trace!("global config not found at {:?}", global_path);
            return Ok(None);
        }
        debug!("loading global config from {:?}", global_path);
        load_config_file(&global_path).map(Some)
    }

    /// Load only the local configuration, if present.
    pub fn load_local(&self, working_dir: &Path) -> Result<Option<MigrationConfig>, ConfigError> {
        let local_path = self.local_config_path(working_dir);
        if !local_path.exists() {
            trace!("local config not found at {:?}", local_path);
            return Ok(None);
        }
        debug!("loading local config from {:?}", local_path);
        load_config_file(&local_path).map(Some)
    }

    /// Write the global configuration file, creating the directory.
    pub fn save_global(&self, config: &MigrationConfig) -> Result<PathBuf, ConfigError> {
        let Some(ref global_dir) = self.global_config_dir else {
            return Err(ConfigError::NoHomeDir);
        };
        if !global_dir.exists() {
            std::fs::create_dir_all(global_dir)
                .map_err(|e| ConfigError::create_dir(global_dir, e))?;
        }
        let path = global_dir.join(CONFIG_FILE_NAME);
        save_config_file(&path, config)?;
        Ok(path)
    }
}

fn load_config_file(path: &Path) -> Result<MigrationConfig, ConfigError> {
    let content =
        std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
    toml::from_str(&content).map_err(|e| ConfigError::parse_toml(path, e))
}

fn save_config_file(path: &Path, config: &MigrationConfig) -> Result<(), ConfigError> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))
}
