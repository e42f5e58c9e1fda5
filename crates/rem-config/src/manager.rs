use crate::types::RemConfig;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Name of the project configuration file
pub const CONFIG_FILE_NAME: &str = "rem.toml";

/// Errors that can occur during config management
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error in {path}: {source}")]
    TomlDe {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Config file not found at {0}")]
    ConfigNotFound(PathBuf),

    #[error("Config file already exists at {0}")]
    ConfigExists(PathBuf),

    #[error("Invalid configuration in {path}: {message}")]
    Invalid { path: PathBuf, message: String },
}

/// Where the effective configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Read from this file
    File(PathBuf),
    /// No file found, built-in defaults
    Defaults,
}

/// Manager for rem configuration
///
/// Looks for an explicit path first, then `rem.toml` in the working
/// directory, then `rem/config.toml` in the user configuration directory.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    source: ConfigSource,
    config: RemConfig,
}

impl ConfigManager {
    /// Get the user config path (`<config dir>/rem/config.toml`)
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("rem").join("config.toml"))
    }

    /// Resolve the configuration for the current working directory
    pub fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let cwd = std::env::current_dir()?;
        Self::discover_in(&cwd, explicit, Self::user_config_path().as_deref())
    }

    /// Resolve the configuration for `dir`; an explicit path must exist
    pub fn discover_in(dir: &Path, explicit: Option<&Path>, user: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }

        let local = dir.join(CONFIG_FILE_NAME);
        for candidate in std::iter::once(local.as_path()).chain(user) {
            if candidate.is_file() {
                return Self::load_from(candidate);
            }
        }

        debug!("no configuration file found, using defaults");
        Ok(Self {
            source: ConfigSource::Defaults,
            config: RemConfig::default(),
        })
    }

    /// Load config from specific path
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }

        let contents = fs::read_to_string(path)?;
        let config: RemConfig = toml::from_str(&contents).map_err(|source| ConfigError::TomlDe {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate().map_err(|message| ConfigError::Invalid {
            path: path.to_path_buf(),
            message,
        })?;

        debug!(path = %path.display(), "loaded configuration");
        Ok(Self {
            source: ConfigSource::File(path.to_path_buf()),
            config,
        })
    }

    /// Initialize a config file with the defaults at `path`
    pub fn init_at(path: &Path, force: bool) -> Result<Self, ConfigError> {
        if path.exists() && !force {
            return Err(ConfigError::ConfigExists(path.to_path_buf()));
        }

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let manager = Self {
            source: ConfigSource::File(path.to_path_buf()),
            config: RemConfig::default(),
        };
        manager.save()?;
        Ok(manager)
    }

    /// Save config to its file atomically
    ///
    /// Uses a temporary file and atomic rename to prevent corruption
    pub fn save(&self) -> Result<(), ConfigError> {
        let ConfigSource::File(path) = &self.source else {
            return Ok(());
        };
        let toml_str = self.to_toml()?;

        let temp_path = path.with_extension("toml.tmp");
        fs::write(&temp_path, toml_str)?;
        fs::rename(&temp_path, path)?;
        Ok(())
    }

    /// Effective configuration rendered as TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(&self.config)?)
    }

    /// Get reference to config
    pub fn config(&self) -> &RemConfig {
        &self.config
    }

    /// Get mutable reference to config (caller must call save())
    #[cfg(test)]
    pub(crate) fn config_mut(&mut self) -> &mut RemConfig {
        &mut self.config
    }

    /// Where the configuration came from
    pub fn source(&self) -> &ConfigSource {
        &self.source
    }
}
