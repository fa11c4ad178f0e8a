// src/config/loader.rs
//! Layered configuration loader
//!
//! Precedence, lowest first: built-in defaults, each configuration file in
//! order, then `BIOSTREAM__*` environment variables (`__` separates nested
//! keys, e.g. `BIOSTREAM__SERIAL__BAUD_RATE`).

use crate::config::{constants::paths, EngineConfig};
use config::{Config, Environment, File, FileFormat};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    #[error("configuration parse error: {0}")]
    Parse(String),

    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("configuration i/o error: {0}")]
    Io(#[from] io::Error),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

impl From<toml::ser::Error> for ConfigError {
    fn from(err: toml::ser::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

/// Loads [`EngineConfig`] from defaults, TOML files and the environment
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config_paths: Vec<PathBuf>,
    env_prefix: Option<String>,
}

impl ConfigLoader {
    /// Loader for `./biostream.toml` and the file named by `BIOSTREAM_CONFIG`
    pub fn new() -> Self {
        Self::with_paths(Self::discover_config_paths())
    }

    /// Create loader with custom paths; missing files are skipped
    pub fn with_paths(paths: Vec<PathBuf>) -> Self {
        Self {
            config_paths: paths,
            env_prefix: Some(paths::ENV_PREFIX.to_string()),
        }
    }

    /// Override the environment prefix; `None` ignores the environment
    pub fn with_env_prefix(mut self, prefix: Option<&str>) -> Self {
        self.env_prefix = prefix.map(str::to_string);
        self
    }

    pub fn config_paths(&self) -> &[PathBuf] {
        &self.config_paths
    }

    /// Merge every layer and validate the result
    pub fn load(&self) -> Result<EngineConfig, ConfigError> {
        let mut builder = Config::builder().add_source(Config::try_from(&EngineConfig::default())?);

        for path in &self.config_paths {
            if path.exists() {
                tracing::debug!(path = %path.display(), "loading configuration file");
            }
            builder = builder.add_source(File::from(path.as_path()).format(FileFormat::Toml).required(false));
        }

        if let Some(prefix) = &self.env_prefix {
            builder = builder.add_source(
                Environment::with_prefix(prefix)
                    .prefix_separator(paths::ENV_SEPARATOR)
                    .separator(paths::ENV_SEPARATOR)
                    .try_parsing(true),
            );
        }

        let config: EngineConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load a single file without the other layers
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<EngineConfig, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let content = std::fs::read_to_string(path)?;
        let config: EngineConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Write `config` as TOML
    pub fn export_config<P: AsRef<Path>>(config: &EngineConfig, path: P) -> Result<(), ConfigError> {
        let toml_content = toml::to_string_pretty(config)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    fn discover_config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(paths::CONFIG_FILE_NAME)];
        if let Some(path) = std::env::var_os(paths::CONFIG_PATH_ENV) {
            paths.push(PathBuf::from(path));
        }
        paths
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
