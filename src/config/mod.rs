//! Configuration module for the Makai MCP protocol engine.
//!
//! Settings load from an optional TOML file and are overridden by
//! environment variables with the `MAKAI` prefix. All values are validated
//! before use.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use config::{Config, ConfigError as ExternalConfigError, Environment, File};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::error::config::ConfigError;

pub mod server;

pub use server::{FramingType, ServerConfig, TransportType};

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Default configuration location
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Default environment variable prefix for configuration overrides
const ENV_PREFIX: &str = "MAKAI";

/// A trait for types that can be validated.
pub trait Validate {
    /// Validates that the configuration is correct.
    fn validate(&self) -> ConfigResult<()>;
}

/// Main configuration for the Makai MCP protocol engine.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MakaiConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// Notification delivery configuration
    pub notify: NotifyConfig,

    /// Log configuration
    pub log: LogConfig,
}

impl Validate for MakaiConfig {
    fn validate(&self) -> ConfigResult<()> {
        self.server.validate()?;
        self.notify.validate()?;
        self.log.validate()?;
        Ok(())
    }
}

/// Notification delivery configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Worker polling interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 10,
        }
    }
}

impl Validate for NotifyConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "poll_interval_ms must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Logging configuration.
///
/// `RUST_LOG` takes precedence over `level` when set, so operators can
/// raise verbosity per-run without touching the file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Validate for LogConfig {
    fn validate(&self) -> ConfigResult<()> {
        match self.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
            _ => Err(ConfigError::ValidationError(format!(
                "Invalid log level: {}",
                self.level
            ))),
        }
    }
}

/// Configuration loader combining defaults, an optional file, and the
/// environment.
#[derive(Debug)]
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
    env_prefix: String,
}

impl ConfigLoader {
    /// Creates a new configuration loader.
    pub fn new<P: AsRef<Path>>(config_path: Option<P>, env_prefix: &str) -> Self {
        Self {
            config_path: config_path.map(|p| p.as_ref().to_path_buf()),
            env_prefix: env_prefix.to_string(),
        }
    }

    /// Loads and validates the configuration.
    pub fn load(&self) -> ConfigResult<MakaiConfig> {
        let mut builder = Config::builder().add_source(
            Config::try_from(&MakaiConfig::default())
                .map_err(|e| ConfigError::ParseError(e.to_string()))?,
        );

        if let Some(path) = &self.config_path {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path.clone()));
            }
            let name = path
                .to_str()
                .ok_or_else(|| ConfigError::ParseError(format!("Invalid path: {path:?}")))?;
            builder = builder.add_source(File::with_name(name).format(config::FileFormat::Toml));
        }

        builder = builder.add_source(
            Environment::with_prefix(&self.env_prefix)
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().map_err(|e| match e {
            ExternalConfigError::NotFound(path) => ConfigError::FileNotFound(PathBuf::from(path)),
            ExternalConfigError::FileParse { .. } => {
                ConfigError::ParseError("Error parsing config file".to_string())
            }
            ExternalConfigError::Message(msg) => ConfigError::ParseError(msg),
            other => ConfigError::LoadError(other),
        })?;

        let makai_config: MakaiConfig = config
            .try_deserialize()
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        makai_config.validate()?;

        Ok(makai_config)
    }
}

/// Global server configuration.
static GLOBAL_CONFIG: OnceCell<Arc<MakaiConfig>> = OnceCell::new();

/// Initializes the global configuration.
///
/// A second initialization is ignored with a warning; the first
/// configuration wins.
pub fn init_global_config(config: MakaiConfig) {
    if GLOBAL_CONFIG.set(Arc::new(config)).is_err() {
        tracing::warn!("Global configuration was already initialized, ignoring new configuration");
    }
}

/// Returns the global configuration, installing defaults when nothing was
/// initialized.
pub fn global_config() -> Arc<MakaiConfig> {
    Arc::clone(GLOBAL_CONFIG.get_or_init(|| Arc::new(MakaiConfig::default())))
}

/// Loads the default configuration file, falling back to defaults when the
/// file is absent.
pub fn init_default_config() -> ConfigResult<()> {
    let loader = ConfigLoader::new(Some(PathBuf::from(DEFAULT_CONFIG_PATH)), ENV_PREFIX);
    let config = match loader.load() {
        Ok(config) => config,
        Err(ConfigError::FileNotFound(_)) => {
            tracing::warn!(
                "Default configuration file not found at: {}",
                DEFAULT_CONFIG_PATH
            );
            MakaiConfig::default()
        }
        Err(e) => return Err(e),
    };

    init_global_config(config);
    Ok(())
}
