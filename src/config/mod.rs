//! Configuration management
//!
//! Values are layered: built-in defaults, then an optional `softphone.toml`
//! next to the binary, then `SOFTPHONE__SECTION__KEY` environment variables.

use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const CONFIG_FILE: &str = "softphone";
const ENV_PREFIX: &str = "SOFTPHONE";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub telephony: TelephonyConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelephonyConfig {
    pub connect_timeout_secs: u64,
    /// Loopback vendor answers outbound calls immediately
    pub auto_answer: bool,
    /// Log vendor signalling at debug level
    pub debug: bool,
}

impl TelephonyConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default `tracing` filter; `RUST_LOG` takes precedence
    pub level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 5000,
            },
            telephony: TelephonyConfig {
                connect_timeout_secs: 10,
                auto_answer: false,
                debug: false,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }
}

impl Config {
    /// Load defaults, `softphone.toml` and environment overrides
    pub fn load() -> Result<Self, ConfigError> {
        Self::builder()?
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?
            .try_deserialize()
    }

    /// Load from an explicit file on top of the defaults
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        Self::builder()?
            .add_source(File::with_name(path))
            .build()?
            .try_deserialize()
    }

    fn builder() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        let defaults = config::Config::try_from(&Config::default())?;
        Ok(config::Config::builder().add_source(defaults))
    }
}
