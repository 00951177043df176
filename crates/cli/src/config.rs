//! Configuration management for bserctl.
//!
//! Uses figment to merge configuration from multiple sources:
//! 1. Default values
//! 2. Config file (TOML)
//! 3. Environment variables (`BSERCTL_CLIENT__SOCKET`, ...)
//! 4. Command-line arguments

use bserlink_client::DEFAULT_MAX_PDU_SIZE;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Client configuration
    #[serde(default)]
    pub client: ClientConfig,
}

/// Connection and logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Daemon socket path. There is no default; it must be configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub socket: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Largest response payload accepted, in bytes
    #[serde(default = "default_max_pdu_size")]
    pub max_pdu_size: usize,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_max_pdu_size() -> usize {
    DEFAULT_MAX_PDU_SIZE
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            socket: None,
            log_level: default_log_level(),
            max_pdu_size: default_max_pdu_size(),
        }
    }
}

impl Config {
    /// Load configuration from all sources
    pub fn load(config_file: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(path) = config_file {
            figment = figment.merge(Toml::file(path));
        } else if let Some(path) = default_config_path().filter(|p| p.exists()) {
            figment = figment.merge(Toml::file(path));
        }

        // Environment variables (BSERCTL_ prefix, `__` separates sections)
        figment = figment.merge(Env::prefixed("BSERCTL_").split("__"));

        figment.extract()
    }

    /// Override socket path from CLI
    pub fn with_socket(mut self, socket: Option<PathBuf>) -> Self {
        if let Some(s) = socket {
            self.client.socket = Some(s);
        }
        self
    }

    /// Override log level from CLI
    pub fn with_log_level(mut self, log_level: Option<String>) -> Self {
        if let Some(level) = log_level {
            self.client.log_level = level;
        }
        self
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("bserlink/config.toml"))
}
