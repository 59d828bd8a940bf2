//! Server configuration

use anyhow::{Context, Result};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Name attached to structured log events
    #[serde(default = "default_service_name")]
    pub service_name: String,

    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory scanned for model artifacts at startup
    #[serde(default = "default_model_dir")]
    pub model_dir: PathBuf,
}

fn default_service_name() -> String {
    "city-forecast".to_string()
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_model_dir() -> PathBuf {
    PathBuf::from("models")
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            bind_address: default_bind_address(),
            port: default_port(),
            model_dir: default_model_dir(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from an optional `forecast.toml` and `FORECAST_*` variables
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("forecast").required(false))
            .add_source(config::Environment::with_prefix("FORECAST").try_parsing(true))
            .build()
            .context("Failed to read configuration")?;

        config
            .try_deserialize()
            .context("Invalid configuration")
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.bind_address, self.port)
            .parse()
            .with_context(|| format!("Invalid bind address {}:{}", self.bind_address, self.port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: ServerConfig = config::Config::builder()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.service_name, "city-forecast");
        assert_eq!(config.port, 8000);
        assert_eq!(config.model_dir, PathBuf::from("models"));
        assert_eq!(config.socket_addr().unwrap().to_string(), "127.0.0.1:8000");
    }

    #[test]
    fn test_overrides() {
        let config: ServerConfig = config::Config::builder()
            .set_override("port", 9100)
            .unwrap()
            .set_override("model_dir", "/srv/models")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.port, 9100);
        assert_eq!(config.model_dir, PathBuf::from("/srv/models"));
        assert_eq!(config.bind_address, "127.0.0.1");
    }

    #[test]
    fn test_invalid_bind_address() {
        let config = ServerConfig {
            bind_address: "not an address".into(),
            ..ServerConfig::default()
        };
        assert!(config.socket_addr().is_err());
    }
}
