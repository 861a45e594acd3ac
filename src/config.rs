//! Recycler Configuration
//!
//! Operational settings read from a mounted YAML file (typically a
//! `ConfigMap`). Everything has a sensible default so the recycler also runs
//! with no config mounted at all.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Environment variable that overrides the mounted config path.
pub const CONFIG_PATH_ENV: &str = "RECYCLER_CONFIG_PATH";

/// Default location of the mounted configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "/config/config.yaml";

/// Main recycler configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RecyclerConfig {
    /// Watch loop configuration
    #[serde(default)]
    pub watch: WatchConfig,

    /// Probe server configuration
    #[serde(default)]
    pub server: ServerConfig,
}

/// Watch loop configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WatchConfig {
    /// Seconds to wait before reopening the watch after it ends or fails
    #[serde(default = "default_reconnect_delay", rename = "reconnectDelaySeconds")]
    pub reconnect_delay_seconds: u64,
}

impl WatchConfig {
    #[must_use]
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_seconds)
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            reconnect_delay_seconds: default_reconnect_delay(),
        }
    }
}

/// Probe server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Bind address for the health and readiness endpoints
    #[serde(default = "default_bind_address", rename = "bindAddress")]
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
        }
    }
}

fn default_reconnect_delay() -> u64 {
    5
}

fn default_bind_address() -> String {
    "0.0.0.0:8080".to_string()
}

impl RecyclerConfig {
    /// Load configuration from a mounted file
    pub fn from_mounted_file(config_path: &str) -> Result<Self, anyhow::Error> {
        let config_str = std::fs::read_to_string(config_path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file {config_path}: {e}"))?;

        let config: RecyclerConfig = serde_yaml::from_str(&config_str)
            .map_err(|e| anyhow::anyhow!("Failed to parse config YAML: {e}"))?;

        Ok(config)
    }

    /// Reject settings the watch loop cannot run with
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.watch.reconnect_delay_seconds == 0 {
            return Err(anyhow::anyhow!(
                "watch.reconnectDelaySeconds must be at least 1"
            ));
        }

        if self.server.bind_address.trim().is_empty() {
            return Err(anyhow::anyhow!("server.bindAddress must not be empty"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = RecyclerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.watch.reconnect_delay_seconds, 5);
        assert_eq!(config.server.bind_address, "0.0.0.0:8080");
    }

    #[test]
    fn parses_camel_case_yaml() {
        let yaml = r"
watch:
  reconnectDelaySeconds: 10
server:
  bindAddress: 127.0.0.1:9090
";
        let config: RecyclerConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.watch.reconnect_delay_seconds, 10);
        assert_eq!(config.watch.reconnect_delay(), Duration::from_secs(10));
        assert_eq!(config.server.bind_address, "127.0.0.1:9090");
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let yaml = r"
watch:
  reconnectDelaySeconds: 2
";
        let config: RecyclerConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.watch.reconnect_delay_seconds, 2);
        assert_eq!(config.server.bind_address, "0.0.0.0:8080");
    }

    #[test]
    fn zero_reconnect_delay_is_rejected() {
        let mut config = RecyclerConfig::default();
        config.watch.reconnect_delay_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_bind_address_is_rejected() {
        let mut config = RecyclerConfig::default();
        config.server.bind_address = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_file_reports_the_path() {
        let err = RecyclerConfig::from_mounted_file("/nonexistent/config.yaml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/config.yaml"));
    }
}
