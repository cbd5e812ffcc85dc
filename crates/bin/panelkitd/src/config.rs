//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `panelkit.toml` in the working directory. Every field has a
//! default so the file is optional. Environment variables take precedence
//! over file values. All of this is read-only input to the core; nothing
//! here is ever written back.

use serde::Deserialize;

use panelkit_adapter_http::HttpConfig;
use panelkit_adapter_mqtt::MqttConfig;
use panelkit_app::link::KnownNetwork;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Wireless link settings, including the known-network allow-list.
    pub link: LinkConfig,
    /// Broker connection settings.
    pub mqtt: MqttConfig,
    /// Hub HTTP endpoint settings.
    pub http: HttpConfig,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// Wireless link configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Weakest acceptable candidate, dBm.
    pub min_signal_dbm: i32,
    /// Rescan period while disconnected, seconds.
    pub rescan_interval_secs: u64,
    /// Allow-listed networks.
    pub networks: Vec<KnownNetworkConfig>,
}

/// One allow-listed network.
#[derive(Debug, Clone, Deserialize)]
pub struct KnownNetworkConfig {
    pub ssid: String,
    #[serde(default)]
    pub password: String,
}

impl Config {
    /// Load configuration from `panelkit.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if a
    /// value fails validation.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("panelkit.toml")?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("PANELKIT_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("PANELKIT_BROKER_HOST") {
            self.mqtt.broker_host = val;
        }
        if let Ok(val) = std::env::var("PANELKIT_BROKER_PORT") {
            if let Ok(port) = val.parse() {
                self.mqtt.broker_port = port;
            }
        }
        if let Ok(val) = std::env::var("PANELKIT_BASE_TOPIC") {
            self.mqtt.base_topic = val;
        }
        if let Ok(val) = std::env::var("PANELKIT_HTTP_URL") {
            self.http.base_url = val;
        }
        if let Ok(val) = std::env::var("PANELKIT_HTTP_TOKEN") {
            self.http.token = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.mqtt.broker_port == 0 {
            return Err(ConfigError::Validation(
                "mqtt.broker_port must be non-zero".to_string(),
            ));
        }
        if self.http.bootstrap_attempts == 0 {
            return Err(ConfigError::Validation(
                "http.bootstrap_attempts must be at least 1".to_string(),
            ));
        }
        if self.link.min_signal_dbm >= 0 {
            return Err(ConfigError::Validation(
                "link.min_signal_dbm must be negative".to_string(),
            ));
        }
        Ok(())
    }

    /// The allow-list in the form the link manager consumes.
    #[must_use]
    pub fn known_networks(&self) -> Vec<KnownNetwork> {
        self.link
            .networks
            .iter()
            .map(|net| KnownNetwork {
                ssid: net.ssid.clone(),
                credential: net.password.clone(),
            })
            .collect()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "panelkitd=info,panelkit=info".to_string(),
        }
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            min_signal_dbm: -85,
            rescan_interval_secs: 15,
            networks: Vec::new(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_provide_defaults_for_everything() {
        let config = Config::default();
        assert_eq!(config.link.min_signal_dbm, -85);
        assert_eq!(config.link.rescan_interval_secs, 15);
        assert!(config.link.networks.is_empty());
        assert_eq!(config.mqtt.broker_port, 1883);
        assert_eq!(config.http.bootstrap_attempts, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn should_parse_full_config() {
        let toml = r#"
            [logging]
            filter = "debug"

            [link]
            min_signal_dbm = -75
            rescan_interval_secs = 30

            [[link.networks]]
            ssid = "home"
            password = "secret"

            [[link.networks]]
            ssid = "fallback"

            [mqtt]
            broker_host = "broker.local"
            base_topic = "ha"

            [http]
            base_url = "http://hub.local:8123/api/template"
            token = "abc"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.logging.filter, "debug");
        assert_eq!(config.link.min_signal_dbm, -75);
        assert_eq!(config.link.networks.len(), 2);
        assert_eq!(config.link.networks[1].password, "");
        assert_eq!(config.mqtt.base_topic, "ha");
        assert_eq!(config.http.token, "abc");

        let known = config.known_networks();
        assert_eq!(known[0].ssid, "home");
        assert_eq!(known[0].credential, "secret");
    }

    #[test]
    fn should_reject_zero_broker_port() {
        let mut config = Config::default();
        config.mqtt.broker_port = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn should_reject_zero_bootstrap_attempts() {
        let mut config = Config::default();
        config.http.bootstrap_attempts = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn should_reject_non_negative_signal_floor() {
        let mut config = Config::default();
        config.link.min_signal_dbm = 10;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }
}
