//! Hub HTTP endpoint configuration.

use serde::Deserialize;

/// Configuration for the hub's template API endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Template API endpoint, e.g. `http://hub.local:8123/api/template`.
    pub base_url: String,
    /// Bearer token; empty sends no `Authorization` header.
    pub token: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Bootstrap attempts before giving up.
    pub bootstrap_attempts: u32,
    /// Fixed delay between bootstrap attempts, in seconds.
    pub retry_delay_secs: u64,
    /// Weather/clock poll period, in seconds.
    pub weather_poll_secs: u64,
    /// Weather entity the hub should report on.
    pub weather_entity: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8123/api/template".to_string(),
            token: String::new(),
            timeout_secs: 7,
            bootstrap_attempts: 3,
            retry_delay_secs: 3,
            weather_poll_secs: 50,
            weather_entity: "weather.forecast_home".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_have_sensible_defaults() {
        let config = HttpConfig::default();
        assert_eq!(config.timeout_secs, 7);
        assert_eq!(config.bootstrap_attempts, 3);
        assert_eq!(config.retry_delay_secs, 3);
        assert_eq!(config.weather_poll_secs, 50);
    }

    #[test]
    fn should_deserialize_from_toml() {
        let toml = r#"
            base_url = "http://hub.local:8123/api/template"
            token = "abc123"
            bootstrap_attempts = 5
            weather_poll_secs = 120
        "#;
        let config: HttpConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.base_url, "http://hub.local:8123/api/template");
        assert_eq!(config.token, "abc123");
        assert_eq!(config.bootstrap_attempts, 5);
        assert_eq!(config.weather_poll_secs, 120);
        // Untouched fields keep their defaults.
        assert_eq!(config.retry_delay_secs, 3);
    }
}
