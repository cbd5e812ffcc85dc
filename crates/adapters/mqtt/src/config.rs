//! Broker connection configuration and topic layout.

use serde::Deserialize;

use panelkit_domain::entity::EntityId;

/// Configuration for the broker session.
///
/// Read-only input sourced from persisted device configuration; the core
/// never writes it back.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    /// Broker hostname or IP address.
    pub broker_host: String,
    /// Broker port.
    pub broker_port: u16,
    /// Client identifier; when empty a unique one is generated at start.
    pub client_id: String,
    /// Username; empty means no authentication.
    pub username: String,
    /// Password, paired with `username`.
    pub password: String,
    /// Base topic prefix for all panel communication.
    pub base_topic: String,
    /// Keep-alive interval in seconds.
    pub keep_alive_secs: u16,
    /// Fixed delay between reconnect attempts, in seconds.
    pub reconnect_backoff_secs: u16,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker_host: "localhost".to_string(),
            broker_port: 1883,
            client_id: String::new(),
            username: String::new(),
            password: String::new(),
            base_topic: "panel".to_string(),
            keep_alive_secs: 30,
            reconnect_backoff_secs: 3,
        }
    }
}

impl MqttConfig {
    /// Prefix of incoming per-entity state topics: `{base}/state/`.
    #[must_use]
    pub fn state_topic_prefix(&self) -> String {
        format!("{}/state/", self.base_topic)
    }

    /// State topic for one entity: `{base}/state/{entity_id}`.
    #[must_use]
    pub fn state_topic(&self, entity_id: &EntityId) -> String {
        format!("{}/state/{entity_id}", self.base_topic)
    }

    /// Outgoing toggle command topic; the payload is the raw entity id.
    #[must_use]
    pub fn toggle_topic(&self) -> String {
        format!("{}/cmd/toggle", self.base_topic)
    }

    /// Retained presence topic carrying `"online"` / `"offline"`.
    #[must_use]
    pub fn status_topic(&self) -> String {
        format!("{}/ui/status", self.base_topic)
    }

    /// Entity id carried by `topic` when it is a state topic, else `None`.
    #[must_use]
    pub fn entity_from_state_topic<'a>(&self, topic: &'a str) -> Option<&'a str> {
        let rest = topic.strip_prefix(&self.base_topic)?;
        let id = rest.strip_prefix("/state/")?;
        (!id.is_empty()).then_some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_have_sensible_defaults() {
        let config = MqttConfig::default();
        assert_eq!(config.broker_host, "localhost");
        assert_eq!(config.broker_port, 1883);
        assert!(config.client_id.is_empty());
        assert_eq!(config.base_topic, "panel");
        assert_eq!(config.keep_alive_secs, 30);
        assert_eq!(config.reconnect_backoff_secs, 3);
    }

    #[test]
    fn should_deserialize_from_toml() {
        let toml = r#"
            broker_host = "mqtt.example.com"
            broker_port = 8883
            client_id = "panel-hallway"
            username = "panel"
            password = "secret"
            base_topic = "home"
            keep_alive_secs = 60
            reconnect_backoff_secs = 5
        "#;
        let config: MqttConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.broker_host, "mqtt.example.com");
        assert_eq!(config.broker_port, 8883);
        assert_eq!(config.client_id, "panel-hallway");
        assert_eq!(config.username, "panel");
        assert_eq!(config.base_topic, "home");
        assert_eq!(config.reconnect_backoff_secs, 5);
    }

    #[test]
    fn should_use_defaults_for_missing_fields() {
        let config: MqttConfig = toml::from_str(r#"broker_host = "192.168.1.100""#).unwrap();
        assert_eq!(config.broker_host, "192.168.1.100");
        assert_eq!(config.broker_port, 1883);
        assert_eq!(config.base_topic, "panel");
    }

    #[test]
    fn should_build_topics_under_base_prefix() {
        let config = MqttConfig {
            base_topic: "ha".to_string(),
            ..MqttConfig::default()
        };
        assert_eq!(config.state_topic(&EntityId::new("switch.k1")), "ha/state/switch.k1");
        assert_eq!(config.toggle_topic(), "ha/cmd/toggle");
        assert_eq!(config.status_topic(), "ha/ui/status");
    }

    #[test]
    fn should_extract_entity_id_from_state_topic() {
        let config = MqttConfig::default();
        assert_eq!(
            config.entity_from_state_topic("panel/state/switch.k1"),
            Some("switch.k1")
        );
        assert_eq!(config.entity_from_state_topic("panel/cmd/toggle"), None);
        assert_eq!(config.entity_from_state_topic("panel/state/"), None);
        assert_eq!(config.entity_from_state_topic("other/state/switch.k1"), None);
    }
}
