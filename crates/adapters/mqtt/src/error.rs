//! MQTT adapter error types.

use panelkit_domain::error::PanelError;

/// Errors specific to the MQTT transport.
#[derive(Debug, thiserror::Error)]
pub enum MqttError {
    /// The transport has not been started yet.
    #[error("mqtt transport not started")]
    NotStarted,

    /// The rumqttc client rejected a request.
    #[error("mqtt client error")]
    Client(#[source] rumqttc::ClientError),
}

impl From<MqttError> for PanelError {
    fn from(err: MqttError) -> Self {
        match err {
            MqttError::NotStarted => PanelError::InvalidState("mqtt transport not started"),
            MqttError::Client(_) => PanelError::Unavailable("broker request failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_display_not_started_error() {
        assert_eq!(MqttError::NotStarted.to_string(), "mqtt transport not started");
    }

    #[test]
    fn should_convert_not_started_to_invalid_state() {
        let err: PanelError = MqttError::NotStarted.into();
        assert!(matches!(err, PanelError::InvalidState(_)));
    }
}
