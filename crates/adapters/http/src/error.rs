//! HTTP adapter error types.

use panelkit_domain::error::PanelError;

/// Errors from the hub HTTP client.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// Connection, DNS or timeout failure in the transport.
    #[error("http transport error")]
    Transport(#[source] reqwest::Error),

    /// The hub answered outside the 2xx range.
    #[error("unexpected http status {0}")]
    Status(u16),

    /// The bootstrap was cancelled between attempts.
    #[error("bootstrap cancelled")]
    Cancelled,

    /// Every attempt failed.
    #[error("all {attempts} bootstrap attempts failed")]
    Exhausted { attempts: u32 },
}

impl From<HttpError> for PanelError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::Cancelled => PanelError::InvalidState("bootstrap cancelled"),
            HttpError::Transport(ref source) if source.is_timeout() => {
                PanelError::Timeout("hub response")
            }
            HttpError::Transport(_) | HttpError::Status(_) | HttpError::Exhausted { .. } => {
                PanelError::Unreachable(err.to_string())
            }
        }
    }
}
