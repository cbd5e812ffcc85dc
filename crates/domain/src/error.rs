//! Error taxonomy shared across the workspace.

/// Errors that cross panelkit component boundaries.
///
/// Transient network failures are retried inside the owning component and
/// never escalate through this type; command outcomes and connectivity loss
/// reach observers as ordinary events, not errors. What remains is the small
/// closed set below.
#[derive(Debug, thiserror::Error)]
pub enum PanelError {
    /// Unknown entity or subscription id.
    #[error("{what} '{id}' not found")]
    NotFound { what: &'static str, id: String },

    /// Empty or malformed input.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// Operation attempted before start/connect.
    #[error("invalid state: {0}")]
    InvalidState(&'static str),

    /// A wait or request exceeded its deadline.
    #[error("timed out waiting for {0}")]
    Timeout(&'static str),

    /// No link, or no qualifying access point in range.
    #[error("unavailable: {0}")]
    Unavailable(&'static str),

    /// Every configured remote host was tried and failed.
    #[error("unreachable: {0}")]
    Unreachable(String),
}
