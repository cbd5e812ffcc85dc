//! Transport port — the outbound command capability of the broker client.

use std::future::Future;
use std::sync::Arc;

use panelkit_domain::entity::EntityId;
use panelkit_domain::error::PanelError;

/// Publishes commands toward the hub through the broker session.
pub trait CommandTransport: Send + Sync {
    /// Publish a toggle command for `entity_id`.
    ///
    /// Resolving `Ok` means the command was handed to the broker session;
    /// the resulting entity state change arrives asynchronously as a state
    /// push, not as a return value.
    fn toggle(&self, entity_id: &EntityId) -> impl Future<Output = Result<(), PanelError>> + Send;
}

impl<T: CommandTransport> CommandTransport for Arc<T> {
    fn toggle(&self, entity_id: &EntityId) -> impl Future<Output = Result<(), PanelError>> + Send {
        (**self).toggle(entity_id)
    }
}
