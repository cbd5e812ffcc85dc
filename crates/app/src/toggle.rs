//! Single-flight toggle command orchestration.
//!
//! Consumes `ToggleRequested` events, dispatches at most one command at a
//! time through the transport port and publishes exactly one `ToggleResult`
//! per accepted request. A second request while one is pending is rejected,
//! not queued; rapid repeats inside the debounce window are suppressed even
//! when nothing is pending. Failed toggles are never retried — the outcome
//! event re-enables the UI and a fresh user action starts over.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use panelkit_domain::entity::EntityId;
use panelkit_domain::event::{Event, EventKind};
use panelkit_domain::time::monotonic_us;

use crate::event_bus::EventBus;
use crate::ports::link::LinkStatus;
use crate::ports::transport::CommandTransport;

/// Repeated requests inside this window are dropped (double-firing physical
/// controls).
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(700);

/// How long a dispatched command may run before it is reported as failed.
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

/// Serializes user toggle intents into single-flight transport commands.
pub struct ToggleController;

impl ToggleController {
    /// Wire the controller onto `bus` and spawn its executor task.
    ///
    /// Requests flow `Idle → Dispatching → AwaitingResult → Idle`; the
    /// pending token spans the last two phases and is the single-flight
    /// guard.
    pub fn spawn<T, L>(bus: &EventBus, transport: T, link: L) -> JoinHandle<()>
    where
        T: CommandTransport + Clone + 'static,
        L: LinkStatus + Clone + 'static,
    {
        let (tx, rx) = mpsc::channel::<EntityId>(8);
        bus.on(EventKind::ToggleRequested, move |event| {
            let Event::ToggleRequested { entity_id, .. } = event else {
                return;
            };
            // Only non-empty ids ever reach the executor.
            if entity_id.is_empty() {
                tracing::warn!("ignoring toggle request with empty entity id");
                return;
            }
            if tx.try_send(entity_id.clone()).is_err() {
                tracing::warn!(%entity_id, "toggle request queue full, dropping request");
            }
        });

        tokio::spawn(Self::run(rx, bus.clone(), transport, link))
    }

    async fn run<T, L>(
        mut rx: mpsc::Receiver<EntityId>,
        bus: EventBus,
        transport: T,
        link: L,
    ) where
        T: CommandTransport + Clone + 'static,
        L: LinkStatus + Clone + 'static,
    {
        let pending = Arc::new(AtomicBool::new(false));
        let debounce_us = i64::try_from(DEBOUNCE_WINDOW.as_micros()).unwrap_or(i64::MAX);
        let mut last_dispatch_us = -debounce_us;

        while let Some(entity_id) = rx.recv().await {
            if pending.load(Ordering::SeqCst) {
                tracing::warn!(%entity_id, "toggle already in flight, rejecting request");
                continue;
            }
            let now_us = monotonic_us();
            if now_us - last_dispatch_us < debounce_us {
                tracing::debug!(%entity_id, "toggle request inside debounce window, dropping");
                continue;
            }
            last_dispatch_us = now_us;
            pending.store(true, Ordering::SeqCst);

            let bus = bus.clone();
            let transport = transport.clone();
            let link = link.clone();
            let pending = Arc::clone(&pending);
            tokio::spawn(async move {
                let success = Self::execute(&transport, &link, &entity_id).await;
                bus.publish(Event::ToggleResult {
                    entity_id,
                    success,
                    timestamp_us: monotonic_us(),
                });
                pending.store(false, Ordering::SeqCst);
            });
        }
    }

    async fn execute<T, L>(transport: &T, link: &L, entity_id: &EntityId) -> bool
    where
        T: CommandTransport,
        L: LinkStatus,
    {
        if !link.is_connected() {
            tracing::warn!(%entity_id, "link down, failing toggle without dispatch");
            return false;
        }
        match tokio::time::timeout(COMMAND_TIMEOUT, transport.toggle(entity_id)).await {
            Ok(Ok(())) => true,
            Ok(Err(err)) => {
                tracing::warn!(%entity_id, error = %err, "toggle dispatch failed");
                false
            }
            Err(_) => {
                tracing::warn!(%entity_id, "toggle timed out");
                false
            }
        }
    }
}
