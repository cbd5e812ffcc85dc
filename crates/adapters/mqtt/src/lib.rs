//! # panelkit-adapter-mqtt
//!
//! Reconnecting broker transport for the panel.
//!
//! One logical session per process: [`MqttTransport::start`] spawns the
//! rumqttc event loop, which reconnects on its own with a fixed backoff. On
//! every (re)connect the transport publishes a retained `"online"` presence
//! marker and replays all registered subscriptions in registration order;
//! the broker publishes the retained `"offline"` last-will on our behalf if
//! the session dies, so the panel never has to detect its own crash.
//!
//! ## Dependency rule
//! Depends on `panelkit-app` (port traits) and `panelkit-domain` only.

pub mod config;
pub mod error;
mod subscriptions;

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, Incoming, LastWill, MqttOptions, QoS};

use panelkit_app::ports::transport::CommandTransport;
use panelkit_domain::entity::EntityId;
use panelkit_domain::error::PanelError;

pub use config::MqttConfig;
pub use error::MqttError;
pub use subscriptions::{MAX_SUBSCRIPTIONS, RecordOutcome, SubscriptionEntry, SubscriptionRegistry};

/// Longest topic accepted from the wire, in bytes. Longer topics are
/// truncated at a UTF-8 boundary before reaching the handler — a documented
/// lossy contract, never an overflow and never a rejection.
pub const MAX_TOPIC_LEN: usize = 191;

/// Called with each incoming message: bounded topic and raw payload.
pub type MessageHandler = Arc<dyn Fn(&str, &[u8]) + Send + Sync>;

/// Called on every connect (`true`) / disconnect (`false`) edge.
pub type ConnectionHandler = Arc<dyn Fn(bool) + Send + Sync>;

struct Shared {
    connected: AtomicBool,
    subs: Mutex<SubscriptionRegistry>,
    message_handler: Mutex<Option<MessageHandler>>,
    connection_handler: Mutex<Option<ConnectionHandler>>,
}

impl Shared {
    fn new() -> Self {
        Self {
            connected: AtomicBool::new(false),
            subs: Mutex::new(SubscriptionRegistry::default()),
            message_handler: Mutex::new(None),
            connection_handler: Mutex::new(None),
        }
    }

    fn lock_subs(&self) -> MutexGuard<'_, SubscriptionRegistry> {
        self.subs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn message_handler(&self) -> Option<MessageHandler> {
        self.message_handler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn connection_handler(&self) -> Option<ConnectionHandler> {
        self.connection_handler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Record the connected edge; true when the state actually changed.
    fn mark_connected(&self) -> bool {
        !self.connected.swap(true, Ordering::SeqCst)
    }

    /// Record the disconnected edge; true when the state actually changed.
    fn mark_disconnected(&self) -> bool {
        self.connected.swap(false, Ordering::SeqCst)
    }
}

/// The reconnecting broker transport.
pub struct MqttTransport {
    config: MqttConfig,
    shared: Arc<Shared>,
    client: Mutex<Option<AsyncClient>>,
}

impl MqttTransport {
    #[must_use]
    pub fn new(config: MqttConfig) -> Self {
        Self {
            config,
            shared: Arc::new(Shared::new()),
            client: Mutex::new(None),
        }
    }

    /// Start the broker session and its event-loop task.
    ///
    /// Idempotent: calling it again is a no-op success. Must be called from
    /// within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Currently infallible in practice; the signature leaves room for
    /// configuration-time failures.
    pub fn start(&self) -> Result<(), MqttError> {
        let mut slot = self.client.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return Ok(());
        }

        let client_id = if self.config.client_id.is_empty() {
            format!("panelkit-{}", uuid::Uuid::new_v4().simple())
        } else {
            self.config.client_id.clone()
        };
        let mut options = MqttOptions::new(
            client_id,
            self.config.broker_host.as_str(),
            self.config.broker_port,
        );
        options.set_keep_alive(Duration::from_secs(u64::from(self.config.keep_alive_secs)));
        if !self.config.username.is_empty() {
            options.set_credentials(
                self.config.username.as_str(),
                self.config.password.as_str(),
            );
        }
        // The broker announces our death for us.
        options.set_last_will(LastWill::new(
            self.config.status_topic(),
            "offline",
            QoS::AtLeastOnce,
            true,
        ));

        let (client, event_loop) = AsyncClient::new(options, 16);
        *slot = Some(client.clone());
        drop(slot);

        tokio::spawn(run_event_loop(
            event_loop,
            client,
            Arc::clone(&self.shared),
            self.config.clone(),
        ));
        tracing::info!(
            host = %self.config.broker_host,
            port = self.config.broker_port,
            "mqtt transport started"
        );
        Ok(())
    }

    /// True while the broker session is up.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }

    /// Publish a payload.
    ///
    /// # Errors
    ///
    /// Fails fast with [`MqttError::NotStarted`] before [`start`](Self::start);
    /// once started, a publish while disconnected is queued by the session
    /// and flushed on reconnect.
    pub async fn publish(
        &self,
        topic: &str,
        payload: &[u8],
        qos: QoS,
        retain: bool,
    ) -> Result<(), MqttError> {
        let client = self.client()?;
        client
            .publish(topic, qos, retain, payload.to_vec())
            .await
            .map_err(MqttError::Client)
    }

    /// Record a subscription and, when connected, issue it immediately.
    ///
    /// The registry is bounded: past [`MAX_SUBSCRIPTIONS`] the subscription
    /// is logged and ignored from then on, but the call still succeeds.
    /// Subscriptions recorded while disconnected are issued by the replay on
    /// the next connect.
    ///
    /// # Errors
    ///
    /// [`MqttError::NotStarted`] before [`start`](Self::start), or a client
    /// error when the immediate subscribe fails.
    pub async fn subscribe(&self, topic: &str, qos: QoS) -> Result<(), MqttError> {
        let client = self.client()?;
        match self.shared.lock_subs().record(topic, qos) {
            RecordOutcome::Full => {
                tracing::warn!(topic, "subscription table full, ignoring subscription");
                return Ok(());
            }
            RecordOutcome::Duplicate => return Ok(()),
            RecordOutcome::Recorded => {}
        }
        if self.is_connected() {
            client
                .subscribe(topic, qos)
                .await
                .map_err(MqttError::Client)?;
        }
        Ok(())
    }

    /// Subscribe to the state topic of one entity.
    ///
    /// # Errors
    ///
    /// Same as [`subscribe`](Self::subscribe).
    pub async fn subscribe_entity_state(&self, entity_id: &EntityId) -> Result<(), MqttError> {
        self.subscribe(&self.config.state_topic(entity_id), QoS::AtLeastOnce)
            .await
    }

    /// Install the incoming-message handler. Replaces any previous one.
    pub fn set_message_handler(&self, handler: impl Fn(&str, &[u8]) + Send + Sync + 'static) {
        *self
            .shared
            .message_handler
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(handler));
    }

    /// Install the connectivity-edge handler. Replaces any previous one.
    pub fn set_connection_handler(&self, handler: impl Fn(bool) + Send + Sync + 'static) {
        *self
            .shared
            .connection_handler
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(handler));
    }

    fn client(&self) -> Result<AsyncClient, MqttError> {
        self.client
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(MqttError::NotStarted)
    }
}

impl CommandTransport for MqttTransport {
    fn toggle(&self, entity_id: &EntityId) -> impl Future<Output = Result<(), PanelError>> + Send {
        let client = self.client();
        let topic = self.config.toggle_topic();
        let payload = entity_id.as_str().as_bytes().to_vec();
        let entity_id = entity_id.clone();
        async move {
            let client = client?;
            client
                .publish(topic, QoS::AtLeastOnce, false, payload)
                .await
                .map_err(MqttError::Client)?;
            tracing::info!(%entity_id, "toggle command published");
            Ok(())
        }
    }
}

async fn run_event_loop(
    mut event_loop: EventLoop,
    client: AsyncClient,
    shared: Arc<Shared>,
    config: MqttConfig,
) {
    let backoff = Duration::from_secs(u64::from(config.reconnect_backoff_secs));
    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                on_connected(&client, &shared, &config).await;
            }
            Ok(Event::Incoming(Incoming::Publish(publish))) => {
                if let Some(handler) = shared.message_handler() {
                    handler(bounded_topic(&publish.topic), &publish.payload);
                }
            }
            Ok(Event::Incoming(Incoming::Disconnect)) => {
                on_disconnected(&shared, "broker closed the session");
            }
            Ok(_) => {}
            Err(err) => {
                on_disconnected(&shared, "connection error");
                tracing::warn!(error = %err, "broker connection error, retrying");
                tokio::time::sleep(backoff).await;
            }
        }
    }
}

async fn on_connected(client: &AsyncClient, shared: &Shared, config: &MqttConfig) {
    if shared.mark_connected() {
        tracing::info!("connected to broker");
    }

    // Presence first, then the subscription replay in registration order.
    if let Err(err) = client
        .publish(config.status_topic(), QoS::AtLeastOnce, true, "online")
        .await
    {
        tracing::warn!(error = %err, "failed to publish presence marker");
    }
    let entries = shared.lock_subs().entries().to_vec();
    for entry in entries {
        match client.subscribe(entry.topic.as_str(), entry.qos).await {
            Ok(()) => tracing::debug!(topic = %entry.topic, "subscription replayed"),
            Err(err) => tracing::warn!(topic = %entry.topic, error = %err, "replay subscribe failed"),
        }
    }

    if let Some(handler) = shared.connection_handler() {
        handler(true);
    }
}

fn on_disconnected(shared: &Shared, reason: &str) {
    if !shared.mark_disconnected() {
        return;
    }
    tracing::warn!(reason, "disconnected from broker");
    if let Some(handler) = shared.connection_handler() {
        handler(false);
    }
}

/// Bound an incoming topic to [`MAX_TOPIC_LEN`] bytes, cutting at a UTF-8
/// boundary.
fn bounded_topic(topic: &str) -> &str {
    if topic.len() <= MAX_TOPIC_LEN {
        return topic;
    }
    let mut cut = MAX_TOPIC_LEN;
    while !topic.is_char_boundary(cut) {
        cut -= 1;
    }
    tracing::debug!(len = topic.len(), "truncating oversized incoming topic");
    &topic[..cut]
}
