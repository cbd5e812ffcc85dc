//! Bounded registry of broker subscriptions, replayed on every reconnect.

use rumqttc::QoS;

/// Most subscriptions the registry remembers. Beyond this, new subscriptions
/// are counted and ignored — the panel subscribes to a handful of state
/// topics, so hitting the cap means something upstream is wrong.
pub const MAX_SUBSCRIPTIONS: usize = 32;

#[derive(Debug, Clone)]
pub struct SubscriptionEntry {
    pub topic: String,
    pub qos: QoS,
}

/// What happened to a [`SubscriptionRegistry::record`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Newly recorded; will be replayed on every (re)connect.
    Recorded,
    /// Already present; nothing changed.
    Duplicate,
    /// Table full; the subscription is ignored from now on.
    Full,
}

/// Subscriptions in registration order, replayed verbatim after reconnect.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    entries: Vec<SubscriptionEntry>,
    overflow: u64,
}

impl SubscriptionRegistry {
    pub fn record(&mut self, topic: &str, qos: QoS) -> RecordOutcome {
        if self.entries.iter().any(|entry| entry.topic == topic) {
            return RecordOutcome::Duplicate;
        }
        if self.entries.len() >= MAX_SUBSCRIPTIONS {
            self.overflow += 1;
            return RecordOutcome::Full;
        }
        self.entries.push(SubscriptionEntry {
            topic: topic.to_string(),
            qos,
        });
        RecordOutcome::Recorded
    }

    /// Entries in registration order.
    #[must_use]
    pub fn entries(&self) -> &[SubscriptionEntry] {
        &self.entries
    }

    /// Subscriptions that were ignored because the table was full.
    #[must_use]
    pub fn overflow(&self) -> u64 {
        self.overflow
    }
}
