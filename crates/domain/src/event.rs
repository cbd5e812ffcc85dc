//! Application events — the closed set of notifications exchanged on the bus.

use serde::{Deserialize, Serialize};

use crate::entity::EntityId;

/// Direction of a touch swipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwipeDirection {
    Left,
    Right,
}

/// A single notification on the event bus.
///
/// Events are immutable values, copied at publish time; every variant carries
/// the monotonic timestamp (µs) of the moment it was created. They live from
/// the publish call until the last handler returns — nothing is persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    /// Rotary knob moved; `code` is the raw step code from the encoder driver.
    KnobTurned { code: i32, timestamp_us: i64 },
    /// Physical button activity; `code` is the raw code from the button driver.
    ButtonPressed { code: i32, timestamp_us: i64 },
    /// Touch swipe recognized by the input surface.
    GestureSwiped {
        direction: SwipeDirection,
        timestamp_us: i64,
    },
    /// Move the room selection by `delta` (wraps at the ends in the UI).
    NavigateRoomRequested { delta: i32, timestamp_us: i64 },
    /// Any user activity; wakes the display out of the screensaver.
    WakeRequested { timestamp_us: i64 },
    /// Toggle whatever entity the UI currently highlights.
    ToggleCurrentEntityRequested { timestamp_us: i64 },
    /// The registry applied a new state for `entity_id`.
    EntityStateChanged {
        entity_id: EntityId,
        timestamp_us: i64,
    },
    /// User intent to toggle a specific entity.
    ToggleRequested {
        entity_id: EntityId,
        timestamp_us: i64,
    },
    /// Outcome of a dispatched toggle command.
    ToggleResult {
        entity_id: EntityId,
        success: bool,
        timestamp_us: i64,
    },
    /// Broker connectivity edge.
    ConnectivityChanged { connected: bool, timestamp_us: i64 },
}

/// Discriminant used for handler registration on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    KnobTurned,
    ButtonPressed,
    GestureSwiped,
    NavigateRoomRequested,
    WakeRequested,
    ToggleCurrentEntityRequested,
    EntityStateChanged,
    ToggleRequested,
    ToggleResult,
    ConnectivityChanged,
}

impl Event {
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::KnobTurned { .. } => EventKind::KnobTurned,
            Self::ButtonPressed { .. } => EventKind::ButtonPressed,
            Self::GestureSwiped { .. } => EventKind::GestureSwiped,
            Self::NavigateRoomRequested { .. } => EventKind::NavigateRoomRequested,
            Self::WakeRequested { .. } => EventKind::WakeRequested,
            Self::ToggleCurrentEntityRequested { .. } => EventKind::ToggleCurrentEntityRequested,
            Self::EntityStateChanged { .. } => EventKind::EntityStateChanged,
            Self::ToggleRequested { .. } => EventKind::ToggleRequested,
            Self::ToggleResult { .. } => EventKind::ToggleResult,
            Self::ConnectivityChanged { .. } => EventKind::ConnectivityChanged,
        }
    }

    /// Monotonic creation time, µs.
    #[must_use]
    pub fn timestamp_us(&self) -> i64 {
        match self {
            Self::KnobTurned { timestamp_us, .. }
            | Self::ButtonPressed { timestamp_us, .. }
            | Self::GestureSwiped { timestamp_us, .. }
            | Self::NavigateRoomRequested { timestamp_us, .. }
            | Self::WakeRequested { timestamp_us }
            | Self::ToggleCurrentEntityRequested { timestamp_us }
            | Self::EntityStateChanged { timestamp_us, .. }
            | Self::ToggleRequested { timestamp_us, .. }
            | Self::ToggleResult { timestamp_us, .. }
            | Self::ConnectivityChanged { timestamp_us, .. } => *timestamp_us,
        }
    }
}
