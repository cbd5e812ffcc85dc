//! Raw input events mapped to semantic intents.
//!
//! The encoder/button/touch drivers publish raw events onto the bus; this
//! router turns them into wake, navigation and toggle intents, and resolves
//! the current selection when a toggle-current intent arrives. The drivers
//! themselves (debouncing included) are platform collaborators.

use panelkit_domain::event::{Event, EventKind, SwipeDirection};
use panelkit_domain::time::monotonic_us;

use crate::event_bus::EventBus;
use crate::store::StateStore;

/// Raw driver codes understood by the router.
pub mod codes {
    /// Encoder stepped clockwise.
    pub const KNOB_RIGHT: i32 = 1;
    /// Encoder stepped counter-clockwise.
    pub const KNOB_LEFT: i32 = 2;
    /// Button released after a short press.
    pub const BUTTON_SINGLE_CLICK: i32 = 1;
}

/// Maps raw input events to semantic events on the same bus.
pub struct InputRouter;

impl InputRouter {
    /// Register the mapping handlers on `bus`.
    ///
    /// Every raw input first requests a wake. Knob steps and swipes navigate
    /// rooms; a single click toggles whatever entity the UI highlights,
    /// resolved through `store` at the moment the intent fires.
    pub fn attach(bus: &EventBus, store: StateStore) {
        let knob = bus.clone();
        bus.on(EventKind::KnobTurned, move |event| {
            let Event::KnobTurned { code, timestamp_us } = event else {
                return;
            };
            knob.publish(Event::WakeRequested {
                timestamp_us: *timestamp_us,
            });
            let delta = match *code {
                codes::KNOB_RIGHT => 1,
                codes::KNOB_LEFT => -1,
                _ => return,
            };
            knob.publish(Event::NavigateRoomRequested {
                delta,
                timestamp_us: *timestamp_us,
            });
        });

        let button = bus.clone();
        bus.on(EventKind::ButtonPressed, move |event| {
            let Event::ButtonPressed { code, timestamp_us } = event else {
                return;
            };
            button.publish(Event::WakeRequested {
                timestamp_us: *timestamp_us,
            });
            if *code == codes::BUTTON_SINGLE_CLICK {
                button.publish(Event::ToggleCurrentEntityRequested {
                    timestamp_us: *timestamp_us,
                });
            }
        });

        let gesture = bus.clone();
        bus.on(EventKind::GestureSwiped, move |event| {
            let Event::GestureSwiped {
                direction,
                timestamp_us,
            } = event
            else {
                return;
            };
            gesture.publish(Event::WakeRequested {
                timestamp_us: *timestamp_us,
            });
            let delta = match direction {
                SwipeDirection::Left => 1,
                SwipeDirection::Right => -1,
            };
            gesture.publish(Event::NavigateRoomRequested {
                delta,
                timestamp_us: *timestamp_us,
            });
        });

        let resolve = bus.clone();
        bus.on(EventKind::ToggleCurrentEntityRequested, move |_| {
            let Some(entity) = store.selected_entity() else {
                tracing::debug!("toggle-current intent with nothing selected");
                return;
            };
            resolve.publish(Event::ToggleRequested {
                entity_id: entity.id,
                timestamp_us: monotonic_us(),
            });
        });
    }
}
