//! End-to-end smoke tests for the wired panel core.
//!
//! Each test assembles the real bus, store, link manager and toggle
//! controller over the virtual radio and a recording fake transport — no
//! network, no broker. The HTTP and MQTT edges have their own adapter tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;

use panelkit_adapter_virtual::{VirtualNetwork, VirtualRadio};
use panelkit_app::event_bus::EventBus;
use panelkit_app::input::{InputRouter, codes};
use panelkit_app::link::{KnownNetwork, LinkManager};
use panelkit_app::ports::LinkStatus;
use panelkit_app::ports::transport::CommandTransport;
use panelkit_app::store::{Mutation, StateStore, SubscriptionKey};
use panelkit_app::toggle::ToggleController;
use panelkit_domain::entity::EntityId;
use panelkit_domain::error::PanelError;
use panelkit_domain::event::{Event, EventKind};
use panelkit_domain::time::monotonic_us;

const BOOTSTRAP_CSV: &str = "AREA_ID,AREA_NAME,ENTITY_ID,ENTITY_NAME,STATE\n\
                             a1,Kitchen,switch.k1,Light,off\n\
                             a2,Bedroom,light.b1,Lamp,off\n";

#[derive(Clone, Default)]
struct RecordingTransport {
    toggles: Arc<Mutex<Vec<String>>>,
}

impl RecordingTransport {
    fn toggled(&self) -> Vec<String> {
        self.toggles.lock().unwrap().clone()
    }
}

impl CommandTransport for RecordingTransport {
    async fn toggle(&self, entity_id: &EntityId) -> Result<(), PanelError> {
        self.toggles.lock().unwrap().push(entity_id.to_string());
        Ok(())
    }
}

struct Panel {
    bus: EventBus,
    store: StateStore,
    link: Arc<LinkManager<VirtualRadio>>,
    transport: RecordingTransport,
    radio: Arc<VirtualRadio>,
}

fn known(ssid: &str) -> (VirtualNetwork, KnownNetwork) {
    (
        VirtualNetwork {
            ssid: ssid.to_string(),
            signal_dbm: -45,
            credential: "secret".to_string(),
        },
        KnownNetwork {
            ssid: ssid.to_string(),
            credential: "secret".to_string(),
        },
    )
}

/// Assemble the full stack; with `with_network` the link comes up, without
/// it the link stays down forever.
fn panel(with_network: bool) -> Panel {
    let (visible, allowed) = known("home");
    let radio = Arc::new(VirtualRadio::new(if with_network {
        vec![visible]
    } else {
        Vec::new()
    }));
    let link = Arc::new(LinkManager::new(
        Arc::clone(&radio),
        vec![allowed],
        -85,
        Duration::from_millis(50),
    ));
    Arc::clone(&link).spawn_monitor();

    let bus = EventBus::new(64);
    let store = StateStore::new();
    let transport = RecordingTransport::default();
    InputRouter::attach(&bus, store.clone());
    ToggleController::spawn(&bus, transport.clone(), link.handle());

    Panel {
        bus,
        store,
        link,
        transport,
        radio,
    }
}

fn result_sink(bus: &EventBus) -> mpsc::Receiver<(String, bool)> {
    let (tx, rx) = mpsc::channel(8);
    bus.on(EventKind::ToggleResult, move |event| {
        if let Event::ToggleResult {
            entity_id, success, ..
        } = event
        {
            let _ = tx.try_send((entity_id.to_string(), *success));
        }
    });
    rx
}

#[tokio::test]
async fn should_toggle_selected_entity_from_button_press() {
    let panel = panel(true);
    panel.store.init_from_csv(BOOTSTRAP_CSV).unwrap();
    let mut results = result_sink(&panel.bus);

    assert!(panel.link.wait_for_address(Duration::from_secs(5)).await);

    panel.bus.publish(Event::ButtonPressed {
        code: codes::BUTTON_SINGLE_CLICK,
        timestamp_us: monotonic_us(),
    });

    let (entity_id, success) = results.recv().await.unwrap();
    assert_eq!(entity_id, "switch.k1");
    assert!(success);
    assert_eq!(panel.transport.toggled(), vec!["switch.k1"]);
}

#[tokio::test]
async fn should_fail_toggle_without_link_and_never_touch_transport() {
    let panel = panel(false);
    panel.store.init_from_csv(BOOTSTRAP_CSV).unwrap();
    let mut results = result_sink(&panel.bus);

    panel.bus.publish(Event::ToggleRequested {
        entity_id: EntityId::new("switch.k1"),
        timestamp_us: monotonic_us(),
    });

    let (entity_id, success) = results.recv().await.unwrap();
    assert_eq!(entity_id, "switch.k1");
    assert!(!success);
    assert!(panel.transport.toggled().is_empty());
}

#[tokio::test]
async fn should_fan_state_pushes_out_to_store_and_bus() {
    let panel = panel(true);
    panel.store.init_from_csv(BOOTSTRAP_CSV).unwrap();

    // The same wiring panelkitd uses: registry changes become bus events.
    {
        let bus = panel.bus.clone();
        panel.store.subscribe(SubscriptionKey::Any, move |entity| {
            bus.publish(Event::EntityStateChanged {
                entity_id: entity.id.clone(),
                timestamp_us: monotonic_us(),
            });
        });
    }
    let (tx, mut changes) = mpsc::channel(8);
    panel.bus.on(EventKind::EntityStateChanged, move |event| {
        let _ = tx.try_send(event.clone());
    });

    let (handle, actor) = panel.store.actor(8);
    tokio::spawn(actor.run());
    handle.enqueue(Mutation::EntityState {
        entity_id: EntityId::new("switch.k1"),
        value: "on".to_string(),
    });
    // Same value again: the equality gate must swallow it.
    handle.enqueue(Mutation::EntityState {
        entity_id: EntityId::new("switch.k1"),
        value: "on".to_string(),
    });

    let Event::EntityStateChanged { entity_id, .. } = changes.recv().await.unwrap() else {
        panic!("expected state change event");
    };
    assert_eq!(entity_id.as_str(), "switch.k1");
    assert_eq!(
        panel.store.find_entity(&entity_id).unwrap().state,
        "on"
    );

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(changes.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn should_recover_link_after_loss() {
    let panel = panel(true);
    let probe = panel.link.handle();

    assert!(panel.link.wait_for_address(Duration::from_secs(5)).await);

    panel.radio.drop_link();
    for _ in 0..1000 {
        if !probe.is_connected() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    for _ in 0..1000 {
        if probe.is_connected() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("link did not come back");
}
