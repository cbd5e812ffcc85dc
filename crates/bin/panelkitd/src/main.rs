//! # panelkitd — panel connectivity daemon
//!
//! Composition root that wires the core together and runs it.
//!
//! ## Responsibilities
//! - Parse configuration (TOML file, env overrides)
//! - Construct the event bus, the state store and its actor
//! - Bring up the link manager over the radio driver
//! - Start the broker transport and route its pushes into the store
//! - Bootstrap the registry over HTTP, then mirror per-entity state topics
//! - Start the weather poll, the input router and the toggle controller
//! - Run until SIGINT
//!
//! ## Dependency rule
//! This is the only crate that depends on every other crate. It is the
//! wiring layer — no domain logic belongs here.

mod config;

use std::sync::Arc;
use std::time::Duration;

use panelkit_adapter_http::{CancelFlag, HubClient};
use panelkit_adapter_mqtt::MqttTransport;
use panelkit_adapter_virtual::{VirtualNetwork, VirtualRadio};
use panelkit_app::event_bus::EventBus;
use panelkit_app::input::InputRouter;
use panelkit_app::link::LinkManager;
use panelkit_app::store::{Mutation, StateStore, SubscriptionKey};
use panelkit_app::toggle::ToggleController;
use panelkit_domain::entity::EntityId;
use panelkit_domain::event::Event;
use panelkit_domain::time::monotonic_us;

use config::Config;

/// Signal strength the virtual radio reports for configured networks.
const VIRTUAL_SIGNAL_DBM: i32 = -45;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&config.logging.filter))
        .init();

    let bus = EventBus::new(64);
    let store = StateStore::new();
    let (store_handle, store_actor) = store.actor(32);
    tokio::spawn(store_actor.run());

    // Radio + link manager. The virtual radio stands in for the platform
    // driver on bench builds; device builds substitute the real one behind
    // the same port.
    let radio = Arc::new(VirtualRadio::new(
        config
            .link
            .networks
            .iter()
            .map(|net| VirtualNetwork {
                ssid: net.ssid.clone(),
                signal_dbm: VIRTUAL_SIGNAL_DBM,
                credential: net.password.clone(),
            })
            .collect(),
    ));
    let link = Arc::new(LinkManager::new(
        radio,
        config.known_networks(),
        config.link.min_signal_dbm,
        Duration::from_secs(config.link.rescan_interval_secs),
    ));
    Arc::clone(&link).spawn_monitor();
    if !link.wait_for_address(Duration::from_secs(15)).await {
        tracing::warn!("starting without link; the monitor keeps retrying");
    }

    // Registry changes fan out to the bus as entity-state events.
    {
        let bus = bus.clone();
        store.subscribe(SubscriptionKey::Any, move |entity| {
            bus.publish(Event::EntityStateChanged {
                entity_id: entity.id.clone(),
                timestamp_us: monotonic_us(),
            });
        });
    }

    // Broker transport: state pushes and connectivity edges feed the store
    // actor; connectivity also lands on the bus for the UI.
    let transport = Arc::new(MqttTransport::new(config.mqtt.clone()));
    {
        let handle = store_handle.clone();
        let mqtt = config.mqtt.clone();
        transport.set_message_handler(move |topic, payload| {
            let Some(id) = mqtt.entity_from_state_topic(topic) else {
                return;
            };
            let value = String::from_utf8_lossy(payload).trim().to_string();
            handle.enqueue(Mutation::EntityState {
                entity_id: EntityId::new(id),
                value,
            });
        });
    }
    {
        let handle = store_handle.clone();
        let bus = bus.clone();
        transport.set_connection_handler(move |connected| {
            handle.enqueue(Mutation::ConnectivityChanged(connected));
            bus.publish(Event::ConnectivityChanged {
                connected,
                timestamp_us: monotonic_us(),
            });
        });
    }
    transport.start()?;

    // Bootstrap the registry in the background, then mirror every entity's
    // state topic. The cancel flag interrupts the retry loop on shutdown.
    let hub = Arc::new(HubClient::new(config.http.clone())?);
    let cancel = CancelFlag::new();
    {
        let hub = Arc::clone(&hub);
        let store = store.clone();
        let transport = Arc::clone(&transport);
        let cancel = cancel.clone();
        tokio::spawn(async move {
            match hub.bootstrap(&store, &cancel).await {
                Ok(stats) => tracing::info!(
                    areas = stats.areas,
                    entities = stats.entities,
                    "registry ready"
                ),
                Err(err) => {
                    tracing::warn!(error = %err, "bootstrap failed, starting with empty registry");
                    return;
                }
            }
            for entity in store.entities() {
                if let Err(err) = transport.subscribe_entity_state(&entity.id).await {
                    tracing::warn!(entity_id = %entity.id, error = %err, "state subscription failed");
                }
            }
        });
    }

    Arc::clone(&hub).spawn_weather_poll(store.clone(), link.handle());
    InputRouter::attach(&bus, store.clone());
    ToggleController::spawn(&bus, Arc::clone(&transport), link.handle());

    tracing::info!("panelkitd running");
    tokio::signal::ctrl_c().await?;
    cancel.cancel();
    tracing::info!("shutting down");
    Ok(())
}
