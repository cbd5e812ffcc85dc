//! Authoritative in-memory registry of areas, entities, weather and clock.
//!
//! The registry is owned by a [`StateStore`] and mutated through a
//! single-writer actor: producers enqueue typed [`Mutation`]s onto a bounded
//! queue and one task applies them. Readers always get point-in-time copies,
//! never live references. Observer callbacks run outside the registry lock,
//! so a callback may call back into the store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;

use panelkit_domain::area::Area;
use panelkit_domain::clock::ClockState;
use panelkit_domain::entity::{Entity, EntityId};
use panelkit_domain::error::PanelError;
use panelkit_domain::weather::WeatherState;

const BOOTSTRAP_HEADER: [&str; 5] = ["AREA_ID", "AREA_NAME", "ENTITY_ID", "ENTITY_NAME", "STATE"];

type Observer = Arc<dyn Fn(&Entity) + Send + Sync>;

/// What a subscription listens on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionKey {
    /// A single entity id.
    Entity(EntityId),
    /// Every entity state change.
    Any,
}

/// Outcome of a state write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateWrite {
    /// The value changed and observers were notified.
    Updated,
    /// The value was already current; nobody was notified.
    Unchanged,
}

/// Counters from one bootstrap parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BootstrapStats {
    pub areas: usize,
    pub entities: usize,
    /// Malformed, duplicate-id or empty-id rows that were skipped.
    pub skipped_rows: usize,
}

/// Typed mutation requests accepted by the store actor.
#[derive(Debug, Clone)]
pub enum Mutation {
    /// Broker connectivity edge.
    ConnectivityChanged(bool),
    /// Incremental state push for one entity.
    EntityState { entity_id: EntityId, value: String },
    /// UI selection moved to this registry index.
    SelectedChanged(usize),
}

struct Subscription {
    id: u64,
    key: SubscriptionKey,
    observer: Observer,
}

#[derive(Default)]
struct Registry {
    areas: Vec<Area>,
    entities: Vec<Entity>,
    area_index: HashMap<String, usize>,
    entity_index: HashMap<EntityId, usize>,
    weather: WeatherState,
    clock: ClockState,
    connected: bool,
    selected: Option<usize>,
    subscriptions: Vec<Subscription>,
    next_subscription_id: u64,
}

/// The authoritative state registry.
///
/// Cheap to clone; clones share the same registry. Shared-context mutations
/// normally arrive through the actor queue (see [`StateStore::actor`]); the
/// mutating methods remain available for the actor itself and for
/// startup-path producers like the bootstrap parser.
#[derive(Clone, Default)]
pub struct StateStore {
    inner: Arc<Mutex<Registry>>,
}

impl StateStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wipe and rebuild the registry from bootstrap CSV.
    ///
    /// The expected header (matched case-insensitively) is
    /// `AREA_ID,AREA_NAME,ENTITY_ID,ENTITY_NAME,STATE`. Rows with the wrong
    /// column count, an empty entity id, or an already-seen entity id are
    /// skipped and counted, never fatal. Unknown `area_id`s create their
    /// area on first sight, so entities never dangle. The rebuild happens
    /// under the write lock — readers see either the old registry or the
    /// complete new one.
    ///
    /// # Errors
    ///
    /// Returns [`PanelError::InvalidArgument`] for an empty payload or an
    /// unexpected header; the registry is left empty in both cases.
    pub fn init_from_csv(&self, text: &str) -> Result<BootstrapStats, PanelError> {
        let mut reg = self.lock();
        reg.areas.clear();
        reg.entities.clear();
        reg.area_index.clear();
        reg.entity_index.clear();
        reg.selected = None;

        let mut lines = text.lines().map(str::trim).filter(|line| !line.is_empty());
        let Some(header) = lines.next() else {
            tracing::warn!("bootstrap payload is empty");
            return Err(PanelError::InvalidArgument("empty bootstrap payload"));
        };
        let valid_header = split_csv_row(header).is_some_and(|fields| {
            fields
                .iter()
                .zip(BOOTSTRAP_HEADER)
                .all(|(field, expected)| field.eq_ignore_ascii_case(expected))
        });
        if !valid_header {
            tracing::warn!(header, "unexpected bootstrap header");
            return Err(PanelError::InvalidArgument("unexpected bootstrap header"));
        }

        let mut skipped = 0usize;
        for line in lines {
            let Some([area_id, area_name, entity_id, entity_name, state]) = split_csv_row(line)
            else {
                tracing::warn!(line, "skipping malformed bootstrap row");
                skipped += 1;
                continue;
            };
            if entity_id.is_empty() {
                skipped += 1;
                continue;
            }
            let entity_id = EntityId::new(entity_id);
            if reg.entity_index.contains_key(&entity_id) {
                tracing::warn!(%entity_id, "skipping duplicate entity id in bootstrap");
                skipped += 1;
                continue;
            }

            if !reg.area_index.contains_key(area_id) {
                let index = reg.areas.len();
                reg.areas.push(Area {
                    id: area_id.to_string(),
                    name: area_name.to_string(),
                });
                reg.area_index.insert(area_id.to_string(), index);
            }

            let index = reg.entities.len();
            reg.entities.push(Entity {
                id: entity_id.clone(),
                name: entity_name.to_string(),
                state: state.to_string(),
                area_id: area_id.to_string(),
            });
            reg.entity_index.insert(entity_id, index);
        }

        if !reg.entities.is_empty() {
            reg.selected = Some(0);
        }
        let stats = BootstrapStats {
            areas: reg.areas.len(),
            entities: reg.entities.len(),
            skipped_rows: skipped,
        };
        tracing::info!(
            areas = stats.areas,
            entities = stats.entities,
            skipped = stats.skipped_rows,
            "registry rebuilt from bootstrap"
        );
        Ok(stats)
    }

    /// Apply a state push for one entity.
    ///
    /// Equality-gated: writing the current value is a successful no-op with
    /// zero notifications. On a real change, every matching observer is
    /// invoked outside the registry lock with a copy of the updated entity.
    ///
    /// # Errors
    ///
    /// Returns [`PanelError::NotFound`] when `id` is not in the registry.
    pub fn set_entity_state(&self, id: &EntityId, value: &str) -> Result<StateWrite, PanelError> {
        let (entity, observers) = {
            let mut reg = self.lock();
            let Some(&index) = reg.entity_index.get(id) else {
                return Err(PanelError::NotFound {
                    what: "entity",
                    id: id.to_string(),
                });
            };
            if reg.entities[index].state == value {
                return Ok(StateWrite::Unchanged);
            }
            reg.entities[index].state = value.to_string();
            let entity = reg.entities[index].clone();
            let observers: Vec<Observer> = reg
                .subscriptions
                .iter()
                .filter(|sub| match &sub.key {
                    SubscriptionKey::Any => true,
                    SubscriptionKey::Entity(key) => key == id,
                })
                .map(|sub| Arc::clone(&sub.observer))
                .collect();
            (entity, observers)
        };

        for observer in &observers {
            observer(&entity);
        }
        Ok(StateWrite::Updated)
    }

    /// Register `observer` for state changes matching `key`.
    ///
    /// Subscription ids are strictly increasing and never reused for the
    /// lifetime of the process, so unsubscribing a stale id is always a safe
    /// no-op.
    pub fn subscribe(
        &self,
        key: SubscriptionKey,
        observer: impl Fn(&Entity) + Send + Sync + 'static,
    ) -> u64 {
        let mut reg = self.lock();
        reg.next_subscription_id += 1;
        let id = reg.next_subscription_id;
        reg.subscriptions.push(Subscription {
            id,
            key,
            observer: Arc::new(observer),
        });
        id
    }

    /// Remove a subscription; unknown ids are ignored.
    pub fn unsubscribe(&self, subscription_id: u64) {
        self.lock()
            .subscriptions
            .retain(|sub| sub.id != subscription_id);
    }

    /// Replace the weather snapshot (whole-value, marks it valid).
    pub fn set_weather(&self, temperature_c: f32, condition: &str) {
        self.lock().weather = WeatherState {
            temperature_c,
            condition: condition.to_string(),
            valid: true,
        };
    }

    /// Replace the clock snapshot. Range clamping happens in
    /// [`ClockState::from_sync`]; the store keeps what it is given.
    pub fn set_clock(&self, clock: ClockState) {
        self.lock().clock = clock;
    }

    pub fn set_connected(&self, connected: bool) {
        self.lock().connected = connected;
    }

    /// Move the UI selection; saturates into registry bounds and clears when
    /// the registry is empty.
    pub fn set_selected(&self, index: usize) {
        let mut reg = self.lock();
        reg.selected = if reg.entities.is_empty() {
            None
        } else {
            Some(index.min(reg.entities.len() - 1))
        };
    }

    /// Point-in-time copy of the area table.
    #[must_use]
    pub fn areas(&self) -> Vec<Area> {
        self.lock().areas.clone()
    }

    /// Point-in-time copy of the entity table.
    #[must_use]
    pub fn entities(&self) -> Vec<Entity> {
        self.lock().entities.clone()
    }

    #[must_use]
    pub fn find_entity(&self, id: &EntityId) -> Option<Entity> {
        let reg = self.lock();
        reg.entity_index.get(id).map(|&index| reg.entities[index].clone())
    }

    #[must_use]
    pub fn weather(&self) -> WeatherState {
        self.lock().weather.clone()
    }

    #[must_use]
    pub fn clock(&self) -> ClockState {
        self.lock().clock
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.lock().connected
    }

    /// Entity currently highlighted by the UI, if any.
    #[must_use]
    pub fn selected_entity(&self) -> Option<Entity> {
        let reg = self.lock();
        reg.selected.map(|index| reg.entities[index].clone())
    }

    /// Split off the single-writer side: shared-context mutations funnel
    /// through the returned handle's bounded queue and are applied by the
    /// actor, which the caller runs on its own task.
    #[must_use]
    pub fn actor(&self, capacity: usize) -> (StoreHandle, StoreActor) {
        let (tx, rx) = mpsc::channel(capacity);
        (
            StoreHandle {
                tx,
                dropped: Arc::new(AtomicU64::new(0)),
            },
            StoreActor {
                store: self.clone(),
                rx,
            },
        )
    }

    fn apply(&self, mutation: Mutation) {
        match mutation {
            Mutation::ConnectivityChanged(connected) => self.set_connected(connected),
            Mutation::EntityState { entity_id, value } => {
                if let Err(err) = self.set_entity_state(&entity_id, &value) {
                    tracing::debug!(%entity_id, error = %err, "dropping state push");
                }
            }
            Mutation::SelectedChanged(index) => self.set_selected(index),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Cloneable producer side of the mutation queue.
#[derive(Clone)]
pub struct StoreHandle {
    tx: mpsc::Sender<Mutation>,
    dropped: Arc<AtomicU64>,
}

impl StoreHandle {
    /// Enqueue without blocking; a full queue drops the mutation (counted).
    pub fn enqueue(&self, mutation: Mutation) {
        if self.tx.try_send(mutation).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            tracing::warn!("store mutation queue full, dropping mutation");
        }
    }

    /// Mutations dropped because the queue was full.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Consumer side of the mutation queue.
pub struct StoreActor {
    store: StateStore,
    rx: mpsc::Receiver<Mutation>,
}

impl StoreActor {
    /// Apply mutations in arrival order until every handle is dropped.
    pub async fn run(mut self) {
        while let Some(mutation) = self.rx.recv().await {
            self.store.apply(mutation);
        }
    }
}

fn split_csv_row(line: &str) -> Option<[&str; 5]> {
    let mut fields = line.split(',').map(str::trim);
    let row = [
        fields.next()?,
        fields.next()?,
        fields.next()?,
        fields.next()?,
        fields.next()?,
    ];
    if fields.next().is_some() {
        return None;
    }
    Some(row)
}
