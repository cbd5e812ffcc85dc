//! Typed in-process event bus with a single dispatcher task.
//!
//! Producers enqueue onto a bounded queue and never block; one dispatcher
//! task delivers each event to every matching handler, sequentially, in
//! registration order. Back-pressure is drop-newest: a full queue drops the
//! incoming event and counts the drop.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;

use panelkit_domain::event::{Event, EventKind};

type Handler = Arc<dyn Fn(&Event) + Send + Sync>;

/// Handlers in global registration order; `None` matches every kind.
#[derive(Default)]
struct DispatchTable {
    entries: Vec<(Option<EventKind>, Handler)>,
}

/// Process-wide typed notification channel.
///
/// Cheap to clone; clones share the queue and dispatch table. Handlers are
/// never invoked concurrently with each other — there is exactly one
/// dispatcher task — but they run on that task, so they must not block for
/// long.
#[derive(Clone)]
pub struct EventBus {
    tx: mpsc::Sender<Event>,
    table: Arc<Mutex<DispatchTable>>,
    dropped: Arc<AtomicU64>,
}

impl EventBus {
    /// Create a bus with the given queue capacity and spawn its dispatcher.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        let table = Arc::new(Mutex::new(DispatchTable::default()));
        tokio::spawn(dispatch(rx, Arc::clone(&table)));
        Self {
            tx,
            table,
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Register a handler for one event kind.
    pub fn on(&self, kind: EventKind, handler: impl Fn(&Event) + Send + Sync + 'static) {
        self.lock_table()
            .entries
            .push((Some(kind), Arc::new(handler)));
    }

    /// Register a handler for every event.
    pub fn on_any(&self, handler: impl Fn(&Event) + Send + Sync + 'static) {
        self.lock_table().entries.push((None, Arc::new(handler)));
    }

    /// Publish from task context.
    ///
    /// Never blocks: when the delivery queue is full the event is dropped,
    /// counted and logged — it is not retried.
    pub fn publish(&self, event: Event) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(kind = ?event.kind(), "event queue full, dropping event");
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(kind = ?event.kind(), "event dispatcher gone, dropping event");
            }
        }
    }

    /// Publish from an urgent context (input edge callbacks).
    ///
    /// Same queue and dispatch table as [`publish`](Self::publish), but free
    /// of logging and allocation on the producing path; drops are only
    /// counted.
    pub fn publish_urgent(&self, event: Event) {
        if self.tx.try_send(event).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Events dropped because the delivery queue was full.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn lock_table(&self) -> MutexGuard<'_, DispatchTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn dispatch(mut rx: mpsc::Receiver<Event>, table: Arc<Mutex<DispatchTable>>) {
    while let Some(event) = rx.recv().await {
        let kind = event.kind();
        // Matching handlers are collected under the lock and called outside
        // it, so a handler may register further handlers.
        let handlers: Vec<Handler> = {
            let table = table.lock().unwrap_or_else(PoisonError::into_inner);
            table
                .entries
                .iter()
                .filter(|(k, _)| k.is_none() || *k == Some(kind))
                .map(|(_, handler)| Arc::clone(handler))
                .collect()
        };
        for handler in &handlers {
            handler(&event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wake(timestamp_us: i64) -> Event {
        Event::WakeRequested { timestamp_us }
    }

    #[tokio::test]
    async fn should_deliver_event_to_matching_handler() {
        let bus = EventBus::new(16);
        let (tx, mut rx) = mpsc::channel(4);
        bus.on(EventKind::WakeRequested, move |event| {
            let _ = tx.try_send(event.clone());
        });

        bus.publish(wake(7));

        let received = rx.recv().await.unwrap();
        assert_eq!(received, wake(7));
    }

    #[tokio::test]
    async fn should_not_deliver_events_of_other_kinds() {
        let bus = EventBus::new(16);
        let (tx, mut rx) = mpsc::channel(4);
        bus.on(EventKind::WakeRequested, move |event| {
            let _ = tx.try_send(event.clone());
        });

        bus.publish(Event::KnobTurned {
            code: 1,
            timestamp_us: 1,
        });
        bus.publish(wake(2));

        let received = rx.recv().await.unwrap();
        assert_eq!(received.timestamp_us(), 2);
    }

    #[tokio::test]
    async fn should_deliver_in_registration_order() {
        let bus = EventBus::new(16);
        let (tx, mut rx) = mpsc::channel(8);

        let tx1 = tx.clone();
        bus.on(EventKind::WakeRequested, move |_| {
            let _ = tx1.try_send("first");
        });
        let tx2 = tx.clone();
        bus.on_any(move |_| {
            let _ = tx2.try_send("second");
        });
        bus.on(EventKind::WakeRequested, move |_| {
            let _ = tx.try_send("third");
        });

        bus.publish(wake(1));

        assert_eq!(rx.recv().await.unwrap(), "first");
        assert_eq!(rx.recv().await.unwrap(), "second");
        assert_eq!(rx.recv().await.unwrap(), "third");
    }

    #[tokio::test]
    async fn should_deliver_every_kind_to_any_handler() {
        let bus = EventBus::new(16);
        let (tx, mut rx) = mpsc::channel(4);
        bus.on_any(move |event| {
            let _ = tx.try_send(event.kind());
        });

        bus.publish(wake(1));
        bus.publish(Event::ConnectivityChanged {
            connected: false,
            timestamp_us: 2,
        });

        assert_eq!(rx.recv().await.unwrap(), EventKind::WakeRequested);
        assert_eq!(rx.recv().await.unwrap(), EventKind::ConnectivityChanged);
    }

    #[tokio::test]
    async fn should_allow_handler_to_register_handlers() {
        let bus = EventBus::new(16);
        let (tx, mut rx) = mpsc::channel(4);

        let bus_inner = bus.clone();
        bus.on(EventKind::WakeRequested, move |_| {
            let tx = tx.clone();
            bus_inner.on(EventKind::ConnectivityChanged, move |event| {
                let _ = tx.try_send(event.clone());
            });
        });

        bus.publish(wake(1));
        bus.publish(Event::ConnectivityChanged {
            connected: true,
            timestamp_us: 2,
        });

        let received = rx.recv().await.unwrap();
        assert_eq!(received.kind(), EventKind::ConnectivityChanged);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn should_drop_newest_and_count_when_queue_is_full() {
        let bus = EventBus::new(1);

        let (entered_tx, entered_rx) = std::sync::mpsc::channel();
        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();
        let entered_tx = Mutex::new(entered_tx);
        let release_rx = Mutex::new(release_rx);
        bus.on(EventKind::WakeRequested, move |_| {
            entered_tx.lock().unwrap().send(()).unwrap();
            let _ = release_rx.lock().unwrap().recv();
        });

        // Occupy the dispatcher with the first event...
        bus.publish(wake(0));
        entered_rx.recv().unwrap();

        // ...then fill the queue and overflow it.
        bus.publish(wake(1));
        assert_eq!(bus.dropped(), 0);
        bus.publish(wake(2));
        assert_eq!(bus.dropped(), 1);

        release_tx.send(()).unwrap();
        release_tx.send(()).unwrap();
    }

    #[tokio::test]
    async fn should_deliver_urgent_publishes_through_same_table() {
        let bus = EventBus::new(16);
        let (tx, mut rx) = mpsc::channel(4);
        bus.on(EventKind::KnobTurned, move |event| {
            let _ = tx.try_send(event.clone());
        });

        bus.publish_urgent(Event::KnobTurned {
            code: 3,
            timestamp_us: 1,
        });

        let received = rx.recv().await.unwrap();
        assert_eq!(received.kind(), EventKind::KnobTurned);
    }
}
