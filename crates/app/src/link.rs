//! Wireless link management — scan, rank, connect, keep retrying.
//!
//! The manager drives the [`WirelessDriver`] port: it intersects scan results
//! with the configured allow-list, ranks candidates by signal strength and
//! joins the strongest one above the floor. A background monitor loop redoes
//! that whenever the link drops; a single-flight guard keeps foreground
//! `connect_best` calls and the monitor from racing each other.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use panelkit_domain::error::PanelError;

use crate::ports::link::{DriverLink, LinkStatus, WirelessDriver};

/// Allow-listed network, sourced from read-only persisted configuration.
#[derive(Debug, Clone)]
pub struct KnownNetwork {
    pub ssid: String,
    pub credential: String,
}

/// Connection lifecycle of the wireless link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkState {
    #[default]
    Disconnected,
    Scanning,
    Connecting,
    Connected,
}

/// Why a connect attempt could not go ahead.
///
/// `NoKnownNetwork` and `SignalTooWeak` are deliberately distinct: the first
/// means a rescan is pointless for a while, the second means an immediate
/// rescan may already find a better candidate.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    /// Nothing from the allow-list is in range.
    #[error("no known network in range")]
    NoKnownNetwork,
    /// The best candidate is below the signal floor.
    #[error("best known network too weak ({best_dbm} dBm, floor {floor_dbm} dBm)")]
    SignalTooWeak { best_dbm: i32, floor_dbm: i32 },
    /// Another connect attempt is already running.
    #[error("connect attempt already in progress")]
    Busy,
    /// The driver failed to scan or associate.
    #[error("radio driver error")]
    Driver(#[source] PanelError),
}

impl From<ConnectError> for PanelError {
    fn from(err: ConnectError) -> Self {
        match err {
            ConnectError::NoKnownNetwork => PanelError::Unavailable("no known network in range"),
            ConnectError::SignalTooWeak { .. } => {
                PanelError::Unavailable("best known network too weak")
            }
            ConnectError::Busy => PanelError::InvalidState("connect attempt already in progress"),
            ConnectError::Driver(err) => err,
        }
    }
}

/// Ranks and joins allow-listed access points and keeps the link alive.
pub struct LinkManager<D> {
    driver: Arc<D>,
    known: Vec<KnownNetwork>,
    min_signal_dbm: i32,
    rescan_interval: Duration,
    state_tx: watch::Sender<LinkState>,
    connecting: AtomicBool,
}

impl<D: WirelessDriver + 'static> LinkManager<D> {
    #[must_use]
    pub fn new(
        driver: Arc<D>,
        known: Vec<KnownNetwork>,
        min_signal_dbm: i32,
        rescan_interval: Duration,
    ) -> Self {
        let (state_tx, _) = watch::channel(LinkState::Disconnected);
        Self {
            driver,
            known,
            min_signal_dbm,
            rescan_interval,
            state_tx,
            connecting: AtomicBool::new(false),
        }
    }

    /// Scan, intersect with the allow-list, rank by signal strength and
    /// connect to the strongest candidate at or above `min_signal_dbm`.
    ///
    /// Safe to call while the monitor loop runs: overlapping attempts are
    /// rejected with [`ConnectError::Busy`], never queued.
    ///
    /// # Errors
    ///
    /// [`ConnectError::NoKnownNetwork`] when nothing allow-listed is in
    /// range, [`ConnectError::SignalTooWeak`] when the best candidate is
    /// below the floor, [`ConnectError::Driver`] when the radio fails.
    pub async fn connect_best(&self, min_signal_dbm: i32) -> Result<(), ConnectError> {
        if self.connecting.swap(true, Ordering::SeqCst) {
            return Err(ConnectError::Busy);
        }
        let result = self.try_connect_best(min_signal_dbm).await;
        self.connecting.store(false, Ordering::SeqCst);
        if result.is_err() {
            self.state_tx.send_replace(LinkState::Disconnected);
        }
        result
    }

    async fn try_connect_best(&self, min_signal_dbm: i32) -> Result<(), ConnectError> {
        self.state_tx.send_replace(LinkState::Scanning);
        let records = self.driver.scan().await.map_err(ConnectError::Driver)?;

        let mut best: Option<(&KnownNetwork, i32)> = None;
        for record in &records {
            let Some(known) = self.known.iter().find(|net| net.ssid == record.ssid) else {
                continue;
            };
            tracing::debug!(
                ssid = %record.ssid,
                signal_dbm = record.signal_dbm,
                "known access point in range"
            );
            if best.is_none_or(|(_, signal)| record.signal_dbm > signal) {
                best = Some((known, record.signal_dbm));
            }
        }

        let Some((candidate, signal_dbm)) = best else {
            tracing::warn!("no known access point in range");
            return Err(ConnectError::NoKnownNetwork);
        };
        if signal_dbm < min_signal_dbm {
            tracing::warn!(
                ssid = %candidate.ssid,
                signal_dbm,
                floor_dbm = min_signal_dbm,
                "best known access point too weak"
            );
            return Err(ConnectError::SignalTooWeak {
                best_dbm: signal_dbm,
                floor_dbm: min_signal_dbm,
            });
        }

        tracing::info!(ssid = %candidate.ssid, signal_dbm, "connecting");
        self.state_tx.send_replace(LinkState::Connecting);
        self.driver
            .connect(&candidate.ssid, &candidate.credential)
            .await
            .map_err(ConnectError::Driver)
    }

    /// Block the caller (never the monitor loop) until the driver reports an
    /// assigned address or `timeout` elapses. Returns whether the link came
    /// up in time.
    pub async fn wait_for_address(&self, timeout: Duration) -> bool {
        let mut rx = self.driver.link_state();
        let came_up = tokio::time::timeout(timeout, async {
            while *rx.borrow_and_update() != DriverLink::Up {
                if rx.changed().await.is_err() {
                    return false;
                }
            }
            true
        })
        .await
        .unwrap_or(false);

        if came_up {
            self.state_tx.send_replace(LinkState::Connected);
        }
        came_up
    }

    /// True when the link is up with an address assigned.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        *self.driver.link_state().borrow() == DriverLink::Up
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> LinkState {
        *self.state_tx.borrow()
    }

    /// Cheap, cloneable connectivity handle implementing [`LinkStatus`].
    #[must_use]
    pub fn handle(&self) -> LinkHandle {
        LinkHandle {
            rx: self.driver.link_state(),
        }
    }

    /// Spawn the background monitor loop: while the link is down, rescan and
    /// reconnect on a fixed interval; while it is up, idle cheaply.
    pub fn spawn_monitor(self: Arc<Self>) -> JoinHandle<()> {
        const UP_POLL: Duration = Duration::from_secs(1);
        const ADDRESS_WAIT: Duration = Duration::from_secs(10);

        tokio::spawn(async move {
            loop {
                if self.is_connected() {
                    self.state_tx.send_replace(LinkState::Connected);
                    tokio::time::sleep(UP_POLL).await;
                    continue;
                }
                if self.state() == LinkState::Connected {
                    tracing::warn!("link lost");
                    self.state_tx.send_replace(LinkState::Disconnected);
                }

                match self.connect_best(self.min_signal_dbm).await {
                    Ok(()) => {
                        if self.wait_for_address(ADDRESS_WAIT).await {
                            tracing::info!("link up");
                        } else {
                            tracing::warn!("no address before timeout");
                        }
                        continue;
                    }
                    // A foreground attempt is already running; check back soon.
                    Err(ConnectError::Busy) => {
                        tokio::time::sleep(UP_POLL).await;
                        continue;
                    }
                    // A stronger candidate may appear any moment.
                    Err(err @ ConnectError::SignalTooWeak { .. }) => {
                        tracing::debug!(error = %err, "rescanning shortly");
                        tokio::time::sleep(UP_POLL).await;
                        continue;
                    }
                    Err(err) => {
                        tracing::debug!(error = %err, "connect attempt failed");
                    }
                }
                tokio::time::sleep(self.rescan_interval).await;
            }
        })
    }
}

/// Cloneable read-only view of the link, handed to command dispatch and
/// pollers.
#[derive(Clone)]
pub struct LinkHandle {
    rx: watch::Receiver<DriverLink>,
}

impl LinkStatus for LinkHandle {
    fn is_connected(&self) -> bool {
        *self.rx.borrow() == DriverLink::Up
    }
}
