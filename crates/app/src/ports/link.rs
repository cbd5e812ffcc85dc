//! Link ports — the radio capability the link manager drives, and the
//! read-only connectivity signal everything else consumes.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;

use panelkit_domain::error::PanelError;

/// One access point seen during a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRecord {
    pub ssid: String,
    /// Received signal strength, dBm (more positive is stronger).
    pub signal_dbm: i32,
}

/// Link-layer state reported by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DriverLink {
    #[default]
    Down,
    /// Associated with an access point, no address assigned yet.
    Associated,
    /// Fully connected with an address assigned.
    Up,
}

/// Capability to scan, connect and observe the wireless link.
///
/// Implemented by the platform radio driver (an external collaborator) or by
/// the simulated radio in `panelkit-adapter-virtual`.
pub trait WirelessDriver: Send + Sync {
    /// Scan for visible access points.
    fn scan(&self) -> impl Future<Output = Result<Vec<ScanRecord>, PanelError>> + Send;

    /// Begin connecting to `ssid`. Resolves when the association request is
    /// accepted; address assignment completes asynchronously and is observed
    /// through [`link_state`](Self::link_state).
    fn connect(
        &self,
        ssid: &str,
        credential: &str,
    ) -> impl Future<Output = Result<(), PanelError>> + Send;

    /// Watch link-layer state transitions. The receiver always holds the
    /// current state.
    fn link_state(&self) -> watch::Receiver<DriverLink>;
}

/// Read-only connectivity signal consumed by command dispatch and polling.
pub trait LinkStatus: Send + Sync {
    /// True when the link is up with an address assigned.
    fn is_connected(&self) -> bool;
}

impl<T: LinkStatus> LinkStatus for Arc<T> {
    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }
}
