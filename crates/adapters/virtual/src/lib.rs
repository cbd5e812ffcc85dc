//! # panelkit-adapter-virtual
//!
//! Simulated radio driver implementing the [`WirelessDriver`] port.
//!
//! Stands in for the platform radio (an external collaborator) so the link
//! manager can run on a bench machine and in tests: networks are declared up
//! front, connecting to a known one brings the link up after a configurable
//! delay, and the link can be dropped on demand to exercise reconnection.
//!
//! ## Dependency rule
//! Depends on `panelkit-app` (port traits) and `panelkit-domain` only.

use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::watch;

use panelkit_app::ports::link::{DriverLink, ScanRecord, WirelessDriver};
use panelkit_domain::error::PanelError;

/// One simulated access point.
#[derive(Debug, Clone)]
pub struct VirtualNetwork {
    pub ssid: String,
    pub signal_dbm: i32,
    pub credential: String,
}

/// Simulated radio.
pub struct VirtualRadio {
    networks: Mutex<Vec<VirtualNetwork>>,
    link_tx: watch::Sender<DriverLink>,
    address_delay: Duration,
}

impl VirtualRadio {
    #[must_use]
    pub fn new(networks: Vec<VirtualNetwork>) -> Self {
        let (link_tx, _) = watch::channel(DriverLink::Down);
        Self {
            networks: Mutex::new(networks),
            link_tx,
            address_delay: Duration::ZERO,
        }
    }

    /// Delay between association and address assignment (default: none).
    #[must_use]
    pub fn with_address_delay(mut self, delay: Duration) -> Self {
        self.address_delay = delay;
        self
    }

    /// Replace the visible network list.
    pub fn set_networks(&self, networks: Vec<VirtualNetwork>) {
        *self.networks.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = networks;
    }

    /// Simulate link loss.
    pub fn drop_link(&self) {
        self.link_tx.send_replace(DriverLink::Down);
    }

    fn visible(&self) -> Vec<VirtualNetwork> {
        self.networks
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl WirelessDriver for VirtualRadio {
    async fn scan(&self) -> Result<Vec<ScanRecord>, PanelError> {
        Ok(self
            .visible()
            .iter()
            .map(|net| ScanRecord {
                ssid: net.ssid.clone(),
                signal_dbm: net.signal_dbm,
            })
            .collect())
    }

    async fn connect(&self, ssid: &str, credential: &str) -> Result<(), PanelError> {
        let Some(network) = self.visible().into_iter().find(|net| net.ssid == ssid) else {
            return Err(PanelError::Unavailable("ssid not in range"));
        };
        if network.credential != credential {
            tracing::warn!(ssid, "credential rejected");
            self.link_tx.send_replace(DriverLink::Down);
            return Err(PanelError::Unavailable("credential rejected"));
        }

        self.link_tx.send_replace(DriverLink::Associated);
        if self.address_delay.is_zero() {
            self.link_tx.send_replace(DriverLink::Up);
        } else {
            let delay = self.address_delay;
            let link_tx = self.link_tx.clone();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                link_tx.send_replace(DriverLink::Up);
            });
        }
        Ok(())
    }

    fn link_state(&self) -> watch::Receiver<DriverLink> {
        self.link_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn home() -> VirtualNetwork {
        VirtualNetwork {
            ssid: "home".to_string(),
            signal_dbm: -50,
            credential: "secret".to_string(),
        }
    }

    #[tokio::test]
    async fn should_list_declared_networks() {
        let radio = VirtualRadio::new(vec![home()]);
        let records = radio.scan().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].ssid, "home");
        assert_eq!(records[0].signal_dbm, -50);
    }

    #[tokio::test]
    async fn should_bring_link_up_on_successful_connect() {
        let radio = VirtualRadio::new(vec![home()]);
        radio.connect("home", "secret").await.unwrap();
        assert_eq!(*radio.link_state().borrow(), DriverLink::Up);
    }

    #[tokio::test]
    async fn should_reject_unknown_ssid() {
        let radio = VirtualRadio::new(vec![home()]);
        let result = radio.connect("elsewhere", "secret").await;
        assert!(matches!(result, Err(PanelError::Unavailable(_))));
        assert_eq!(*radio.link_state().borrow(), DriverLink::Down);
    }

    #[tokio::test]
    async fn should_reject_wrong_credential() {
        let radio = VirtualRadio::new(vec![home()]);
        let result = radio.connect("home", "wrong").await;
        assert!(matches!(result, Err(PanelError::Unavailable(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn should_assign_address_after_delay() {
        let radio = VirtualRadio::new(vec![home()]).with_address_delay(Duration::from_millis(100));
        radio.connect("home", "secret").await.unwrap();
        assert_eq!(*radio.link_state().borrow(), DriverLink::Associated);

        let mut rx = radio.link_state();
        while *rx.borrow_and_update() != DriverLink::Up {
            rx.changed().await.unwrap();
        }
    }

    #[tokio::test]
    async fn should_drop_link_on_demand() {
        let radio = VirtualRadio::new(vec![home()]);
        radio.connect("home", "secret").await.unwrap();
        radio.drop_link();
        assert_eq!(*radio.link_state().borrow(), DriverLink::Down);
    }
}
