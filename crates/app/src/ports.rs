//! Port definitions — traits that adapters implement.
//!
//! Ports are the boundaries between the application core and the outside
//! world: the platform radio driver on one side, the broker transport on the
//! other. They live here so the use-case layer and the adapter layer can both
//! depend on them without a cycle.

pub mod link;
pub mod transport;

pub use link::{DriverLink, LinkStatus, ScanRecord, WirelessDriver};
pub use transport::CommandTransport;
