//! # panelkit-app
//!
//! Application core of the touch-panel connectivity stack.
//!
//! ## Responsibilities
//! - [`event_bus`] — typed, ordered, many-to-many notification dispatch
//! - [`store`] — the authoritative registry of areas/entities/weather/clock,
//!   mutated through a single-writer actor
//! - [`link`] — scan/rank/connect loop over the wireless driver port
//! - [`toggle`] — single-flight toggle command orchestration
//! - [`input`] — raw input events mapped to semantic intents
//! - [`ports`] — traits the adapter crates implement
//!
//! ## Dependency rule
//! Depends on `panelkit-domain` only (plus `tokio` for tasks and channels).
//! Never imports adapter crates; adapters depend on *this* crate.

pub mod event_bus;
pub mod input;
pub mod link;
pub mod ports;
pub mod store;
pub mod toggle;
