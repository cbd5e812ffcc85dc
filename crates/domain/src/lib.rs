//! # panelkit-domain
//!
//! Domain model for panelkit — the value types shared by every layer of the
//! touch-panel connectivity core.
//!
//! ## Responsibilities
//! - Define the registry records ([`entity::Entity`], [`area::Area`]) and the
//!   periodic snapshots ([`weather::WeatherState`], [`clock::ClockState`])
//! - Define the closed [`event::Event`] set exchanged on the event bus
//! - Define the [`error::PanelError`] taxonomy crossing component boundaries
//! - Provide the process-wide monotonic clock ([`time::monotonic_us`])
//!
//! ## Dependency rule
//! No IO, no async runtime, no adapter knowledge. Everything else depends on
//! this crate; this crate depends on nothing internal.

pub mod area;
pub mod clock;
pub mod entity;
pub mod error;
pub mod event;
pub mod time;
pub mod weather;
