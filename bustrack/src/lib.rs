//! bustrack - Live school-bus tracking core
//!
//! Follows a route's bus from a position stream, tells a waiting rider when
//! the bus is a couple of stops away, and animates the bus marker between
//! position reports.
//!
//! # High-Level API
//!
//! The [`tracking::TrackingManager`] ties the pieces together:
//!
//! ```ignore
//! use std::sync::Arc;
//! use bustrack::source::{PositionStreamSource, SimulatedSource, SimulatedSourceConfig};
//! use bustrack::tracking::{LogNotifier, RouteId, RouteInfo, StaticRouteDirectory, TrackingManager};
//!
//! let directory = StaticRouteDirectory::load(path)?;
//! let factory = |route: &RouteInfo| -> Result<Box<dyn PositionStreamSource>, _> {
//!     Ok(Box::new(SimulatedSource::new(
//!         route.bus_id.clone(),
//!         route.id.clone(),
//!         SimulatedSourceConfig::default(),
//!     )))
//! };
//! let manager = TrackingManager::new(Arc::new(directory), Arc::new(factory), Arc::new(LogNotifier));
//!
//! let handle = manager.open(&RouteId::new("r1"), &token)?;
//! let mut snapshots = manager.subscribe();
//! ```
//!
//! # Modules
//!
//! - [`coord`] - Coordinate sanitizing, geodesy and polyline decoding
//! - [`source`] - Position stream sources (simulated, HTTP polling, manual)
//! - [`tracking`] - Sessions, proximity alerts, ETA and marker animation
//! - [`wire`] - JSON messages exchanged with the backend
//! - [`config`] - `~/.bustrack/config.ini`
//! - [`logging`] - File and console log setup

pub mod config;
pub mod coord;
pub mod logging;
pub mod source;
pub mod tracking;
pub mod wire;

/// Version of the bustrack library and CLI.
///
/// Synchronized across the workspace from `Cargo.toml`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
