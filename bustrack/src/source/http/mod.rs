//! HTTP polling position source.
//!
//! Polls the backend's bus status endpoint and turns each response into
//! stream events.
//!
//! # Architecture
//!
//! ```text
//! HttpPollingSource::subscribe()
//!     │
//!     └── spawned poll loop (one per subscription)
//!             │
//!             ├── BusStatusClient trait → HttpBusStatusClient (direct reqwest)
//!             │
//!             └── EventSink → TrackingManager
//! ```

mod adapter;
mod client;
mod config;
mod error;

pub use adapter::HttpPollingSource;
pub use client::{status_path, BusStatusClient, HttpBusStatusClient};
pub use config::{
    HttpSourceConfig, DEFAULT_API_URL, DEFAULT_MAX_RETRIES, DEFAULT_POLL_INTERVAL_SECS,
    DEFAULT_REQUEST_TIMEOUT,
};
pub use error::TransportError;
