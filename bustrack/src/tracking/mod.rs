//! Route tracking core.
//!
//! Everything between a position stream and the screen: session lifecycle,
//! proximity alerts, ETA estimation and marker animation.
//!
//! # Architecture
//!
//! ```text
//! RouteDirectory ──► TrackingManager ◄── StreamEvent ── PositionStreamSource
//!                        │
//!        ┌───────────────┼──────────────────┐
//!        ▼               ▼                  ▼
//!  TrackingSession  ProximityEvaluator  MarkerProjector
//!                        │
//!                        ▼
//!               NotificationScheduler
//! ```
//!
//! # Components
//!
//! - [`TrackingManager`] - Opens, updates and closes sessions
//! - [`ProximityEvaluator`] - Raises "bus approaching" alerts
//! - [`EtaEstimator`] - Minutes to the subscriber stop from recent speeds
//! - [`MarkerProjector`] - Eased marker position and heading between samples
//! - [`RouteDirectory`] - Read-only access to routes and subscriptions

mod directory;
mod eta;
mod evaluator;
mod ids;
mod logger;
mod manager;
mod marker;
mod model;
mod notify;
mod state;

pub use directory::{DirectoryError, RouteDirectory, StaticRouteDirectory};
pub use eta::{
    stop_path_distance_m, EtaEstimator, DEFAULT_FALLBACK_ETA_MINUTES, DEFAULT_MIN_SPEED_SAMPLES,
};
pub use evaluator::{AlertPolicy, EvaluatorConfig, ProximityEvaluator, DEFAULT_STOPS_AHEAD};
pub use ids::{BusId, RouteId, StopId};
pub use logger::{spawn_snapshot_logger, DEFAULT_LOG_INTERVAL};
pub use manager::{
    SessionError, SessionHandle, TrackingConfig, TrackingManager, DEFAULT_BROADCAST_CAPACITY,
};
pub use marker::{
    Easing, MarkerConfig, MarkerFrame, MarkerProjector, DEFAULT_ANIMATION_DURATION,
    MIN_HEADING_DISTANCE_M,
};
pub use model::{PositionSample, ProximityAlert, RouteInfo, RouteStop, RouteSubscription};
pub use notify::{
    LocalNotification, LogNotifier, NotificationScheduler, NotifyError, RecordingNotifier,
    APPROACHING_TITLE,
};
pub use state::{SessionState, TrackingSession, TrackingSnapshot, SPEED_HISTORY_LEN};
