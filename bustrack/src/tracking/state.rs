//! Session state types.
//!
//! - [`SessionState`] - Lifecycle of one "track this route" session
//! - [`TrackingSession`] - Mutable per-session state owned by the manager
//! - [`TrackingSnapshot`] - Read-only view handed to the rendering layer

use std::collections::VecDeque;
use std::sync::Arc;

use super::ids::{BusId, RouteId, StopId};
use super::model::{PositionSample, RouteStop};
use crate::coord::{haversine_distance_m, Coordinate};

/// Number of recent speeds kept for ETA estimation.
pub const SPEED_HISTORY_LEN: usize = 10;

/// Lifecycle state of a tracking session.
///
/// ```text
/// Idle ─open─► Connecting ─ack─► Active ─close─► TearingDown ─► Idle
///                                  │  ▲
///                        disconnect│  │reconnect
///                                  ▼  │
///                                Degraded ─error─► Idle
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No session for the route.
    #[default]
    Idle,
    /// Stream subscribed, no acknowledgment yet.
    Connecting,
    /// Receiving fresh samples.
    Active,
    /// Stream disconnected; last position kept but no longer fresh.
    Degraded,
    /// `close()` in progress; deliveries are dropped.
    TearingDown,
}

impl SessionState {
    /// States in which `open()` returns the existing session.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Connecting | Self::Active | Self::Degraded)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Active => write!(f, "Active"),
            Self::Degraded => write!(f, "Degraded"),
            Self::TearingDown => write!(f, "TearingDown"),
        }
    }
}

/// Live state of one tracking session.
#[derive(Debug, Clone)]
pub struct TrackingSession {
    pub route_id: RouteId,
    pub bus_id: BusId,
    /// Stop the subscriber waits at, if they have a subscription.
    pub subscriber_stop_id: Option<StopId>,
    /// Index of the subscriber stop, resolved when the session opens.
    pub subscriber_stop_index: Option<usize>,
    pub notifications_enabled: bool,
    pub latest_sample: Option<PositionSample>,
    /// Last stop the bus was at (or nearest to).
    pub current_stop_index: Option<usize>,
    /// Suppresses repeat alerts for the same approach.
    pub last_alerted_stop_index: Option<usize>,
    pub state: SessionState,
    /// False once the stream disconnects, until the next sample.
    pub is_fresh: bool,
    /// Route stops in visit order, fixed for the session.
    pub stops: Arc<[RouteStop]>,
    pub speed_history: VecDeque<f64>,
    /// Set once the source reports stop arrivals itself.
    pub stop_index_reported: bool,
}

impl TrackingSession {
    pub fn new(route_id: RouteId, bus_id: BusId, stops: Arc<[RouteStop]>) -> Self {
        Self {
            route_id,
            bus_id,
            subscriber_stop_id: None,
            subscriber_stop_index: None,
            notifications_enabled: true,
            latest_sample: None,
            current_stop_index: None,
            last_alerted_stop_index: None,
            state: SessionState::Connecting,
            is_fresh: false,
            stops,
            speed_history: VecDeque::with_capacity(SPEED_HISTORY_LEN),
            stop_index_reported: false,
        }
    }

    /// Sets the subscriber stop, resolving its index on this route.
    ///
    /// A stop that is not on the route leaves the index unset; the
    /// evaluator then stays silent for this session.
    pub fn with_subscriber_stop(mut self, stop_id: StopId, notifications_enabled: bool) -> Self {
        self.subscriber_stop_index = self.stop_by_id(&stop_id).map(|s| s.index);
        self.subscriber_stop_id = Some(stop_id);
        self.notifications_enabled = notifications_enabled;
        self
    }

    pub fn is_active(&self) -> bool {
        self.state.is_open()
    }

    pub fn stop_by_id(&self, stop_id: &StopId) -> Option<&RouteStop> {
        self.stops.iter().find(|s| &s.id == stop_id)
    }

    pub fn stop_at(&self, index: usize) -> Option<&RouteStop> {
        self.stops.iter().find(|s| s.index == index)
    }

    /// Index of the stop closest to `coordinate`.
    pub fn nearest_stop_index(&self, coordinate: &Coordinate) -> Option<usize> {
        self.stops
            .iter()
            .map(|s| (s.index, haversine_distance_m(&s.coordinate, coordinate)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(index, _)| index)
    }

    /// Records a speed, dropping the oldest beyond [`SPEED_HISTORY_LEN`].
    pub fn record_speed(&mut self, speed_kmh: f64) {
        if self.speed_history.len() == SPEED_HISTORY_LEN {
            self.speed_history.pop_front();
        }
        self.speed_history.push_back(speed_kmh);
    }

    /// Last known bus position.
    pub fn last_coordinate(&self) -> Option<Coordinate> {
        self.latest_sample.as_ref().map(|s| s.coordinate)
    }

    pub fn snapshot(&self) -> TrackingSnapshot {
        TrackingSnapshot {
            route_id: self.route_id.clone(),
            bus_id: self.bus_id.clone(),
            state: self.state,
            coordinate: self.last_coordinate(),
            speed_kmh: self.latest_sample.as_ref().map(|s| s.speed_kmh),
            current_stop_index: self.current_stop_index,
            subscriber_stop_index: self.subscriber_stop_index,
            is_fresh: self.is_fresh,
        }
    }
}

/// Read-only view of a session for the rendering layer.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingSnapshot {
    pub route_id: RouteId,
    pub bus_id: BusId,
    pub state: SessionState,
    pub coordinate: Option<Coordinate>,
    pub speed_kmh: Option<f64>,
    pub current_stop_index: Option<usize>,
    pub subscriber_stop_index: Option<usize>,
    pub is_fresh: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stops() -> Arc<[RouteStop]> {
        (0..3)
            .map(|i| RouteStop {
                id: StopId::new(format!("s{}", i)),
                name: format!("Stop {}", i),
                address: String::new(),
                coordinate: Coordinate::new(37.0 + i as f64 * 0.01, -122.0),
                index: i,
            })
            .collect::<Vec<_>>()
            .into()
    }

    #[test]
    fn test_new_session_is_connecting() {
        let session = TrackingSession::new(RouteId::new("r"), BusId::new("b"), stops());
        assert_eq!(session.state, SessionState::Connecting);
        assert!(session.is_active());
        assert!(!session.is_fresh);
        assert!(session.latest_sample.is_none());
    }

    #[test]
    fn test_subscriber_stop_resolves_index() {
        let session = TrackingSession::new(RouteId::new("r"), BusId::new("b"), stops())
            .with_subscriber_stop(StopId::new("s2"), true);
        assert_eq!(session.subscriber_stop_index, Some(2));
    }

    #[test]
    fn test_unknown_subscriber_stop_has_no_index() {
        let session = TrackingSession::new(RouteId::new("r"), BusId::new("b"), stops())
            .with_subscriber_stop(StopId::new("elsewhere"), true);
        assert_eq!(session.subscriber_stop_index, None);
        assert_eq!(session.subscriber_stop_id, Some(StopId::new("elsewhere")));
    }

    #[test]
    fn test_nearest_stop_index() {
        let session = TrackingSession::new(RouteId::new("r"), BusId::new("b"), stops());

        assert_eq!(session.nearest_stop_index(&Coordinate::new(37.0101, -122.0)), Some(1));
        assert_eq!(session.nearest_stop_index(&Coordinate::new(38.0, -122.0)), Some(2));

        let empty = TrackingSession::new(RouteId::new("r"), BusId::new("b"), Vec::new().into());
        assert_eq!(empty.nearest_stop_index(&Coordinate::new(37.0, -122.0)), None);
    }

    #[test]
    fn test_speed_history_is_bounded() {
        let mut session = TrackingSession::new(RouteId::new("r"), BusId::new("b"), stops());
        for i in 0..(SPEED_HISTORY_LEN + 5) {
            session.record_speed(i as f64);
        }
        assert_eq!(session.speed_history.len(), SPEED_HISTORY_LEN);
        assert_eq!(session.speed_history.front(), Some(&5.0));
    }

    #[test]
    fn test_is_open_states() {
        assert!(!SessionState::Idle.is_open());
        assert!(SessionState::Connecting.is_open());
        assert!(SessionState::Active.is_open());
        assert!(SessionState::Degraded.is_open());
        assert!(!SessionState::TearingDown.is_open());
    }

    #[test]
    fn test_state_display() {
        assert_eq!(SessionState::Degraded.to_string(), "Degraded");
        assert_eq!(SessionState::TearingDown.to_string(), "TearingDown");
    }
}
