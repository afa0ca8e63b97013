//! Tracking Session Manager
//!
//! Owns every "track this route" session: opens the position stream through
//! a per-session source, folds stream events into [`TrackingSession`] state,
//! runs the proximity evaluator, and tears the stream down again.
//!
//! # Architecture
//!
//! ```text
//!  open(route, token)                       StreamSourceFactory
//!        │                                          │ create()
//!        ▼                                          ▼
//!  ┌──────────────┐   subscribe(request, sink)  ┌──────────────────┐
//!  │ TrackingMgr  │ ──────────────────────────► │ PositionStream   │
//!  │  registry    │ ◄────────────────────────── │ Source           │
//!  └──────────────┘       StreamEvent           └──────────────────┘
//!     │        │
//!     │        └──► ProximityEvaluator ──► NotificationScheduler
//!     ▼
//!  broadcast<TrackingSnapshot>  ──► renderers, logger
//! ```
//!
//! # Delivery
//!
//! The sink handed to each source holds only a weak reference to the
//! manager plus the session's generation id. An event is applied only if
//! the registry still holds that same generation and the session is not
//! tearing down, so nothing a source delivers after `close()` can touch
//! state. Notifications and stream teardown run after the registry lock is
//! released.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Instant;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, info, trace, warn};

use super::directory::RouteDirectory;
use super::evaluator::{EvaluatorConfig, ProximityEvaluator};
use super::ids::RouteId;
use super::marker::{MarkerConfig, MarkerFrame, MarkerProjector};
use super::model::{PositionSample, ProximityAlert, RouteInfo};
use super::notify::{LocalNotification, NotificationScheduler};
use super::state::{SessionState, TrackingSession, TrackingSnapshot};
use crate::coord::{route_polyline, Coordinate, DEFAULT_COORDINATES};
use crate::source::{
    EventSink, StreamError, StreamEvent, StreamSourceFactory, StreamSubscription, StreamTarget,
    SubscribeRequest,
};

/// Default capacity of the snapshot and alert broadcast channels.
pub const DEFAULT_BROADCAST_CAPACITY: usize = 64;

/// Errors from opening a session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("No auth token; sign in before tracking a route")]
    MissingToken,

    #[error("Route '{0}' not found")]
    RouteNotFound(RouteId),

    #[error("Failed to open position stream: {0}")]
    Stream(#[from] StreamError),
}

/// Configuration for the manager.
#[derive(Debug, Clone)]
pub struct TrackingConfig {
    pub evaluator: EvaluatorConfig,
    pub marker: MarkerConfig,
    /// Capacity of the snapshot and alert broadcast channels.
    pub broadcast_capacity: usize,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            evaluator: EvaluatorConfig::default(),
            marker: MarkerConfig::default(),
            broadcast_capacity: DEFAULT_BROADCAST_CAPACITY,
        }
    }
}

/// Identifies one opened session.
///
/// A handle from an earlier session on the same route does not close a
/// newer one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionHandle {
    route_id: RouteId,
    generation: u64,
}

impl SessionHandle {
    pub fn route_id(&self) -> &RouteId {
        &self.route_id
    }
}

struct SessionEntry {
    generation: u64,
    session: TrackingSession,
    subscription: Option<StreamSubscription>,
    projector: MarkerProjector,
    route: RouteInfo,
}

impl SessionEntry {
    fn handle(&self) -> SessionHandle {
        SessionHandle {
            route_id: self.session.route_id.clone(),
            generation: self.generation,
        }
    }
}

#[derive(Default)]
struct Registry {
    sessions: HashMap<RouteId, SessionEntry>,
    last_errors: HashMap<RouteId, String>,
    next_generation: u64,
}

/// Side effects collected under the lock and run after it is released.
#[derive(Default)]
struct Outcome {
    alert: Option<ProximityAlert>,
    snapshot: Option<TrackingSnapshot>,
    teardown: Option<StreamSubscription>,
}

struct ManagerInner {
    registry: Mutex<Registry>,
    directory: Arc<dyn RouteDirectory>,
    factory: Arc<dyn StreamSourceFactory>,
    notifier: Arc<dyn NotificationScheduler>,
    evaluator: ProximityEvaluator,
    marker: MarkerConfig,
    snapshot_tx: broadcast::Sender<TrackingSnapshot>,
    alert_tx: broadcast::Sender<ProximityAlert>,
}

/// Manages tracking sessions, at most one per route.
///
/// Cheap to clone; clones share the same sessions.
#[derive(Clone)]
pub struct TrackingManager {
    inner: Arc<ManagerInner>,
}

impl TrackingManager {
    pub fn new(
        directory: Arc<dyn RouteDirectory>,
        factory: Arc<dyn StreamSourceFactory>,
        notifier: Arc<dyn NotificationScheduler>,
    ) -> Self {
        Self::with_config(directory, factory, notifier, TrackingConfig::default())
    }

    pub fn with_config(
        directory: Arc<dyn RouteDirectory>,
        factory: Arc<dyn StreamSourceFactory>,
        notifier: Arc<dyn NotificationScheduler>,
        config: TrackingConfig,
    ) -> Self {
        let capacity = config.broadcast_capacity.max(1);
        let (snapshot_tx, _) = broadcast::channel(capacity);
        let (alert_tx, _) = broadcast::channel(capacity);

        Self {
            inner: Arc::new(ManagerInner {
                registry: Mutex::new(Registry::default()),
                directory,
                factory,
                notifier,
                evaluator: ProximityEvaluator::new(config.evaluator),
                marker: config.marker,
                snapshot_tx,
                alert_tx,
            }),
        }
    }

    /// Opens a tracking session for `route_id`.
    ///
    /// If a session for the route is already open (connecting, active or
    /// degraded) its handle is returned and no second stream is started.
    pub fn open(&self, route_id: &RouteId, auth_token: &str) -> Result<SessionHandle, SessionError> {
        if auth_token.trim().is_empty() {
            return Err(SessionError::MissingToken);
        }

        if let Some(handle) = self.open_handle(route_id) {
            debug!(route_id = %route_id, "Session already open");
            return Ok(handle);
        }

        let route = self
            .inner
            .directory
            .route(route_id)
            .ok_or_else(|| SessionError::RouteNotFound(route_id.clone()))?;

        let mut session =
            TrackingSession::new(route.id.clone(), route.bus_id.clone(), route.normalized_stops());
        if let Some(subscription) = self.inner.directory.subscription(route_id) {
            session = session
                .with_subscriber_stop(subscription.stop_id, subscription.notifications_enabled);
        }

        let handle = {
            let mut registry = self.inner.registry.lock();

            // Another caller may have opened it meanwhile
            if let Some(entry) = registry.sessions.get(route_id) {
                if entry.session.state.is_open() {
                    return Ok(entry.handle());
                }
            }

            registry.next_generation += 1;
            let entry = SessionEntry {
                generation: registry.next_generation,
                session,
                subscription: None,
                projector: MarkerProjector::new(self.inner.marker),
                route,
            };
            let handle = entry.handle();
            let snapshot = entry.session.snapshot();
            registry.last_errors.remove(route_id);
            registry.sessions.insert(route_id.clone(), entry);
            let _ = self.inner.snapshot_tx.send(snapshot);
            handle
        };

        // Subscribe without the lock: synchronous sources may deliver
        // straight away
        match self.start_stream(&handle, auth_token) {
            Ok(subscription) => {
                let orphan = {
                    let mut registry = self.inner.registry.lock();
                    match registry.sessions.get_mut(route_id) {
                        Some(entry) if entry.generation == handle.generation => {
                            entry.subscription = Some(subscription);
                            None
                        }
                        _ => Some(subscription),
                    }
                };
                if let Some(mut subscription) = orphan {
                    debug!(route_id = %route_id, "Session closed while subscribing");
                    subscription.cancel();
                }

                info!(route_id = %route_id, "Tracking session opened");
                Ok(handle)
            }
            Err(e) => {
                warn!(route_id = %route_id, error = %e, "Failed to open position stream");
                let mut registry = self.inner.registry.lock();
                if registry
                    .sessions
                    .get(route_id)
                    .is_some_and(|entry| entry.generation == handle.generation)
                {
                    registry.sessions.remove(route_id);
                }
                registry.last_errors.insert(route_id.clone(), e.to_string());
                Err(e.into())
            }
        }
    }

    fn open_handle(&self, route_id: &RouteId) -> Option<SessionHandle> {
        let registry = self.inner.registry.lock();
        registry
            .sessions
            .get(route_id)
            .filter(|entry| entry.session.state.is_open())
            .map(SessionEntry::handle)
    }

    fn start_stream(
        &self,
        handle: &SessionHandle,
        auth_token: &str,
    ) -> Result<StreamSubscription, StreamError> {
        let route = {
            let registry = self.inner.registry.lock();
            match registry.sessions.get(&handle.route_id) {
                Some(entry) if entry.generation == handle.generation => entry.route.clone(),
                _ => return Err(StreamError::Rejected("session closed".to_string())),
            }
        };

        let source = self.inner.factory.create(&route)?;
        debug!(
            route_id = %handle.route_id,
            source = source.name(),
            "Subscribing to position stream"
        );

        let request = SubscribeRequest::new(StreamTarget::Route(route.id.clone()), auth_token);
        source.subscribe(request, self.sink_for(handle))
    }

    fn sink_for(&self, handle: &SessionHandle) -> EventSink {
        let weak: Weak<ManagerInner> = Arc::downgrade(&self.inner);
        let route_id = handle.route_id.clone();
        let generation = handle.generation;

        EventSink::new(move |event| match weak.upgrade() {
            Some(inner) => inner.deliver(&route_id, generation, event),
            None => false,
        })
    }

    /// Closes a session and cancels its stream.
    ///
    /// Idempotent: closing an unknown or already-closed handle does nothing.
    pub fn close(&self, handle: &SessionHandle) {
        let subscription = {
            let mut registry = self.inner.registry.lock();
            match registry.sessions.get_mut(&handle.route_id) {
                Some(entry)
                    if entry.generation == handle.generation
                        && entry.session.state != SessionState::TearingDown =>
                {
                    entry.session.state = SessionState::TearingDown;
                    entry.subscription.take()
                }
                _ => {
                    trace!(route_id = %handle.route_id, "Close on inactive handle");
                    return;
                }
            }
        };

        if let Some(mut subscription) = subscription {
            subscription.cancel();
        }

        let removed = {
            let mut registry = self.inner.registry.lock();
            let current = registry
                .sessions
                .get(&handle.route_id)
                .is_some_and(|entry| entry.generation == handle.generation);
            if current {
                registry.sessions.remove(&handle.route_id)
            } else {
                None
            }
        };

        if let Some(entry) = removed {
            let mut snapshot = entry.session.snapshot();
            snapshot.state = SessionState::Idle;
            let _ = self.inner.snapshot_tx.send(snapshot);
        }

        info!(route_id = %handle.route_id, "Tracking session closed");
    }

    /// Closes every session. Called when the auth token is revoked.
    pub fn revoke_token(&self) {
        let handles: Vec<SessionHandle> = {
            let registry = self.inner.registry.lock();
            registry.sessions.values().map(SessionEntry::handle).collect()
        };

        info!(sessions = handles.len(), "Auth token revoked, closing sessions");
        for handle in &handles {
            self.close(handle);
        }
    }

    /// Lifecycle state of the route's session, `Idle` when there is none.
    pub fn state(&self, route_id: &RouteId) -> SessionState {
        self.inner
            .registry
            .lock()
            .sessions
            .get(route_id)
            .map(|entry| entry.session.state)
            .unwrap_or_default()
    }

    pub fn snapshot(&self, handle: &SessionHandle) -> Option<TrackingSnapshot> {
        self.with_entry(handle, |entry| entry.session.snapshot())
    }

    /// Snapshots of every session, ordered by route id.
    pub fn snapshots(&self) -> Vec<TrackingSnapshot> {
        let mut snapshots: Vec<TrackingSnapshot> = {
            let registry = self.inner.registry.lock();
            registry
                .sessions
                .values()
                .map(|entry| entry.session.snapshot())
                .collect()
        };
        snapshots.sort_by(|a, b| a.route_id.as_str().cmp(b.route_id.as_str()));
        snapshots
    }

    /// Full session state, cloned.
    pub fn session(&self, handle: &SessionHandle) -> Option<TrackingSession> {
        self.with_entry(handle, |entry| entry.session.clone())
    }

    /// Animated bus marker for the session at `now`.
    pub fn marker_frame(&self, handle: &SessionHandle, now: Instant) -> Option<MarkerFrame> {
        self.with_entry(handle, |entry| entry.projector.frame_at(now))
            .flatten()
    }

    /// Sanitized path to draw for the session's route.
    ///
    /// Uses the route's encoded polyline when it decodes to valid points,
    /// otherwise the stop coordinates.
    pub fn route_path(&self, handle: &SessionHandle) -> Option<Vec<Coordinate>> {
        self.with_entry(handle, |entry| {
            let stops: Vec<Coordinate> = entry.session.stops.iter().map(|s| s.coordinate).collect();
            let fallback = stops.first().copied().unwrap_or(DEFAULT_COORDINATES);
            route_polyline(entry.route.polyline.as_deref(), &stops, fallback)
        })
    }

    /// Reason the route's last session ended with an error, if it did.
    pub fn last_error(&self, route_id: &RouteId) -> Option<String> {
        self.inner.registry.lock().last_errors.get(route_id).cloned()
    }

    /// Number of sessions that are connecting, active or degraded.
    pub fn active_sessions(&self) -> usize {
        self.inner
            .registry
            .lock()
            .sessions
            .values()
            .filter(|entry| entry.session.state.is_open())
            .count()
    }

    /// Receives a snapshot after every state change.
    pub fn subscribe(&self) -> broadcast::Receiver<TrackingSnapshot> {
        self.inner.snapshot_tx.subscribe()
    }

    /// Receives every proximity alert raised.
    pub fn subscribe_alerts(&self) -> broadcast::Receiver<ProximityAlert> {
        self.inner.alert_tx.subscribe()
    }

    fn with_entry<T>(&self, handle: &SessionHandle, f: impl FnOnce(&SessionEntry) -> T) -> Option<T> {
        let registry = self.inner.registry.lock();
        registry
            .sessions
            .get(&handle.route_id)
            .filter(|entry| entry.generation == handle.generation)
            .map(f)
    }
}

impl ManagerInner {
    /// Applies one stream event. Returns false once the session is gone, so
    /// the source can stop delivering.
    fn deliver(&self, route_id: &RouteId, generation: u64, event: StreamEvent) -> bool {
        let mut outcome = Outcome::default();
        let still_open;

        {
            let mut registry = self.registry.lock();
            let Some(entry) = registry.sessions.get_mut(route_id) else {
                trace!(route_id = %route_id, "Dropping event for closed session");
                return false;
            };
            if entry.generation != generation || entry.session.state == SessionState::TearingDown {
                trace!(route_id = %route_id, "Dropping event for closed session");
                return false;
            }

            trace!(route_id = %route_id, event = event.kind(), "Stream event");

            match event {
                StreamEvent::Connected => {
                    if matches!(
                        entry.session.state,
                        SessionState::Connecting | SessionState::Degraded
                    ) {
                        transition(&mut entry.session, SessionState::Active);
                    }
                }
                StreamEvent::Disconnected => {
                    if entry.session.state == SessionState::Active {
                        transition(&mut entry.session, SessionState::Degraded);
                        entry.session.is_fresh = false;
                    }
                }
                StreamEvent::SampleReceived(sample) => {
                    outcome.alert = self.apply_sample(entry, sample);
                }
                StreamEvent::StopReached { stop_index } => {
                    entry.session.stop_index_reported = true;
                    outcome.alert = self.apply_stop_index(&mut entry.session, stop_index);
                }
                StreamEvent::Error(reason) => {
                    warn!(route_id = %route_id, reason = %reason, "Position stream failed");
                    if let Some(mut removed) = registry.sessions.remove(route_id) {
                        outcome.teardown = removed.subscription.take();
                        let mut snapshot = removed.session.snapshot();
                        snapshot.state = SessionState::Idle;
                        outcome.snapshot = Some(snapshot);
                    }
                    registry.last_errors.insert(route_id.clone(), reason);
                }
            }

            still_open = match registry.sessions.get(route_id) {
                Some(entry) => {
                    outcome.snapshot = Some(entry.session.snapshot());
                    true
                }
                None => false,
            };
        }

        if let Some(alert) = outcome.alert {
            if let Err(e) = self.notifier.schedule(LocalNotification::for_alert(&alert)) {
                warn!(route_id = %route_id, error = %e, "Failed to schedule notification");
            }
            let _ = self.alert_tx.send(alert);
        }

        if let Some(mut subscription) = outcome.teardown {
            subscription.cancel();
        }

        if let Some(snapshot) = outcome.snapshot {
            let _ = self.snapshot_tx.send(snapshot);
        }

        still_open
    }

    fn apply_sample(&self, entry: &mut SessionEntry, sample: PositionSample) -> Option<ProximityAlert> {
        let session = &mut entry.session;
        let fallback = session
            .last_coordinate()
            .or_else(|| session.stops.first().map(|s| s.coordinate))
            .unwrap_or(DEFAULT_COORDINATES);

        let clean = sample.sanitized(fallback);
        let located = sample.coordinate.is_valid();
        if !located {
            debug!(
                route_id = %session.route_id,
                lat = sample.coordinate.latitude,
                lon = sample.coordinate.longitude,
                "Replaced invalid sample coordinate"
            );
        }

        let coordinate = clean.coordinate;
        session.record_speed(clean.speed_kmh);
        session.latest_sample = Some(clean);
        session.is_fresh = true;

        if matches!(
            session.state,
            SessionState::Connecting | SessionState::Degraded
        ) {
            transition(session, SessionState::Active);
        }

        entry.projector.retarget(coordinate, Instant::now());

        // A substituted coordinate is not a real position
        if session.stop_index_reported || !located {
            return None;
        }
        let nearest = session.nearest_stop_index(&coordinate)?;
        self.apply_stop_index(session, nearest)
    }

    fn apply_stop_index(
        &self,
        session: &mut TrackingSession,
        stop_index: usize,
    ) -> Option<ProximityAlert> {
        if session.stop_at(stop_index).is_none() {
            warn!(
                route_id = %session.route_id,
                stop_index,
                stops = session.stops.len(),
                "Stop index out of range, ignoring"
            );
            return None;
        }

        if session.current_stop_index == Some(stop_index) {
            return None;
        }

        debug!(route_id = %session.route_id, stop_index, "Bus reached stop");
        session.current_stop_index = Some(stop_index);
        self.evaluator.evaluate(session)
    }
}

fn transition(session: &mut TrackingSession, to: SessionState) {
    info!(
        route_id = %session.route_id,
        from = %session.state,
        to = %to,
        "Session state changed"
    );
    session.state = to;
}
