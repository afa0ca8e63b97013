//! Simulated position source for demos and tests.
//!
//! Moves a bus back and forth along a fixed list of waypoints ("bounce"
//! motion): each tick advances one waypoint, reversing direction at either
//! end instead of wrapping. Every emitted coordinate is the waypoint plus a
//! small random jitter, with a speed drawn from a fixed band.
//!
//! The random source is a seedable [`StdRng`], so a fixed seed reproduces
//! the exact same sample sequence.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio_util::sync::CancellationToken;

use super::error::StreamError;
use super::event::{EventSink, StreamEvent, SubscribeRequest};
use super::subscription::StreamSubscription;
use super::PositionStreamSource;
use crate::coord::{safe_polyline, sanitize, Coordinate};
use crate::tracking::{BusId, PositionSample, RouteId};

/// Default time between samples.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(3000);

/// Default delay before the simulated connection is acknowledged.
pub const DEFAULT_CONNECT_DELAY: Duration = Duration::from_millis(500);

/// Default total jitter span in degrees (±half on each axis).
pub const DEFAULT_JITTER_DEG: f64 = 0.001;

/// Default speed band in km/h.
pub const DEFAULT_SPEED_MIN_KMH: f64 = 25.0;
pub const DEFAULT_SPEED_MAX_KMH: f64 = 40.0;

/// Reference waypoints: a short northbound run through San Francisco.
pub const REFERENCE_WAYPOINTS: [Coordinate; 8] = [
    Coordinate::new(37.7749, -122.4194),
    Coordinate::new(37.7789, -122.4184),
    Coordinate::new(37.7829, -122.4174),
    Coordinate::new(37.7869, -122.4164),
    Coordinate::new(37.7909, -122.4154),
    Coordinate::new(37.7949, -122.4144),
    Coordinate::new(37.7989, -122.4134),
    Coordinate::new(37.8029, -122.4124),
];

/// Configuration for [`SimulatedSource`].
#[derive(Debug, Clone)]
pub struct SimulatedSourceConfig {
    pub tick_interval: Duration,
    pub connect_delay: Duration,
    pub jitter_deg: f64,
    pub speed_min_kmh: f64,
    pub speed_max_kmh: f64,
    /// Fixed RNG seed; `None` seeds from the OS.
    pub seed: Option<u64>,
    /// Waypoints to bounce between. Invalid points are dropped; an empty
    /// list falls back to [`REFERENCE_WAYPOINTS`].
    pub waypoints: Vec<Coordinate>,
}

impl Default for SimulatedSourceConfig {
    fn default() -> Self {
        Self {
            tick_interval: DEFAULT_TICK_INTERVAL,
            connect_delay: DEFAULT_CONNECT_DELAY,
            jitter_deg: DEFAULT_JITTER_DEG,
            speed_min_kmh: DEFAULT_SPEED_MIN_KMH,
            speed_max_kmh: DEFAULT_SPEED_MAX_KMH,
            seed: None,
            waypoints: REFERENCE_WAYPOINTS.to_vec(),
        }
    }
}

/// Bounce motion over an ordered waypoint list.
#[derive(Debug, Clone)]
pub struct BounceMotion {
    waypoints: Vec<Coordinate>,
    index: usize,
    direction: isize,
}

impl BounceMotion {
    /// Starts at index 0 moving forward.
    pub fn new(waypoints: &[Coordinate]) -> Self {
        let mut waypoints = safe_polyline(waypoints);
        if waypoints.is_empty() {
            waypoints = REFERENCE_WAYPOINTS.to_vec();
        }

        Self {
            waypoints,
            index: 0,
            direction: 1,
        }
    }

    /// Moves one waypoint and returns the new position.
    ///
    /// Direction flips on arrival at either end, so the index stays in
    /// `0..len` forever.
    pub fn advance(&mut self) -> Coordinate {
        let last = self.waypoints.len() - 1;
        if last == 0 {
            return self.waypoints[0];
        }

        self.index = self.index.saturating_add_signed(self.direction).min(last);
        if self.index == last || self.index == 0 {
            self.direction = -self.direction;
        }

        self.waypoints[self.index]
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// +1 moving forward, -1 moving back.
    pub fn direction(&self) -> isize {
        self.direction
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn current(&self) -> Coordinate {
        self.waypoints[self.index]
    }
}

/// Produces jittered samples from a [`BounceMotion`].
#[derive(Debug)]
pub struct SampleGenerator {
    bus_id: BusId,
    route_id: RouteId,
    motion: BounceMotion,
    rng: StdRng,
    jitter_deg: f64,
    speed_min_kmh: f64,
    speed_max_kmh: f64,
}

impl SampleGenerator {
    pub fn new(bus_id: BusId, route_id: RouteId, config: &SimulatedSourceConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        Self {
            bus_id,
            route_id,
            motion: BounceMotion::new(&config.waypoints),
            rng,
            jitter_deg: config.jitter_deg.abs(),
            speed_min_kmh: config.speed_min_kmh,
            speed_max_kmh: config.speed_max_kmh,
        }
    }

    /// Advances the motion one tick and builds the sample for it.
    pub fn next_sample(&mut self) -> PositionSample {
        let waypoint = self.motion.advance();

        let jittered = Coordinate::new(
            waypoint.latitude + (self.rng.random::<f64>() - 0.5) * self.jitter_deg,
            waypoint.longitude + (self.rng.random::<f64>() - 0.5) * self.jitter_deg,
        );

        let speed_kmh = if self.speed_min_kmh < self.speed_max_kmh {
            self.rng.random_range(self.speed_min_kmh..self.speed_max_kmh)
        } else {
            self.speed_min_kmh
        };

        PositionSample::new(
            self.bus_id.clone(),
            self.route_id.clone(),
            sanitize(Some(jittered), waypoint),
            speed_kmh,
        )
    }

    pub fn motion(&self) -> &BounceMotion {
        &self.motion
    }
}

/// Position source driven by a timer and [`SampleGenerator`].
///
/// Each `subscribe` call gets its own generator and delivery task.
#[derive(Debug, Clone)]
pub struct SimulatedSource {
    bus_id: BusId,
    route_id: RouteId,
    config: SimulatedSourceConfig,
}

impl SimulatedSource {
    pub fn new(bus_id: BusId, route_id: RouteId, config: SimulatedSourceConfig) -> Self {
        Self {
            bus_id,
            route_id,
            config,
        }
    }
}

impl PositionStreamSource for SimulatedSource {
    fn name(&self) -> &'static str {
        "simulated"
    }

    fn subscribe(
        &self,
        request: SubscribeRequest,
        sink: EventSink,
    ) -> Result<StreamSubscription, StreamError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| StreamError::NoRuntime)?;

        let generator = SampleGenerator::new(self.bus_id.clone(), self.route_id.clone(), &self.config);
        let cancellation = CancellationToken::new();
        let token = cancellation.clone();
        let tick_interval = self.config.tick_interval;
        let connect_delay = self.config.connect_delay;

        tracing::debug!(
            stream = %request.target,
            bus_id = %self.bus_id,
            tick_ms = tick_interval.as_millis() as u64,
            seed = ?self.config.seed,
            "Simulated stream subscribed"
        );

        let task = runtime.spawn(run_simulation(
            generator,
            sink,
            token,
            tick_interval,
            connect_delay,
        ));

        Ok(StreamSubscription::new(cancellation, task))
    }
}

async fn run_simulation(
    mut generator: SampleGenerator,
    sink: EventSink,
    cancellation: CancellationToken,
    tick_interval: Duration,
    connect_delay: Duration,
) {
    tokio::select! {
        _ = tokio::time::sleep(connect_delay) => {}
        _ = cancellation.cancelled() => return,
    }

    if cancellation.is_cancelled() || !sink.send(StreamEvent::Connected) {
        return;
    }

    let start = tokio::time::Instant::now() + tick_interval;
    let mut ticker = tokio::time::interval_at(start, tick_interval);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let sample = generator.next_sample();
                if cancellation.is_cancelled() || !sink.send(StreamEvent::SampleReceived(sample)) {
                    break;
                }
            }
            _ = cancellation.cancelled() => break,
        }
    }

    tracing::debug!("Simulated stream stopped");
}
