//! Animated Marker Projector
//!
//! Turns discrete position updates into a continuous glide for the map
//! marker. Each new target starts a fixed-duration interpolation from
//! wherever the marker currently is; an in-flight interpolation is replaced,
//! never queued.
//!
//! Time is passed in explicitly, so the projector is a pure function of its
//! inputs and the render clock.

use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use crate::coord::{haversine_distance_m, initial_bearing_deg, normalize_degrees, Coordinate};

/// Default glide duration.
pub const DEFAULT_ANIMATION_DURATION: Duration = Duration::from_millis(1000);

/// Moves shorter than this keep the previous heading.
pub const MIN_HEADING_DISTANCE_M: f64 = 1.0;

/// Easing curve applied to interpolation progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Easing {
    Linear,
    #[default]
    EaseInOutQuad,
}

impl Easing {
    /// Maps linear progress in `[0, 1]` to eased progress in `[0, 1]`.
    pub fn apply(&self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::EaseInOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
        }
    }
}

impl fmt::Display for Easing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linear => write!(f, "linear"),
            Self::EaseInOutQuad => write!(f, "ease_in_out"),
        }
    }
}

impl FromStr for Easing {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linear" => Ok(Self::Linear),
            "ease_in_out" | "ease-in-out" | "ease_in_out_quad" => Ok(Self::EaseInOutQuad),
            other => Err(format!(
                "unknown easing '{}', expected 'linear' or 'ease_in_out'",
                other
            )),
        }
    }
}

/// Configuration for the projector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerConfig {
    pub duration: Duration,
    pub easing: Easing,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            duration: DEFAULT_ANIMATION_DURATION,
            easing: Easing::default(),
        }
    }
}

/// What the rendering surface draws: a position and a rotation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerFrame {
    pub coordinate: Coordinate,
    /// Degrees clockwise from north, in `[0, 360)`.
    pub rotation_deg: f64,
}

#[derive(Debug, Clone, Copy)]
struct Glide {
    from: Coordinate,
    to: Coordinate,
    started_at: Instant,
}

/// Interpolates the marker between sanitized positions.
#[derive(Debug, Clone)]
pub struct MarkerProjector {
    config: MarkerConfig,
    glide: Option<Glide>,
    heading_deg: f64,
}

impl MarkerProjector {
    pub fn new(config: MarkerConfig) -> Self {
        Self {
            config,
            glide: None,
            heading_deg: 0.0,
        }
    }

    /// Starts gliding towards `target`, heading along the bearing of travel.
    ///
    /// The first target places the marker without animation.
    pub fn retarget(&mut self, target: Coordinate, now: Instant) {
        let from = self.position_at(now).unwrap_or(target);
        if haversine_distance_m(&from, &target) >= MIN_HEADING_DISTANCE_M {
            self.heading_deg = initial_bearing_deg(&from, &target);
        }
        self.start(from, target, now);
    }

    /// Starts gliding towards `target` with an explicit heading.
    pub fn retarget_with_heading(&mut self, target: Coordinate, heading_deg: f64, now: Instant) {
        let from = self.position_at(now).unwrap_or(target);
        if heading_deg.is_finite() {
            self.heading_deg = normalize_degrees(heading_deg);
        }
        self.start(from, target, now);
    }

    /// Interpolated position at `now`, or `None` before the first target.
    pub fn position_at(&self, now: Instant) -> Option<Coordinate> {
        let glide = self.glide?;
        let t = self.config.easing.apply(self.progress(&glide, now));
        Some(interpolate(&glide.from, &glide.to, t))
    }

    pub fn frame_at(&self, now: Instant) -> Option<MarkerFrame> {
        self.position_at(now).map(|coordinate| MarkerFrame {
            coordinate,
            rotation_deg: self.heading_deg,
        })
    }

    pub fn heading_deg(&self) -> f64 {
        self.heading_deg
    }

    /// True while an interpolation is still running at `now`.
    pub fn is_animating(&self, now: Instant) -> bool {
        self.glide
            .map(|glide| self.progress(&glide, now) < 1.0)
            .unwrap_or(false)
    }

    /// Final position of the current glide.
    pub fn target(&self) -> Option<Coordinate> {
        self.glide.map(|g| g.to)
    }

    fn start(&mut self, from: Coordinate, to: Coordinate, now: Instant) {
        self.glide = Some(Glide {
            from,
            to,
            started_at: now,
        });
    }

    fn progress(&self, glide: &Glide, now: Instant) -> f64 {
        if self.config.duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_duration_since(glide.started_at);
        (elapsed.as_secs_f64() / self.config.duration.as_secs_f64()).min(1.0)
    }
}

impl Default for MarkerProjector {
    fn default() -> Self {
        Self::new(MarkerConfig::default())
    }
}

/// Linear interpolation in lat/lon, crossing the antimeridian the short way.
fn interpolate(from: &Coordinate, to: &Coordinate, t: f64) -> Coordinate {
    if t >= 1.0 {
        return *to;
    }

    let mut delta_lon = to.longitude - from.longitude;
    if delta_lon > 180.0 {
        delta_lon -= 360.0;
    } else if delta_lon < -180.0 {
        delta_lon += 360.0;
    }

    let mut longitude = from.longitude + delta_lon * t;
    if longitude > 180.0 {
        longitude -= 360.0;
    } else if longitude < -180.0 {
        longitude += 360.0;
    }

    Coordinate::new(
        from.latitude + (to.latitude - from.latitude) * t,
        longitude,
    )
}
