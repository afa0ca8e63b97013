//! ETA estimation from recent speeds and stop-to-stop distance.

use super::model::RouteStop;
use crate::coord::{path_length_m, Coordinate};

/// Estimate used when there is not enough speed history.
pub const DEFAULT_FALLBACK_ETA_MINUTES: u32 = 10;

/// Speed samples needed before the estimate is trusted.
pub const DEFAULT_MIN_SPEED_SAMPLES: usize = 3;

/// Below this mean speed the bus is treated as stopped.
const MIN_USABLE_SPEED_KMH: f64 = 1.0;

/// Derives an arrival estimate in whole minutes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EtaEstimator {
    pub fallback_minutes: u32,
    pub min_speed_samples: usize,
}

impl Default for EtaEstimator {
    fn default() -> Self {
        Self {
            fallback_minutes: DEFAULT_FALLBACK_ETA_MINUTES,
            min_speed_samples: DEFAULT_MIN_SPEED_SAMPLES,
        }
    }
}

impl EtaEstimator {
    /// Minutes to cover `distance_m` at the mean of `speeds_kmh`.
    ///
    /// Rounds up and never returns less than one minute. Falls back to
    /// `fallback_minutes` with too few samples, a (near) zero mean, or an
    /// unusable distance.
    pub fn estimate(&self, speeds_kmh: impl IntoIterator<Item = f64>, distance_m: f64) -> u32 {
        let (sum, count) = speeds_kmh
            .into_iter()
            .fold((0.0, 0usize), |(sum, count), speed| (sum + speed, count + 1));

        if count == 0 || count < self.min_speed_samples {
            return self.fallback_minutes;
        }

        let mean_kmh = sum / count as f64;
        if !mean_kmh.is_finite() || mean_kmh < MIN_USABLE_SPEED_KMH {
            return self.fallback_minutes;
        }
        if !distance_m.is_finite() || distance_m < 0.0 {
            return self.fallback_minutes;
        }

        let minutes = (distance_m * 60.0 / (mean_kmh * 1000.0)).ceil();
        (minutes as u32).max(1)
    }
}

/// Distance along the route from stop `from_index` to stop `to_index`.
///
/// Sums the straight legs between consecutive stops. Zero if the range is
/// empty or reversed.
pub fn stop_path_distance_m(stops: &[RouteStop], from_index: usize, to_index: usize) -> f64 {
    if to_index <= from_index {
        return 0.0;
    }

    let points: Vec<Coordinate> = stops
        .iter()
        .filter(|s| s.index >= from_index && s.index <= to_index)
        .map(|s| s.coordinate)
        .collect();

    path_length_m(&points)
}
