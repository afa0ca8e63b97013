//! Route and position data carried through the tracking pipeline.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{BusId, RouteId, StopId};
use crate::coord::{sanitize, Coordinate, DEFAULT_COORDINATES};

/// One position report for a bus.
///
/// Immutable once emitted; the next sample supersedes it.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionSample {
    pub bus_id: BusId,
    pub route_id: RouteId,
    pub coordinate: Coordinate,
    /// Ground speed in km/h, never negative once sanitized.
    pub speed_kmh: f64,
    pub captured_at: DateTime<Utc>,
}

impl PositionSample {
    pub fn new(bus_id: BusId, route_id: RouteId, coordinate: Coordinate, speed_kmh: f64) -> Self {
        Self {
            bus_id,
            route_id,
            coordinate,
            speed_kmh,
            captured_at: Utc::now(),
        }
    }

    /// Returns a copy with the coordinate sanitized against `fallback` and
    /// non-finite or negative speeds clamped to zero.
    pub fn sanitized(&self, fallback: Coordinate) -> Self {
        let speed_kmh = if self.speed_kmh.is_finite() && self.speed_kmh > 0.0 {
            self.speed_kmh
        } else {
            0.0
        };

        Self {
            bus_id: self.bus_id.clone(),
            route_id: self.route_id.clone(),
            coordinate: sanitize(Some(self.coordinate), fallback),
            speed_kmh,
            captured_at: self.captured_at,
        }
    }
}

/// A stop on a route, in visit order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteStop {
    pub id: StopId,
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(flatten)]
    pub coordinate: Coordinate,
    /// Zero-based visit order, unique and contiguous within a route.
    pub index: usize,
}

/// A route as read from the route directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteInfo {
    pub id: RouteId,
    /// Bus currently assigned to the route.
    pub bus_id: BusId,
    pub name: String,
    pub stops: Vec<RouteStop>,
    /// Encoded route geometry, if the directions service supplied one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polyline: Option<String>,
}

impl RouteInfo {
    /// Stops sorted by index with every coordinate sanitized.
    ///
    /// An invalid stop coordinate is replaced by the previous stop's
    /// position (or the default for the first stop), keeping distance math
    /// along the route finite.
    pub fn normalized_stops(&self) -> Arc<[RouteStop]> {
        let mut stops = self.stops.clone();
        stops.sort_by_key(|s| s.index);

        let mut previous = DEFAULT_COORDINATES;
        for stop in &mut stops {
            stop.coordinate = sanitize(Some(stop.coordinate), previous);
            previous = stop.coordinate;
        }

        stops.into()
    }

    /// Returns true if stop indices are exactly `0..stops.len()`.
    pub fn has_contiguous_stops(&self) -> bool {
        let mut indices: Vec<usize> = self.stops.iter().map(|s| s.index).collect();
        indices.sort_unstable();
        indices.iter().enumerate().all(|(i, &index)| i == index)
    }

    pub fn stop_coordinates(&self) -> Vec<Coordinate> {
        self.normalized_stops().iter().map(|s| s.coordinate).collect()
    }
}

/// A parent's subscription to a stop on a route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSubscription {
    pub route_id: RouteId,
    pub stop_id: StopId,
    #[serde(default = "default_true")]
    pub notifications_enabled: bool,
}

fn default_true() -> bool {
    true
}

/// "Bus approaching" alert. Consumed once by the notification scheduler.
#[derive(Debug, Clone, PartialEq)]
pub struct ProximityAlert {
    pub bus_id: BusId,
    pub route_id: RouteId,
    pub target_stop_id: StopId,
    pub target_stop_index: usize,
    pub target_stop_name: String,
    pub eta_minutes: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stop(index: usize, lat: f64, lon: f64) -> RouteStop {
        RouteStop {
            id: StopId::new(format!("stop-{}", index)),
            name: format!("Stop {}", index),
            address: String::new(),
            coordinate: Coordinate::new(lat, lon),
            index,
        }
    }

    fn route(stops: Vec<RouteStop>) -> RouteInfo {
        RouteInfo {
            id: RouteId::new("r1"),
            bus_id: BusId::new("b1"),
            name: "Morning".to_string(),
            stops,
            polyline: None,
        }
    }

    #[test]
    fn test_sanitized_sample_clamps_speed() {
        let sample = PositionSample::new(
            BusId::new("b1"),
            RouteId::new("r1"),
            Coordinate::new(37.0, -122.0),
            -5.0,
        );
        assert_eq!(sample.sanitized(DEFAULT_COORDINATES).speed_kmh, 0.0);

        let nan = PositionSample {
            speed_kmh: f64::NAN,
            ..sample.clone()
        };
        assert_eq!(nan.sanitized(DEFAULT_COORDINATES).speed_kmh, 0.0);
    }

    #[test]
    fn test_sanitized_sample_replaces_bad_coordinate() {
        let fallback = Coordinate::new(1.0, 2.0);
        let sample = PositionSample::new(
            BusId::new("b1"),
            RouteId::new("r1"),
            Coordinate::new(f64::NAN, -122.0),
            30.0,
        );

        let clean = sample.sanitized(fallback);
        assert_eq!(clean.coordinate, fallback);
        assert_eq!(clean.speed_kmh, 30.0);
        assert_eq!(clean.captured_at, sample.captured_at);
    }

    #[test]
    fn test_normalized_stops_sorted_and_sanitized() {
        let info = route(vec![
            stop(2, 3.0, 3.0),
            stop(0, 1.0, 1.0),
            stop(1, f64::INFINITY, 2.0),
        ]);

        let stops = info.normalized_stops();
        let indices: Vec<usize> = stops.iter().map(|s| s.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        // Invalid stop takes its predecessor's position
        assert_eq!(stops[1].coordinate, Coordinate::new(1.0, 1.0));
    }

    #[test]
    fn test_contiguous_stops() {
        assert!(route(vec![stop(1, 0.0, 0.0), stop(0, 0.0, 0.0)]).has_contiguous_stops());
        assert!(!route(vec![stop(0, 0.0, 0.0), stop(2, 0.0, 0.0)]).has_contiguous_stops());
        assert!(!route(vec![stop(0, 0.0, 0.0), stop(0, 0.0, 0.0)]).has_contiguous_stops());
        assert!(route(vec![]).has_contiguous_stops());
    }

    #[test]
    fn test_route_stop_json_shape() {
        let json = r#"{"id": "s1", "name": "Oak St", "latitude": 37.1, "longitude": -122.2, "index": 0}"#;
        let stop: RouteStop = serde_json::from_str(json).unwrap();

        assert_eq!(stop.id, StopId::new("s1"));
        assert_eq!(stop.address, "");
        assert_eq!(stop.coordinate, Coordinate::new(37.1, -122.2));
    }

    #[test]
    fn test_subscription_notifications_default_on() {
        let json = r#"{"routeId": "r1", "stopId": "s3"}"#;
        let sub: RouteSubscription = serde_json::from_str(json).unwrap();
        assert!(sub.notifications_enabled);
    }
}
