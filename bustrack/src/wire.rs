//! JSON wire types exchanged with a live tracking backend.
//!
//! Server-pushed messages and client control messages share one envelope,
//! `{"event": "<name>", "data": {...}}`. Payload fields are camelCase; the
//! status poll response also accepts the backend's snake_case names.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::coord::Coordinate;
use crate::source::StreamTarget;
use crate::tracking::{BusId, PositionSample, ProximityAlert, RouteId, StopId};

/// Position update for one bus (`bus:update`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusUpdateMessage {
    pub bus_id: BusId,
    pub route_id: RouteId,
    pub lat: f64,
    pub lng: f64,
    /// km/h
    pub speed: f64,
    pub timestamp: DateTime<Utc>,
}

impl BusUpdateMessage {
    pub fn from_sample(sample: &PositionSample) -> Self {
        Self {
            bus_id: sample.bus_id.clone(),
            route_id: sample.route_id.clone(),
            lat: sample.coordinate.latitude,
            lng: sample.coordinate.longitude,
            speed: sample.speed_kmh,
            timestamp: sample.captured_at,
        }
    }

    /// Converts to a sample. The coordinate is not sanitized here.
    pub fn to_sample(&self) -> PositionSample {
        PositionSample {
            bus_id: self.bus_id.clone(),
            route_id: self.route_id.clone(),
            coordinate: Coordinate::new(self.lat, self.lng),
            speed_kmh: self.speed,
            captured_at: self.timestamp,
        }
    }
}

/// Bus arrived at a stop (`bus:stop`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusStopMessage {
    pub bus_id: BusId,
    pub stop_id: StopId,
    pub stop_index: usize,
    pub timestamp: DateTime<Utc>,
}

/// Bus is approaching a subscriber's stop (`alert:upcoming_stop`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpcomingStopAlertMessage {
    pub bus_id: BusId,
    pub route_id: RouteId,
    pub stop_id: StopId,
    pub stop_index: usize,
    pub stop_name: String,
    /// Minutes
    pub eta: u32,
}

impl From<&ProximityAlert> for UpcomingStopAlertMessage {
    fn from(alert: &ProximityAlert) -> Self {
        Self {
            bus_id: alert.bus_id.clone(),
            route_id: alert.route_id.clone(),
            stop_id: alert.target_stop_id.clone(),
            stop_index: alert.target_stop_index,
            stop_name: alert.target_stop_name.clone(),
            eta: alert.eta_minutes,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

/// Response of the bus status poll endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusStatusMessage {
    #[serde(alias = "bus_id")]
    pub id: BusId,
    #[serde(alias = "route_id")]
    pub route_id: RouteId,
    #[serde(alias = "current_location")]
    pub current_location: LatLng,
    #[serde(default)]
    pub speed: f64,
    #[serde(default, alias = "last_update")]
    pub last_update: Option<DateTime<Utc>>,
    #[serde(default, alias = "current_stop_index")]
    pub current_stop_index: Option<usize>,
}

impl BusStatusMessage {
    /// Converts to a sample, stamped with the server time when present.
    pub fn to_sample(&self) -> PositionSample {
        PositionSample {
            bus_id: self.id.clone(),
            route_id: self.route_id.clone(),
            coordinate: Coordinate::new(self.current_location.lat, self.current_location.lng),
            speed_kmh: self.speed,
            captured_at: self.last_update.unwrap_or_else(Utc::now),
        }
    }
}

/// Messages pushed by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerMessage {
    #[serde(rename = "bus:update")]
    BusUpdate(BusUpdateMessage),
    #[serde(rename = "bus:stop")]
    BusStop(BusStopMessage),
    #[serde(rename = "alert:upcoming_stop")]
    UpcomingStop(UpcomingStopAlertMessage),
}

/// Subscribe/unsubscribe requests sent by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ControlMessage {
    #[serde(rename = "subscribe:route")]
    SubscribeRoute(RouteId),
    #[serde(rename = "subscribe:bus")]
    SubscribeBus(BusId),
    #[serde(rename = "unsubscribe:route")]
    UnsubscribeRoute(RouteId),
    #[serde(rename = "unsubscribe:bus")]
    UnsubscribeBus(BusId),
}

impl ControlMessage {
    pub fn subscribe(target: &StreamTarget) -> Self {
        match target {
            StreamTarget::Route(id) => Self::SubscribeRoute(id.clone()),
            StreamTarget::Bus(id) => Self::SubscribeBus(id.clone()),
        }
    }

    pub fn unsubscribe(target: &StreamTarget) -> Self {
        match target {
            StreamTarget::Route(id) => Self::UnsubscribeRoute(id.clone()),
            StreamTarget::Bus(id) => Self::UnsubscribeBus(id.clone()),
        }
    }
}
