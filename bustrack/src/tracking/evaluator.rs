//! Proximity Alert Evaluator
//!
//! Decides when the tracked bus is close enough to the subscriber's stop to
//! raise a "bus approaching" alert.
//!
//! # Policies
//!
//! - [`AlertPolicy::WithinThreshold`] (default): fire once the bus is at most
//!   `stops_ahead` stops away. A jump over several stops still fires.
//! - [`AlertPolicy::ExactDistance`]: fire only when the bus is exactly
//!   `stops_ahead` stops away. A jump across that point never fires.
//!
//! Either way an alert fires at most once per approach: the session's
//! `last_alerted_stop_index` is set to the target stop on fire.

use std::fmt;
use std::str::FromStr;

use super::eta::{stop_path_distance_m, EtaEstimator};
use super::model::ProximityAlert;
use super::state::TrackingSession;

/// Default number of stops ahead at which to alert.
pub const DEFAULT_STOPS_AHEAD: usize = 2;

/// When an approaching bus triggers an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlertPolicy {
    /// `0 < remaining <= stops_ahead`
    #[default]
    WithinThreshold,
    /// `remaining == stops_ahead`
    ExactDistance,
}

impl AlertPolicy {
    fn should_fire(&self, remaining_stops: i64, stops_ahead: usize) -> bool {
        let stops_ahead = stops_ahead as i64;
        match self {
            Self::WithinThreshold => remaining_stops > 0 && remaining_stops <= stops_ahead,
            Self::ExactDistance => remaining_stops == stops_ahead,
        }
    }
}

impl fmt::Display for AlertPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WithinThreshold => write!(f, "threshold"),
            Self::ExactDistance => write!(f, "exact"),
        }
    }
}

impl FromStr for AlertPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "threshold" | "within_threshold" => Ok(Self::WithinThreshold),
            "exact" | "exact_distance" => Ok(Self::ExactDistance),
            other => Err(format!(
                "unknown alert policy '{}', expected 'threshold' or 'exact'",
                other
            )),
        }
    }
}

/// Configuration for the evaluator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvaluatorConfig {
    pub stops_ahead: usize,
    pub policy: AlertPolicy,
    pub eta: EtaEstimator,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            stops_ahead: DEFAULT_STOPS_AHEAD,
            policy: AlertPolicy::default(),
            eta: EtaEstimator::default(),
        }
    }
}

/// Stateless evaluator; all per-approach state lives in the session.
#[derive(Debug, Clone, Default)]
pub struct ProximityEvaluator {
    config: EvaluatorConfig,
}

impl ProximityEvaluator {
    pub fn new(config: EvaluatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    /// Checks the session and returns an alert if one should fire now.
    ///
    /// Returns `None` silently when stop data is missing: no subscriber
    /// stop, a subscriber stop no longer on the route, or no current stop
    /// index yet. On fire, records the target stop in
    /// `last_alerted_stop_index`.
    pub fn evaluate(&self, session: &mut TrackingSession) -> Option<ProximityAlert> {
        if !session.notifications_enabled {
            return None;
        }

        let current = session.current_stop_index?;
        let target = session.stop_by_id(session.subscriber_stop_id.as_ref()?)?.clone();

        if session.last_alerted_stop_index == Some(target.index) {
            return None;
        }

        let remaining = target.index as i64 - current as i64;
        if !self.config.policy.should_fire(remaining, self.config.stops_ahead) {
            return None;
        }

        let distance_m = stop_path_distance_m(&session.stops, current, target.index);
        let eta_minutes = self
            .config
            .eta
            .estimate(session.speed_history.iter().copied(), distance_m);

        session.last_alerted_stop_index = Some(target.index);

        tracing::info!(
            route_id = %session.route_id,
            bus_id = %session.bus_id,
            stop = %target.name,
            stop_index = target.index,
            current_stop_index = current,
            eta_minutes,
            "Proximity alert raised"
        );

        Some(ProximityAlert {
            bus_id: session.bus_id.clone(),
            route_id: session.route_id.clone(),
            target_stop_id: target.id,
            target_stop_index: target.index,
            target_stop_name: target.name,
            eta_minutes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::Coordinate;
    use crate::tracking::{BusId, RouteId, RouteStop, StopId};
    use std::sync::Arc;

    fn stops(count: usize) -> Arc<[RouteStop]> {
        (0..count)
            .map(|i| RouteStop {
                id: StopId::new(format!("s{}", i)),
                name: format!("Stop {}", i),
                address: String::new(),
                coordinate: Coordinate::new(37.77 + i as f64 * 0.005, -122.42),
                index: i,
            })
            .collect::<Vec<_>>()
            .into()
    }

    fn session(stop_count: usize, subscriber: usize) -> TrackingSession {
        TrackingSession::new(RouteId::new("r1"), BusId::new("b1"), stops(stop_count))
            .with_subscriber_stop(StopId::new(format!("s{}", subscriber)), true)
    }

    fn feed(
        evaluator: &ProximityEvaluator,
        session: &mut TrackingSession,
        indices: &[usize],
    ) -> Vec<(usize, ProximityAlert)> {
        indices
            .iter()
            .filter_map(|&index| {
                session.current_stop_index = Some(index);
                evaluator.evaluate(session).map(|alert| (index, alert))
            })
            .collect()
    }

    #[test]
    fn test_fires_two_stops_ahead_once() {
        let evaluator = ProximityEvaluator::default();
        let mut session = session(4, 3);

        let alerts = feed(&evaluator, &mut session, &[0, 1, 2, 3]);

        assert_eq!(alerts.len(), 1);
        let (at, alert) = &alerts[0];
        assert_eq!(*at, 1);
        assert_eq!(alert.target_stop_index, 3);
        assert_eq!(alert.target_stop_id, StopId::new("s3"));
        assert_eq!(alert.target_stop_name, "Stop 3");
        assert_eq!(session.last_alerted_stop_index, Some(3));
    }

    #[test]
    fn test_threshold_fires_after_skipped_stop() {
        let evaluator = ProximityEvaluator::default();
        let mut session = session(6, 5);

        // Jumps from 2 straight to 4, skipping the exact 2-away point
        let alerts = feed(&evaluator, &mut session, &[0, 2, 4, 5]);

        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].0, 4);
    }

    #[test]
    fn test_exact_policy_misses_skipped_stop() {
        let evaluator = ProximityEvaluator::new(EvaluatorConfig {
            policy: AlertPolicy::ExactDistance,
            ..Default::default()
        });
        let mut session = session(6, 5);

        assert!(feed(&evaluator, &mut session, &[0, 2, 4, 5]).is_empty());

        let mut session = self::session(6, 5);
        let alerts = feed(&evaluator, &mut session, &[0, 2, 3, 4, 5]);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].0, 3);
    }

    #[test]
    fn test_no_alert_at_or_past_stop() {
        let evaluator = ProximityEvaluator::default();
        let mut session = session(4, 1);

        assert!(feed(&evaluator, &mut session, &[1, 2, 3]).is_empty());
    }

    #[test]
    fn test_no_repeat_on_bounce_back() {
        let evaluator = ProximityEvaluator::default();
        let mut session = session(5, 4);

        let alerts = feed(&evaluator, &mut session, &[0, 1, 2, 3, 4, 3, 2, 1, 2, 3]);
        assert_eq!(alerts.len(), 1);
    }

    #[test]
    fn test_missing_stop_data_is_silent() {
        let evaluator = ProximityEvaluator::default();

        // Subscriber stop not on the route
        let mut session = TrackingSession::new(RouteId::new("r1"), BusId::new("b1"), stops(4))
            .with_subscriber_stop(StopId::new("gone"), true);
        assert!(feed(&evaluator, &mut session, &[0, 1, 2]).is_empty());

        // No subscription at all
        let mut session = TrackingSession::new(RouteId::new("r1"), BusId::new("b1"), stops(4));
        assert!(feed(&evaluator, &mut session, &[0, 1, 2]).is_empty());

        // No current stop yet
        let mut session = self::session(4, 3);
        assert!(evaluator.evaluate(&mut session).is_none());
    }

    #[test]
    fn test_notifications_disabled_is_silent() {
        let evaluator = ProximityEvaluator::default();
        let mut session = TrackingSession::new(RouteId::new("r1"), BusId::new("b1"), stops(4))
            .with_subscriber_stop(StopId::new("s3"), false);

        assert!(feed(&evaluator, &mut session, &[0, 1, 2]).is_empty());
        assert_eq!(session.last_alerted_stop_index, None);
    }

    #[test]
    fn test_eta_uses_fallback_without_history() {
        let evaluator = ProximityEvaluator::default();
        let mut session = session(4, 3);

        let alerts = feed(&evaluator, &mut session, &[1]);
        assert_eq!(alerts[0].1.eta_minutes, 10);
    }

    #[test]
    fn test_eta_uses_speed_history() {
        let evaluator = ProximityEvaluator::default();
        let mut session = session(4, 3);
        for _ in 0..3 {
            session.record_speed(30.0);
        }

        let alerts = feed(&evaluator, &mut session, &[1]);
        // Two legs of ~556 m at 30 km/h ≈ 2.2 minutes
        assert_eq!(alerts[0].1.eta_minutes, 3);
    }

    #[test]
    fn test_larger_stops_ahead() {
        let evaluator = ProximityEvaluator::new(EvaluatorConfig {
            stops_ahead: 3,
            ..Default::default()
        });
        let mut session = session(6, 5);

        let alerts = feed(&evaluator, &mut session, &[0, 1, 2, 3]);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].0, 2);
    }

    #[test]
    fn test_policy_parse_and_display() {
        assert_eq!("threshold".parse::<AlertPolicy>(), Ok(AlertPolicy::WithinThreshold));
        assert_eq!(" EXACT ".parse::<AlertPolicy>(), Ok(AlertPolicy::ExactDistance));
        assert!("sometimes".parse::<AlertPolicy>().is_err());
        assert_eq!(AlertPolicy::ExactDistance.to_string(), "exact");
    }
}
