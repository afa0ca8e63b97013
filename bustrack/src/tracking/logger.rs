//! Periodic session logging.
//!
//! Background task that logs every open session at a fixed interval, for
//! diagnosing stream gaps after the fact.
//!
//! # Output Format
//!
//! Logs are emitted at DEBUG level with structured fields:
//! - `route_id`, `bus_id` - Session identity
//! - `state` - Session lifecycle state
//! - `lat`, `lon` - Last known position, if any
//! - `speed_kmh` - Last reported speed
//! - `stop` / `subscriber_stop` - Current and subscriber stop indices
//! - `fresh` - Whether the position came from a live stream

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::manager::TrackingManager;
use super::state::TrackingSnapshot;

/// Default logging interval.
pub const DEFAULT_LOG_INTERVAL: Duration = Duration::from_secs(20);

/// Spawns a task that logs all sessions every `interval` until cancelled.
///
/// Check `tracing::enabled!(tracing::Level::DEBUG)` before spawning; the
/// task does nothing useful otherwise.
pub fn spawn_snapshot_logger(
    manager: TrackingManager,
    cancellation: CancellationToken,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    for snapshot in manager.snapshots() {
                        log_snapshot(&snapshot);
                    }
                }
                _ = cancellation.cancelled() => {
                    tracing::debug!("Session logger stopped");
                    break;
                }
            }
        }
    })
}

fn log_snapshot(snapshot: &TrackingSnapshot) {
    match snapshot.coordinate {
        Some(coordinate) => tracing::debug!(
            route_id = %snapshot.route_id,
            bus_id = %snapshot.bus_id,
            state = %snapshot.state,
            lat = format!("{:.5}", coordinate.latitude),
            lon = format!("{:.5}", coordinate.longitude),
            speed_kmh = format!("{:.0}", snapshot.speed_kmh.unwrap_or_default()),
            stop = ?snapshot.current_stop_index,
            subscriber_stop = ?snapshot.subscriber_stop_index,
            fresh = snapshot.is_fresh,
            "Session update"
        ),
        None => tracing::debug!(
            route_id = %snapshot.route_id,
            state = %snapshot.state,
            "Session update (no position yet)"
        ),
    }
}
