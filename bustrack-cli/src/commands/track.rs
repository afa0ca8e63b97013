//! Track command - follow a route's bus live.
//!
//! Opens one tracking session, then reports snapshots and proximity alerts
//! until the duration elapses, the stream fails, or Ctrl+C.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bustrack::source::push::MemoryPushHub;
use bustrack::tracking::{
    spawn_snapshot_logger, LogNotifier, ProximityAlert, RouteId, SessionHandle, SessionState,
    TrackingManager, TrackingSnapshot, DEFAULT_LOG_INTERVAL,
};
use bustrack::wire::{BusUpdateMessage, ServerMessage, UpcomingStopAlertMessage};
use clap::Args;
use tokio::runtime::Runtime;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::common::{load_directory, load_replay, replay_factory, source_factory, SourceArg};
use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the track command.
#[derive(Debug, Args)]
pub struct TrackArgs {
    /// Route to track
    #[arg(long)]
    pub route: String,

    /// Auth token issued at sign-in
    #[arg(long)]
    pub token: String,

    /// Routes file (JSON); without it the built-in 'demo' route is used
    #[arg(long)]
    pub routes: Option<PathBuf>,

    /// Stop after this many seconds
    #[arg(long)]
    pub duration: Option<u64>,

    /// Seed for the simulated source
    #[arg(long)]
    pub seed: Option<u64>,

    /// Position source (overrides config)
    #[arg(long, value_enum, conflicts_with = "replay")]
    pub source: Option<SourceArg>,

    /// Replay pushed server frames (JSON lines) instead of a live source
    #[arg(long)]
    pub replay: Option<PathBuf>,

    /// Print bus updates and alerts as JSON lines on stdout
    #[arg(long)]
    pub json: bool,

    /// Config file (defaults to ~/.bustrack/config.ini)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

/// Run the track command.
pub fn run(args: TrackArgs) -> Result<(), CliError> {
    let runner = CliRunner::new(args.config.as_deref(), args.debug)?;
    runner.log_startup("track");
    let config = runner.config();

    let directory = load_directory(args.routes.as_deref())?;
    let kind = args.source.map(Into::into).unwrap_or(config.stream.source);
    let replay = args.replay.as_deref().map(load_replay).transpose()?;

    let runtime = Runtime::new().map_err(|e| CliError::Runtime(e.to_string()))?;
    let _guard = runtime.enter();

    let cancellation = CancellationToken::new();
    let (factory, source_label) = match replay {
        Some(frames) => {
            let hub = MemoryPushHub::new();
            info!(frames = frames.len(), "Replaying pushed frames");
            runtime.spawn(replay_frames(
                hub.clone(),
                frames,
                Duration::from_millis(config.stream.tick_interval_ms),
                cancellation.clone(),
            ));
            (replay_factory(hub), "replay".to_string())
        }
        None => (source_factory(kind, config, args.seed)?, kind.to_string()),
    };
    let manager = TrackingManager::with_config(
        Arc::new(directory),
        factory,
        Arc::new(LogNotifier),
        config.tracking_config(),
    );

    let route_id = RouteId::new(args.route.as_str());
    let mut snapshots = manager.subscribe();
    let mut alerts = manager.subscribe_alerts();
    let handle = manager.open(&route_id, &args.token)?;
    info!(route_id = %route_id, source = %source_label, "Tracking started");

    if !args.json {
        println!("Tracking route {} ({} source)", route_id, source_label);
        println!("Press Ctrl+C to stop");
    }

    let logger = tracing::enabled!(tracing::Level::DEBUG).then(|| {
        spawn_snapshot_logger(manager.clone(), cancellation.clone(), DEFAULT_LOG_INTERVAL)
    });

    let deadline = args.duration.map(Duration::from_secs);
    let outcome = runtime.block_on(async {
        let sleep = async {
            match deadline {
                Some(d) => tokio::time::sleep(d).await,
                None => std::future::pending().await,
            }
        };
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                _ = &mut sleep => {
                    info!("Tracking duration elapsed");
                    return Ok(());
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupted");
                    return Ok(());
                }
                result = alerts.recv() => match result {
                    Ok(alert) => report_alert(&alert, args.json),
                    Err(RecvError::Lagged(n)) => debug!(skipped = n, "Alert receiver lagged"),
                    Err(RecvError::Closed) => return Ok(()),
                },
                result = snapshots.recv() => match result {
                    Ok(snapshot) if snapshot.route_id == route_id => {
                        report_snapshot(&manager, &handle, &snapshot, args.json);
                        if snapshot.state == SessionState::Idle {
                            let reason = manager
                                .last_error(&route_id)
                                .unwrap_or_else(|| "session closed".to_string());
                            return Err(CliError::Runtime(reason));
                        }
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(n)) => debug!(skipped = n, "Snapshot receiver lagged"),
                    Err(RecvError::Closed) => return Ok(()),
                },
            }
        }
    });

    manager.close(&handle);
    cancellation.cancel();
    if let Some(logger) = logger {
        join_logger(&runtime, logger);
    }

    if !args.json {
        println!("Stopped tracking route {}", route_id);
    }
    outcome
}

/// Pushes one frame per `interval` until the frames run out.
async fn replay_frames(
    hub: MemoryPushHub,
    frames: Vec<String>,
    interval: Duration,
    cancellation: CancellationToken,
) {
    for (index, frame) in frames.into_iter().enumerate() {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = cancellation.cancelled() => return,
        }
        let delivered = hub.push_frame(frame);
        debug!(frame = index, delivered, "Replayed frame");
    }
    info!("Replay finished");
}

/// Waits for the snapshot logger; returns false if the task failed.
fn join_logger(runtime: &Runtime, logger: JoinHandle<()>) -> bool {
    match runtime.block_on(logger) {
        Ok(()) => true,
        Err(e) => {
            debug!(error = %e, "Snapshot logger task ended abnormally");
            false
        }
    }
}

fn report_alert(alert: &ProximityAlert, json: bool) {
    if json {
        print_json(&ServerMessage::UpcomingStop(UpcomingStopAlertMessage::from(alert)));
    } else {
        println!(
            "ALERT: bus {} is {} minute(s) from {}",
            alert.bus_id, alert.eta_minutes, alert.target_stop_name
        );
    }
}

fn report_snapshot(
    manager: &TrackingManager,
    handle: &SessionHandle,
    snapshot: &TrackingSnapshot,
    json: bool,
) {
    if json {
        let sample = manager
            .session(handle)
            .and_then(|session| session.latest_sample);
        if let Some(sample) = sample.filter(|_| snapshot.is_fresh) {
            print_json(&ServerMessage::BusUpdate(BusUpdateMessage::from_sample(&sample)));
        }
        return;
    }

    match (snapshot.coordinate, snapshot.current_stop_index) {
        (Some(coordinate), Some(stop)) => println!(
            "[{}] {} at {} ({:.0} km/h), stop {}",
            snapshot.state,
            snapshot.bus_id,
            coordinate,
            snapshot.speed_kmh.unwrap_or_default(),
            stop + 1
        ),
        (Some(coordinate), None) => {
            println!("[{}] {} at {}", snapshot.state, snapshot.bus_id, coordinate)
        }
        _ => println!("[{}] waiting for position", snapshot.state),
    }
}

fn print_json(message: &ServerMessage) {
    match serde_json::to_string(message) {
        Ok(line) => println!("{}", line),
        Err(e) => warn!(error = %e, "Failed to encode message"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_replay_frames_paced_by_interval() {
        use bustrack::source::push::{PushConnection, PushConnector};

        let hub = MemoryPushHub::new();
        let mut connection = hub.connect("t").await.unwrap();
        let frames = vec!["one".to_string(), "two".to_string()];
        let task = tokio::spawn(replay_frames(
            hub.clone(),
            frames,
            Duration::from_secs(1),
            CancellationToken::new(),
        ));

        assert_eq!(connection.recv().await.as_deref(), Some("one"));
        assert_eq!(connection.recv().await.as_deref(), Some("two"));
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_frames_stops_on_cancel() {
        let hub = MemoryPushHub::new();
        let cancellation = CancellationToken::new();
        cancellation.cancel();

        replay_frames(hub, vec!["one".to_string()], Duration::from_secs(1), cancellation).await;
    }

    #[test]
    fn test_join_logger_reports_clean_exit() {
        let runtime = Runtime::new().unwrap();
        let logger = runtime.spawn(async {});
        assert!(join_logger(&runtime, logger));
    }

    #[test]
    fn test_join_logger_survives_aborted_task() {
        let runtime = Runtime::new().unwrap();
        let logger = runtime.spawn(std::future::pending::<()>());
        logger.abort();
        assert!(!join_logger(&runtime, logger));
    }
}
