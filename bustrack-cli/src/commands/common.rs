//! Common types and utilities shared across CLI commands.

use std::path::Path;
use std::sync::Arc;

use bustrack::config::{ConfigFile, SourceKind};
use bustrack::source::http::{HttpBusStatusClient, HttpPollingSource};
use bustrack::source::push::{MemoryPushHub, PushSource};
use bustrack::source::{
    PositionStreamSource, SimulatedSource, StreamError, StreamSourceFactory, REFERENCE_WAYPOINTS,
};
use bustrack::tracking::{
    BusId, RouteId, RouteInfo, RouteStop, RouteSubscription, StaticRouteDirectory, StopId,
};
use clap::ValueEnum;

use crate::error::CliError;

/// Route id of the built-in demo route.
pub const DEMO_ROUTE_ID: &str = "demo";

/// Position source selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum SourceArg {
    /// Simulated bus bouncing along the route's stops
    Simulated,
    /// Poll the backend status endpoint
    Http,
}

impl From<SourceArg> for SourceKind {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::Simulated => SourceKind::Simulated,
            SourceArg::Http => SourceKind::Http,
        }
    }
}

/// Loads the routes file, or the built-in demo route without one.
pub fn load_directory(routes: Option<&Path>) -> Result<StaticRouteDirectory, CliError> {
    match routes {
        Some(path) => Ok(StaticRouteDirectory::load(path)?),
        None => demo_directory(),
    }
}

/// One route over the reference waypoints, subscribed at its last stop.
pub fn demo_directory() -> Result<StaticRouteDirectory, CliError> {
    let stops: Vec<RouteStop> = REFERENCE_WAYPOINTS
        .iter()
        .enumerate()
        .map(|(index, coordinate)| RouteStop {
            id: StopId::new(format!("demo-stop-{}", index)),
            name: format!("Stop {}", index + 1),
            address: String::new(),
            coordinate: *coordinate,
            index,
        })
        .collect();
    let last_stop = stops
        .last()
        .map(|s| s.id.clone())
        .ok_or_else(|| CliError::Config("demo route has no stops".to_string()))?;

    let route = RouteInfo {
        id: RouteId::new(DEMO_ROUTE_ID),
        bus_id: BusId::new("demo-bus"),
        name: "Demo Route".to_string(),
        stops,
        polyline: None,
    };

    Ok(StaticRouteDirectory::new()
        .with_route(route)?
        .with_subscription(RouteSubscription {
            route_id: RouteId::new(DEMO_ROUTE_ID),
            stop_id: last_stop,
            notifications_enabled: true,
        }))
}

/// Builds the per-session source factory for `kind`.
///
/// Simulated sessions bounce along their route's stops; HTTP sessions share
/// one pooled client.
pub fn source_factory(
    kind: SourceKind,
    config: &ConfigFile,
    seed: Option<u64>,
) -> Result<Arc<dyn StreamSourceFactory>, CliError> {
    match kind {
        SourceKind::Simulated => {
            let mut sim_config = config.simulated_source_config();
            if seed.is_some() {
                sim_config.seed = seed;
            }

            let factory = move |route: &RouteInfo| -> Result<Box<dyn PositionStreamSource>, StreamError> {
                let mut session_config = sim_config.clone();
                let waypoints = route.stop_coordinates();
                if !waypoints.is_empty() {
                    session_config.waypoints = waypoints;
                }
                Ok(Box::new(SimulatedSource::new(
                    route.bus_id.clone(),
                    route.id.clone(),
                    session_config,
                )))
            };
            Ok(Arc::new(factory))
        }
        SourceKind::Http => {
            let http_config = config.http_source_config();
            let client = HttpBusStatusClient::new(
                http_config.api_url.clone(),
                http_config.request_timeout,
            )
            .map_err(|e| CliError::Config(e.to_string()))?;
            let client = Arc::new(client);

            let factory = move |_: &RouteInfo| -> Result<Box<dyn PositionStreamSource>, StreamError> {
                Ok(Box::new(HttpPollingSource::with_shared_client(
                    Arc::clone(&client),
                    http_config.clone(),
                )))
            };
            Ok(Arc::new(factory))
        }
    }
}

/// Factory whose sessions follow frames pushed into `hub`.
pub fn replay_factory(hub: MemoryPushHub) -> Arc<dyn StreamSourceFactory> {
    let hub = Arc::new(hub);
    let factory = move |_: &RouteInfo| -> Result<Box<dyn PositionStreamSource>, StreamError> {
        Ok(Box::new(PushSource::with_shared_connector(Arc::clone(&hub))))
    };
    Arc::new(factory)
}

/// Reads a replay file: one pushed server frame per non-blank line.
pub fn load_replay(path: &Path) -> Result<Vec<String>, CliError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| CliError::Replay(format!("{}: {}", path.display(), e)))?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bustrack::tracking::RouteDirectory;

    #[test]
    fn test_demo_directory() {
        let directory = demo_directory().unwrap();
        let route = directory.route(&RouteId::new(DEMO_ROUTE_ID)).unwrap();

        assert_eq!(route.stops.len(), REFERENCE_WAYPOINTS.len());
        let subscription = directory.subscription(&route.id).unwrap();
        assert_eq!(subscription.stop_id, StopId::new("demo-stop-7"));
    }

    #[test]
    fn test_simulated_factory_builds_sources() {
        let factory = source_factory(SourceKind::Simulated, &ConfigFile::default(), Some(1)).unwrap();
        let directory = demo_directory().unwrap();
        let route = directory.route(&RouteId::new(DEMO_ROUTE_ID)).unwrap();

        let source = factory.create(&route).unwrap();
        assert_eq!(source.name(), "simulated");
    }

    #[tokio::test]
    async fn test_replay_factory_builds_push_sources() {
        let factory = replay_factory(MemoryPushHub::new());
        let directory = demo_directory().unwrap();
        let route = directory.route(&RouteId::new(DEMO_ROUTE_ID)).unwrap();

        assert_eq!(factory.create(&route).unwrap().name(), "push");
    }

    #[test]
    fn test_load_replay_skips_blank_lines() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("frames.jsonl");
        std::fs::write(&path, "{\"a\":1}\n\n  \n{\"b\":2}\n").unwrap();

        let frames = load_replay(&path).unwrap();
        assert_eq!(frames, vec!["{\"a\":1}", "{\"b\":2}"]);
        assert!(matches!(
            load_replay(&temp_dir.path().join("missing.jsonl")),
            Err(CliError::Replay(_))
        ));
    }

    #[test]
    fn test_source_arg_conversion() {
        assert_eq!(SourceKind::from(SourceArg::Http), SourceKind::Http);
        assert_eq!(SourceKind::from(SourceArg::Simulated), SourceKind::Simulated);
    }
}
