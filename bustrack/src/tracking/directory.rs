//! Route/stop data provider.
//!
//! The tracking core only reads routes and subscriptions; managing them is
//! someone else's job. [`RouteDirectory`] is that read-only seam, and
//! [`StaticRouteDirectory`] an in-memory implementation that can be loaded
//! from a JSON routes file:
//!
//! ```json
//! {
//!   "routes": [
//!     {"id": "r1", "busId": "b1", "name": "Morning", "stops": [
//!       {"id": "s0", "name": "Depot", "latitude": 37.77, "longitude": -122.42, "index": 0}
//!     ]}
//!   ],
//!   "subscriptions": [{"routeId": "r1", "stopId": "s0"}]
//! }
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use super::ids::RouteId;
use super::model::{RouteInfo, RouteSubscription};

/// Read access to routes and the user's subscriptions.
pub trait RouteDirectory: Send + Sync {
    fn route(&self, route_id: &RouteId) -> Option<RouteInfo>;

    /// The user's subscription on a route, if any.
    fn subscription(&self, route_id: &RouteId) -> Option<RouteSubscription>;
}

/// Errors loading a routes file.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Failed to read routes file {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse routes: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Route '{route_id}' is invalid: {reason}")]
    InvalidRoute { route_id: String, reason: String },
}

#[derive(Deserialize)]
struct RoutesFile {
    routes: Vec<RouteInfo>,
    #[serde(default)]
    subscriptions: Vec<RouteSubscription>,
}

/// In-memory route directory.
#[derive(Debug, Clone, Default)]
pub struct StaticRouteDirectory {
    routes: HashMap<RouteId, RouteInfo>,
    subscriptions: HashMap<RouteId, RouteSubscription>,
}

impl StaticRouteDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a route, replacing any with the same id.
    ///
    /// Stop indices must be unique and contiguous from zero.
    pub fn insert_route(&mut self, route: RouteInfo) -> Result<(), DirectoryError> {
        if !route.has_contiguous_stops() {
            return Err(DirectoryError::InvalidRoute {
                route_id: route.id.to_string(),
                reason: "stop indices must be unique and contiguous from 0".to_string(),
            });
        }
        self.routes.insert(route.id.clone(), route);
        Ok(())
    }

    pub fn insert_subscription(&mut self, subscription: RouteSubscription) {
        self.subscriptions
            .insert(subscription.route_id.clone(), subscription);
    }

    pub fn with_route(mut self, route: RouteInfo) -> Result<Self, DirectoryError> {
        self.insert_route(route)?;
        Ok(self)
    }

    pub fn with_subscription(mut self, subscription: RouteSubscription) -> Self {
        self.insert_subscription(subscription);
        self
    }

    pub fn from_json(json: &str) -> Result<Self, DirectoryError> {
        let file: RoutesFile = serde_json::from_str(json)?;

        let mut directory = Self::new();
        for route in file.routes {
            directory.insert_route(route)?;
        }
        for subscription in file.subscriptions {
            directory.insert_subscription(subscription);
        }

        tracing::debug!(
            routes = directory.routes.len(),
            subscriptions = directory.subscriptions.len(),
            "Route directory loaded"
        );

        Ok(directory)
    }

    pub fn load(path: &Path) -> Result<Self, DirectoryError> {
        let json = std::fs::read_to_string(path).map_err(|source| DirectoryError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn route_ids(&self) -> Vec<RouteId> {
        let mut ids: Vec<RouteId> = self.routes.keys().cloned().collect();
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        ids
    }
}

impl RouteDirectory for StaticRouteDirectory {
    fn route(&self, route_id: &RouteId) -> Option<RouteInfo> {
        self.routes.get(route_id).cloned()
    }

    fn subscription(&self, route_id: &RouteId) -> Option<RouteSubscription> {
        self.subscriptions.get(route_id).cloned()
    }
}
