//! Bus status client trait and reqwest implementation.

use std::future::Future;
use std::time::Duration;

use super::error::TransportError;
use crate::source::StreamTarget;
use crate::wire::BusStatusMessage;

/// Trait for fetching the current status of a tracked bus.
pub trait BusStatusClient: Send + Sync {
    /// Fetch the latest status for `target`, authorized by `auth_token`.
    fn fetch_status(
        &self,
        target: &StreamTarget,
        auth_token: &str,
    ) -> impl Future<Output = Result<BusStatusMessage, TransportError>> + Send;
}

/// Path of the status endpoint for a target, relative to the API base.
pub fn status_path(target: &StreamTarget) -> String {
    match target {
        StreamTarget::Route(id) => format!("/buses/route/{}/status", id),
        StreamTarget::Bus(id) => format!("/buses/{}/status", id),
    }
}

/// Status client using direct HTTP requests.
///
/// Holds a reusable `reqwest::Client` with connection pooling and timeouts.
pub struct HttpBusStatusClient {
    http: reqwest::Client,
    api_url: String,
}

impl HttpBusStatusClient {
    pub fn new(api_url: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::ClientBuild(e.to_string()))?;

        Ok(Self {
            http,
            api_url: api_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn status_url(&self, target: &StreamTarget) -> String {
        format!("{}{}", self.api_url, status_path(target))
    }
}

impl BusStatusClient for HttpBusStatusClient {
    async fn fetch_status(
        &self,
        target: &StreamTarget,
        auth_token: &str,
    ) -> Result<BusStatusMessage, TransportError> {
        let url = self.status_url(target);

        let response = self
            .http
            .get(&url)
            .bearer_auth(auth_token)
            .send()
            .await
            .map_err(|e| TransportError::HttpError(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(TransportError::Unauthorized);
        }
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| TransportError::HttpError(e.to_string()))?;

        let message: BusStatusMessage =
            serde_json::from_slice(&bytes).map_err(|e| TransportError::JsonError(e.to_string()))?;

        tracing::trace!(
            url = %url,
            bus_id = %message.id,
            stop_index = ?message.current_stop_index,
            "Bus status fetched"
        );

        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::{BusId, RouteId};

    #[test]
    fn test_status_paths() {
        assert_eq!(
            status_path(&StreamTarget::Route(RouteId::new("r1"))),
            "/buses/route/r1/status"
        );
        assert_eq!(
            status_path(&StreamTarget::Bus(BusId::new("b1"))),
            "/buses/b1/status"
        );
    }

    #[test]
    fn test_status_url_trims_trailing_slash() {
        let client =
            HttpBusStatusClient::new("https://bus.example.com/api/", Duration::from_secs(1))
                .unwrap();
        assert_eq!(
            client.status_url(&StreamTarget::Route(RouteId::new("r1"))),
            "https://bus.example.com/api/buses/route/r1/status"
        );
    }
}
