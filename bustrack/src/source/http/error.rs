//! Error types for the HTTP status transport.

use thiserror::Error;

/// Errors that can occur when polling the bus status endpoint.
#[derive(Debug, Error)]
pub enum TransportError {
    /// HTTP client could not be built.
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),

    /// Request failed before a response arrived.
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    /// Server rejected the bearer token.
    #[error("Unauthorized")]
    Unauthorized,

    /// Server answered with a non-success status.
    #[error("Unexpected HTTP status {0}")]
    Status(u16),

    /// JSON deserialization failed.
    #[error("Failed to parse response: {0}")]
    JsonError(String),
}

impl TransportError {
    /// Errors that retrying cannot fix.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Unauthorized | Self::ClientBuild(_))
    }
}
