//! Error types for position stream sources.

use thiserror::Error;

/// Errors raised when a stream subscription cannot be set up.
///
/// Failures after a subscription is running are delivered as
/// [`super::StreamEvent::Error`] instead.
#[derive(Debug, Error)]
pub enum StreamError {
    /// The source needs a Tokio runtime and none is running.
    #[error("No async runtime available to drive the stream")]
    NoRuntime,

    /// The source rejected the subscription request.
    #[error("Subscription rejected: {0}")]
    Rejected(String),

    /// The source could not be built.
    #[error("Stream source unavailable: {0}")]
    Unavailable(String),
}
