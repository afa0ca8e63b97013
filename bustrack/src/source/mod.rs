//! Position Stream Sources
//!
//! Abstraction over wherever bus positions come from. A source turns a
//! [`SubscribeRequest`] into a stream of [`StreamEvent`]s delivered through
//! an [`EventSink`], and hands back a [`StreamSubscription`] that owns the
//! delivery loop.
//!
//! # Sources
//!
//! - [`SimulatedSource`] - Timer-driven bounce motion over fixed waypoints
//! - [`http::HttpPollingSource`] - Polls the backend status endpoint with backoff
//! - [`push::PushSource`] - Server-pushed `bus:update` / `bus:stop` frames
//! - [`ManualSource`] - Events pushed by the caller (replay, tests)
//!
//! # Ownership
//!
//! Sources are built per session through a [`StreamSourceFactory`]; no
//! source keeps process-wide timers or listener maps. Cancelling or
//! dropping the subscription stops delivery.

mod error;
mod event;
pub mod http;
mod manual;
pub mod push;
mod simulated;
mod subscription;

pub use error::StreamError;
pub use event::{EventSink, StreamEvent, StreamTarget, SubscribeRequest};
pub use manual::ManualSource;
pub use simulated::{
    BounceMotion, SampleGenerator, SimulatedSource, SimulatedSourceConfig, DEFAULT_CONNECT_DELAY,
    DEFAULT_JITTER_DEG, DEFAULT_SPEED_MAX_KMH, DEFAULT_SPEED_MIN_KMH, DEFAULT_TICK_INTERVAL,
    REFERENCE_WAYPOINTS,
};
pub use subscription::StreamSubscription;

use crate::tracking::RouteInfo;

/// A producer of position events.
pub trait PositionStreamSource: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Starts delivering events for `request.target` to `sink`.
    ///
    /// Delivery continues until the returned subscription is cancelled or
    /// dropped, or the source emits [`StreamEvent::Error`].
    fn subscribe(
        &self,
        request: SubscribeRequest,
        sink: EventSink,
    ) -> Result<StreamSubscription, StreamError>;
}

/// Builds a fresh source for each session.
pub trait StreamSourceFactory: Send + Sync {
    fn create(&self, route: &RouteInfo) -> Result<Box<dyn PositionStreamSource>, StreamError>;
}

impl<F> StreamSourceFactory for F
where
    F: Fn(&RouteInfo) -> Result<Box<dyn PositionStreamSource>, StreamError> + Send + Sync,
{
    fn create(&self, route: &RouteInfo) -> Result<Box<dyn PositionStreamSource>, StreamError> {
        self(route)
    }
}
