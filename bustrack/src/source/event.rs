//! Stream events and the sink they are delivered through.

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::tracking::{BusId, PositionSample, RouteId};

/// Everything a position stream can report.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Subscription acknowledged (or transport reconnected).
    Connected,
    /// Transport lost; distinct from a data update.
    Disconnected,
    /// A new position report.
    SampleReceived(PositionSample),
    /// The source reports the bus arrived at a stop.
    StopReached { stop_index: usize },
    /// Terminal failure; no more events follow.
    Error(String),
}

impl StreamEvent {
    /// Short name for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::SampleReceived(_) => "sample",
            Self::StopReached { .. } => "stop_reached",
            Self::Error(_) => "error",
        }
    }
}

/// What a stream subscription follows.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StreamTarget {
    Route(RouteId),
    Bus(BusId),
}

impl fmt::Display for StreamTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Route(id) => write!(f, "route:{}", id),
            Self::Bus(id) => write!(f, "bus:{}", id),
        }
    }
}

/// Parameters for [`super::PositionStreamSource::subscribe`].
#[derive(Clone)]
pub struct SubscribeRequest {
    pub target: StreamTarget,
    /// Opaque bearer token from the auth token provider.
    pub auth_token: String,
}

impl SubscribeRequest {
    pub fn new(target: StreamTarget, auth_token: impl Into<String>) -> Self {
        Self {
            target,
            auth_token: auth_token.into(),
        }
    }
}

// Keep the token out of logs
impl fmt::Debug for SubscribeRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscribeRequest")
            .field("target", &self.target)
            .field("auth_token", &"<redacted>")
            .finish()
    }
}

/// Typed callback receiving stream events.
///
/// `send` returns `false` once the receiving side is gone; sources stop
/// their delivery loop when that happens.
#[derive(Clone)]
pub struct EventSink {
    deliver: Arc<dyn Fn(StreamEvent) -> bool + Send + Sync>,
}

impl EventSink {
    pub fn new<F>(deliver: F) -> Self
    where
        F: Fn(StreamEvent) -> bool + Send + Sync + 'static,
    {
        Self {
            deliver: Arc::new(deliver),
        }
    }

    /// Sink that forwards into an unbounded channel.
    pub fn from_channel(tx: mpsc::UnboundedSender<StreamEvent>) -> Self {
        Self::new(move |event| tx.send(event).is_ok())
    }

    pub fn send(&self, event: StreamEvent) -> bool {
        (self.deliver)(event)
    }
}

impl fmt::Debug for EventSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSink").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_sink_reports_closed_receiver() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = EventSink::from_channel(tx);

        assert!(sink.send(StreamEvent::Connected));
        assert_eq!(rx.try_recv().unwrap(), StreamEvent::Connected);

        drop(rx);
        assert!(!sink.send(StreamEvent::Disconnected));
    }

    #[test]
    fn test_request_debug_redacts_token() {
        let request = SubscribeRequest::new(StreamTarget::Route(RouteId::new("r1")), "secret");
        let debug = format!("{:?}", request);
        assert!(!debug.contains("secret"));
        assert!(debug.contains("redacted"));
    }

    #[test]
    fn test_target_display() {
        assert_eq!(StreamTarget::Route(RouteId::new("r1")).to_string(), "route:r1");
        assert_eq!(StreamTarget::Bus(BusId::new("b7")).to_string(), "bus:b7");
    }
}
