//! Push source - server-pushed position frames.
//!
//! The backend pushes `bus:update` and `bus:stop` frames to clients that
//! joined a route or bus room with a `subscribe:*` control message.
//!
//! # Design
//!
//! - `subscribe()` spawns one receiver task per subscription
//! - The task connects with the bearer token, sends `subscribe:route` or
//!   `subscribe:bus`, then emits `Connected`
//! - Each text frame is parsed as a [`ServerMessage`]; frames for other
//!   routes or buses are skipped, unparseable frames are logged and skipped
//! - `alert:upcoming_stop` frames are ignored; alerts are raised locally
//! - A refused connection or a closed connection emits `Error`
//! - Cancelling the subscription sends the matching `unsubscribe:*`
//!
//! The socket itself sits behind [`PushConnector`]. [`MemoryPushHub`] is an
//! in-process connector for replay and tests.

mod memory;

use std::future::Future;
use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::source::{
    EventSink, PositionStreamSource, StreamError, StreamEvent, StreamSubscription, StreamTarget,
    SubscribeRequest,
};
use crate::tracking::BusId;
use crate::wire::{ControlMessage, ServerMessage};

pub use memory::{MemoryConnection, MemoryPushHub};

/// Reason reported when the server drops the connection.
pub const CONNECTION_CLOSED: &str = "push connection closed";

/// Errors from a push connection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PushError {
    /// Server refused the connection (bad token, unreachable).
    #[error("Push connection refused: {0}")]
    Refused(String),

    /// Connection is no longer open.
    #[error("Push connection closed")]
    Closed,
}

/// One open push connection.
pub trait PushConnection: Send + 'static {
    /// Queues a control message for the server. Never blocks.
    fn send(&self, message: &ControlMessage) -> Result<(), PushError>;

    /// Next text frame; `None` once the server closed the connection.
    fn recv(&mut self) -> impl Future<Output = Option<String>> + Send;
}

/// Opens push connections.
pub trait PushConnector: Send + Sync + 'static {
    type Connection: PushConnection;

    fn connect(
        &self,
        auth_token: &str,
    ) -> impl Future<Output = Result<Self::Connection, PushError>> + Send;
}

/// Position source fed by server-pushed frames.
pub struct PushSource<C: PushConnector> {
    connector: Arc<C>,
}

impl<C: PushConnector> Clone for PushSource<C> {
    fn clone(&self) -> Self {
        Self {
            connector: Arc::clone(&self.connector),
        }
    }
}

impl<C: PushConnector> PushSource<C> {
    pub fn new(connector: C) -> Self {
        Self::with_shared_connector(Arc::new(connector))
    }

    pub fn with_shared_connector(connector: Arc<C>) -> Self {
        Self { connector }
    }
}

impl<C: PushConnector> PositionStreamSource for PushSource<C> {
    fn name(&self) -> &'static str {
        "push"
    }

    fn subscribe(
        &self,
        request: SubscribeRequest,
        sink: EventSink,
    ) -> Result<StreamSubscription, StreamError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| StreamError::NoRuntime)?;

        let cancellation = CancellationToken::new();
        let receiver = Receiver {
            connector: Arc::clone(&self.connector),
            request,
            sink,
            cancellation: cancellation.clone(),
        };

        let task = runtime.spawn(receiver.run());
        Ok(StreamSubscription::new(cancellation, task))
    }
}

struct Receiver<C: PushConnector> {
    connector: Arc<C>,
    request: SubscribeRequest,
    sink: EventSink,
    cancellation: CancellationToken,
}

impl<C: PushConnector> Receiver<C> {
    async fn run(self) {
        let target = self.request.target.clone();

        let connected = tokio::select! {
            result = self.connector.connect(&self.request.auth_token) => result,
            _ = self.cancellation.cancelled() => return,
        };
        let connection = match connected {
            Ok(connection) => connection,
            Err(e) => {
                warn!(stream = %target, error = %e, "Push connection failed");
                self.deliver(StreamEvent::Error(e.to_string()));
                return;
            }
        };

        if let Err(e) = connection.send(&ControlMessage::subscribe(&target)) {
            warn!(stream = %target, error = %e, "Push subscribe failed");
            self.deliver(StreamEvent::Error(e.to_string()));
            return;
        }

        // Dropping this (including on task abort) leaves the room
        let mut room = Room {
            connection,
            target: target.clone(),
            open: true,
        };
        info!(stream = %target, "Push stream subscribed");

        if !self.deliver(StreamEvent::Connected) {
            return;
        }

        let mut tracked_bus = match &target {
            StreamTarget::Bus(id) => Some(id.clone()),
            StreamTarget::Route(_) => None,
        };
        let mut frames_received: u64 = 0;
        let mut frames_skipped: u64 = 0;

        loop {
            let frame = tokio::select! {
                frame = room.connection.recv() => frame,
                _ = self.cancellation.cancelled() => break,
            };

            let Some(text) = frame else {
                room.open = false;
                warn!(stream = %target, frames_received, "Push connection closed by server");
                self.deliver(StreamEvent::Error(CONNECTION_CLOSED.to_string()));
                break;
            };
            frames_received += 1;

            let message = match serde_json::from_str::<ServerMessage>(&text) {
                Ok(message) => message,
                Err(e) => {
                    frames_skipped += 1;
                    debug!(stream = %target, error = %e, "Skipping unparseable frame");
                    continue;
                }
            };

            match frame_event(message, &target, &mut tracked_bus) {
                Some(event) => {
                    if !self.deliver(event) {
                        break;
                    }
                }
                None => frames_skipped += 1,
            }
        }

        info!(
            stream = %target,
            frames_received,
            frames_skipped,
            "Push stream stopped"
        );
    }

    fn deliver(&self, event: StreamEvent) -> bool {
        !self.cancellation.is_cancelled() && self.sink.send(event)
    }
}

/// Joined room on an open connection.
struct Room<T: PushConnection> {
    connection: T,
    target: StreamTarget,
    open: bool,
}

impl<T: PushConnection> Drop for Room<T> {
    fn drop(&mut self) {
        if !self.open {
            return;
        }
        if let Err(e) = self.connection.send(&ControlMessage::unsubscribe(&self.target)) {
            trace!(stream = %self.target, error = %e, "Unsubscribe not sent");
        }
    }
}

/// Maps a pushed message to the event it means for `target`.
///
/// `bus:stop` frames carry no route, so on a route stream they are only
/// attributed once a `bus:update` has named the route's bus.
fn frame_event(
    message: ServerMessage,
    target: &StreamTarget,
    tracked_bus: &mut Option<BusId>,
) -> Option<StreamEvent> {
    match message {
        ServerMessage::BusUpdate(update) => {
            let ours = match target {
                StreamTarget::Route(id) => update.route_id == *id,
                StreamTarget::Bus(id) => update.bus_id == *id,
            };
            if !ours {
                return None;
            }
            *tracked_bus = Some(update.bus_id.clone());
            Some(StreamEvent::SampleReceived(update.to_sample()))
        }
        ServerMessage::BusStop(stop) => {
            if tracked_bus.as_ref() != Some(&stop.bus_id) {
                return None;
            }
            Some(StreamEvent::StopReached {
                stop_index: stop.stop_index,
            })
        }
        ServerMessage::UpcomingStop(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::RouteId;
    use crate::wire::{BusStopMessage, BusUpdateMessage};
    use serde_json::json;
    use tokio::sync::mpsc;

    fn subscribe(
        hub: &MemoryPushHub,
        target: StreamTarget,
    ) -> (StreamSubscription, mpsc::UnboundedReceiver<StreamEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let source = PushSource::new(hub.clone());
        let subscription = source
            .subscribe(SubscribeRequest::new(target, "token"), EventSink::from_channel(tx))
            .unwrap();
        (subscription, rx)
    }

    fn update_frame(bus: &str, route: &str, lat: f64) -> String {
        json!({
            "event": "bus:update",
            "data": {
                "busId": bus,
                "routeId": route,
                "lat": lat,
                "lng": -122.42,
                "speed": 28.0,
                "timestamp": "2026-03-01T07:30:00Z"
            }
        })
        .to_string()
    }

    fn stop_frame(bus: &str, stop_index: usize) -> String {
        json!({
            "event": "bus:stop",
            "data": {
                "busId": bus,
                "stopId": format!("s{}", stop_index),
                "stopIndex": stop_index,
                "timestamp": "2026-03-01T07:31:00Z"
            }
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_subscribe_then_connected() {
        let hub = MemoryPushHub::new();
        let (_sub, mut rx) = subscribe(&hub, StreamTarget::Route(RouteId::new("r1")));

        assert_eq!(rx.recv().await, Some(StreamEvent::Connected));
        assert_eq!(
            hub.controls(),
            vec![ControlMessage::SubscribeRoute(RouteId::new("r1"))]
        );
        assert_eq!(hub.connection_count(), 1);
    }

    #[tokio::test]
    async fn test_route_frames_become_events() {
        let hub = MemoryPushHub::new();
        let (_sub, mut rx) = subscribe(&hub, StreamTarget::Route(RouteId::new("r1")));
        assert_eq!(rx.recv().await, Some(StreamEvent::Connected));

        // Stop before any update cannot be attributed to the route's bus
        hub.push_frame(stop_frame("b1", 0));
        hub.push_frame(update_frame("b2", "other", 37.0));
        hub.push_frame("not json");
        hub.push_frame(update_frame("b1", "r1", 37.775));
        hub.push_frame(stop_frame("b9", 1));
        hub.push_frame(stop_frame("b1", 1));

        match rx.recv().await {
            Some(StreamEvent::SampleReceived(sample)) => {
                assert_eq!(sample.bus_id, BusId::new("b1"));
                assert_eq!(sample.coordinate.latitude, 37.775);
                assert_eq!(sample.speed_kmh, 28.0);
            }
            other => panic!("expected sample, got {:?}", other),
        }
        assert_eq!(rx.recv().await, Some(StreamEvent::StopReached { stop_index: 1 }));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_bus_stream_accepts_stops_immediately() {
        let hub = MemoryPushHub::new();
        let (_sub, mut rx) = subscribe(&hub, StreamTarget::Bus(BusId::new("b1")));
        assert_eq!(rx.recv().await, Some(StreamEvent::Connected));

        hub.push_frame(stop_frame("b1", 2));
        assert_eq!(rx.recv().await, Some(StreamEvent::StopReached { stop_index: 2 }));
        assert_eq!(hub.controls(), vec![ControlMessage::SubscribeBus(BusId::new("b1"))]);
    }

    #[tokio::test]
    async fn test_upcoming_stop_frames_are_ignored() {
        let hub = MemoryPushHub::new();
        let (_sub, mut rx) = subscribe(&hub, StreamTarget::Route(RouteId::new("r1")));
        assert_eq!(rx.recv().await, Some(StreamEvent::Connected));

        let alert = json!({
            "event": "alert:upcoming_stop",
            "data": {
                "busId": "b1",
                "routeId": "r1",
                "stopId": "s2",
                "stopIndex": 2,
                "stopName": "Maple Ave",
                "eta": 4
            }
        });
        hub.push_frame(alert.to_string());
        hub.push_frame(update_frame("b1", "r1", 37.78));

        assert!(matches!(rx.recv().await, Some(StreamEvent::SampleReceived(_))));
    }

    #[tokio::test]
    async fn test_cancel_sends_unsubscribe() {
        let hub = MemoryPushHub::new();
        let (mut sub, mut rx) = subscribe(&hub, StreamTarget::Route(RouteId::new("r1")));
        assert_eq!(rx.recv().await, Some(StreamEvent::Connected));

        sub.cancel();
        // Sink is dropped with the task
        assert_eq!(rx.recv().await, None);

        assert_eq!(
            hub.controls(),
            vec![
                ControlMessage::SubscribeRoute(RouteId::new("r1")),
                ControlMessage::UnsubscribeRoute(RouteId::new("r1")),
            ]
        );
        assert_eq!(hub.push_frame(update_frame("b1", "r1", 37.78)), 0);
    }

    #[tokio::test]
    async fn test_refused_connection_is_terminal() {
        let hub = MemoryPushHub::new();
        hub.refuse("Unauthorized");
        let (_sub, mut rx) = subscribe(&hub, StreamTarget::Route(RouteId::new("r1")));

        assert_eq!(
            rx.recv().await,
            Some(StreamEvent::Error(
                "Push connection refused: Unauthorized".to_string()
            ))
        );
        assert_eq!(rx.recv().await, None);
        assert!(hub.controls().is_empty());
    }

    #[tokio::test]
    async fn test_server_close_is_terminal() {
        let hub = MemoryPushHub::new();
        let (_sub, mut rx) = subscribe(&hub, StreamTarget::Route(RouteId::new("r1")));
        assert_eq!(rx.recv().await, Some(StreamEvent::Connected));

        hub.close_all();

        assert_eq!(
            rx.recv().await,
            Some(StreamEvent::Error(CONNECTION_CLOSED.to_string()))
        );
        assert_eq!(rx.recv().await, None);
        // No unsubscribe on a connection the server already closed
        assert_eq!(hub.controls().len(), 1);
    }

    #[test]
    fn test_subscribe_requires_runtime() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let source = PushSource::new(MemoryPushHub::new());
        let result = source.subscribe(
            SubscribeRequest::new(StreamTarget::Route(RouteId::new("r1")), "token"),
            EventSink::from_channel(tx),
        );
        assert!(matches!(result, Err(StreamError::NoRuntime)));
    }

    #[test]
    fn test_frame_event_filters_by_target() {
        let target = StreamTarget::Bus(BusId::new("b1"));
        let mut tracked = Some(BusId::new("b1"));
        let update = BusUpdateMessage {
            bus_id: BusId::new("b2"),
            route_id: RouteId::new("r1"),
            lat: 1.0,
            lng: 2.0,
            speed: 0.0,
            timestamp: "2026-03-01T07:30:00Z".parse().unwrap(),
        };
        assert_eq!(
            frame_event(ServerMessage::BusUpdate(update), &target, &mut tracked),
            None
        );

        let stop = BusStopMessage {
            bus_id: BusId::new("b1"),
            stop_id: crate::tracking::StopId::new("s3"),
            stop_index: 3,
            timestamp: "2026-03-01T07:30:00Z".parse().unwrap(),
        };
        assert_eq!(
            frame_event(ServerMessage::BusStop(stop), &target, &mut tracked),
            Some(StreamEvent::StopReached { stop_index: 3 })
        );
    }
}
