//! Caller-driven position source.
//!
//! Nothing is emitted on its own: the owner pushes events with
//! [`ManualSource::emit`]. Used for replaying recorded traces and as the
//! stream double in tests, where a clone also reports the subscription count.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use super::error::StreamError;
use super::event::{EventSink, StreamEvent, StreamTarget, SubscribeRequest};
use super::subscription::StreamSubscription;
use super::PositionStreamSource;

struct Registration {
    target: StreamTarget,
    token: CancellationToken,
    sink: EventSink,
}

#[derive(Default)]
struct ManualInner {
    registrations: Vec<Registration>,
    total_subscriptions: usize,
}

/// Position source fed by its owner. Clones share subscribers.
#[derive(Clone, Default)]
pub struct ManualSource {
    inner: Arc<Mutex<ManualInner>>,
}

impl ManualSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers `event` to every live subscription.
    ///
    /// Returns the number of subscriptions that accepted it. Cancelled
    /// subscriptions are pruned and never see the event.
    pub fn emit(&self, event: StreamEvent) -> usize {
        let sinks: Vec<(CancellationToken, EventSink)> = {
            let mut inner = self.inner.lock();
            inner.registrations.retain(|r| !r.token.is_cancelled());
            inner
                .registrations
                .iter()
                .map(|r| (r.token.clone(), r.sink.clone()))
                .collect()
        };

        // Sinks run without our lock held; they may re-enter the source
        sinks
            .into_iter()
            .filter(|(token, sink)| !token.is_cancelled() && sink.send(event.clone()))
            .count()
    }

    /// Delivers `event` only to subscriptions following `target`.
    pub fn emit_to(&self, target: &StreamTarget, event: StreamEvent) -> usize {
        let sinks: Vec<(CancellationToken, EventSink)> = {
            let mut inner = self.inner.lock();
            inner.registrations.retain(|r| !r.token.is_cancelled());
            inner
                .registrations
                .iter()
                .filter(|r| &r.target == target)
                .map(|r| (r.token.clone(), r.sink.clone()))
                .collect()
        };

        sinks
            .into_iter()
            .filter(|(token, sink)| !token.is_cancelled() && sink.send(event.clone()))
            .count()
    }

    /// Subscriptions that have not been cancelled.
    pub fn active_subscriptions(&self) -> usize {
        self.inner
            .lock()
            .registrations
            .iter()
            .filter(|r| !r.token.is_cancelled())
            .count()
    }

    /// Every `subscribe` call ever accepted.
    pub fn total_subscriptions(&self) -> usize {
        self.inner.lock().total_subscriptions
    }
}

impl PositionStreamSource for ManualSource {
    fn name(&self) -> &'static str {
        "manual"
    }

    fn subscribe(
        &self,
        request: SubscribeRequest,
        sink: EventSink,
    ) -> Result<StreamSubscription, StreamError> {
        let cancellation = CancellationToken::new();

        let mut inner = self.inner.lock();
        inner.total_subscriptions += 1;
        inner.registrations.push(Registration {
            target: request.target,
            token: cancellation.clone(),
            sink,
        });

        Ok(StreamSubscription::detached(cancellation))
    }
}
