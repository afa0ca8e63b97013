//! HTTP polling source - poll loop over the bus status endpoint.
//!
//! # Design
//!
//! - `subscribe()` spawns one poll task per subscription
//! - The task polls on a `tokio::time::interval`
//! - The first success emits `Connected`; the first failure of an outage
//!   emits `Disconnected` once
//! - Failures back off exponentially (2^n seconds, capped at one minute)
//! - After `max_retries` consecutive failures the task emits `Error` and stops
//! - A change in the reported stop index emits `StopReached`

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::client::BusStatusClient;
use super::config::HttpSourceConfig;
use super::error::TransportError;
use crate::source::{
    EventSink, PositionStreamSource, StreamError, StreamEvent, StreamSubscription,
    SubscribeRequest,
};

/// Maximum backoff duration.
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Position source polling a [`BusStatusClient`].
pub struct HttpPollingSource<C: BusStatusClient> {
    client: Arc<C>,
    config: HttpSourceConfig,
}

impl<C: BusStatusClient> Clone for HttpPollingSource<C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            config: self.config.clone(),
        }
    }
}

impl<C: BusStatusClient + 'static> HttpPollingSource<C> {
    pub fn new(client: C, config: HttpSourceConfig) -> Self {
        Self::with_shared_client(Arc::new(client), config)
    }

    /// Builds a source over a client shared with other sources.
    pub fn with_shared_client(client: Arc<C>, config: HttpSourceConfig) -> Self {
        Self { client, config }
    }
}

impl<C: BusStatusClient + 'static> PositionStreamSource for HttpPollingSource<C> {
    fn name(&self) -> &'static str {
        "http"
    }

    fn subscribe(
        &self,
        request: SubscribeRequest,
        sink: EventSink,
    ) -> Result<StreamSubscription, StreamError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| StreamError::NoRuntime)?;

        let cancellation = CancellationToken::new();
        let poller = Poller {
            client: Arc::clone(&self.client),
            config: self.config.clone(),
            request,
            sink,
            cancellation: cancellation.clone(),
        };

        let task = runtime.spawn(poller.run());
        Ok(StreamSubscription::new(cancellation, task))
    }
}

struct Poller<C: BusStatusClient> {
    client: Arc<C>,
    config: HttpSourceConfig,
    request: SubscribeRequest,
    sink: EventSink,
    cancellation: CancellationToken,
}

impl<C: BusStatusClient> Poller<C> {
    async fn run(self) {
        tracing::info!(
            stream = %self.request.target,
            api_url = %self.config.api_url,
            poll_interval_secs = self.config.poll_interval.as_secs(),
            max_retries = self.config.max_retries,
            "HTTP position stream started"
        );

        let mut interval = tokio::time::interval(self.config.poll_interval);
        let mut consecutive_errors: u32 = 0;
        let mut connected = false;
        let mut outage_reported = false;
        let mut last_stop_index: Option<usize> = None;

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = self.cancellation.cancelled() => break,
            }

            // Apply backoff if we've had consecutive errors
            if consecutive_errors > 0 {
                let backoff = calculate_backoff(consecutive_errors);
                tracing::debug!(
                    backoff_secs = backoff.as_secs(),
                    consecutive_errors,
                    "Backing off after errors"
                );
                tokio::select! {
                    _ = tokio::time::sleep(backoff) => {}
                    _ = self.cancellation.cancelled() => break,
                }
            }

            let result = tokio::select! {
                result = self.client.fetch_status(&self.request.target, &self.request.auth_token) => result,
                _ = self.cancellation.cancelled() => break,
            };

            match result {
                Ok(status) => {
                    if consecutive_errors > 0 {
                        tracing::info!(consecutive_errors, "HTTP position stream recovered");
                    }
                    consecutive_errors = 0;
                    outage_reported = false;

                    if !connected {
                        connected = true;
                        if !self.deliver(StreamEvent::Connected) {
                            break;
                        }
                    }

                    if !self.deliver(StreamEvent::SampleReceived(status.to_sample())) {
                        break;
                    }

                    if let Some(stop_index) = status.current_stop_index {
                        if last_stop_index != Some(stop_index) {
                            last_stop_index = Some(stop_index);
                            if !self.deliver(StreamEvent::StopReached { stop_index }) {
                                break;
                            }
                        }
                    }
                }
                Err(e) if e.is_terminal() => {
                    tracing::warn!(error = %e, "HTTP position stream rejected");
                    self.deliver(StreamEvent::Error(e.to_string()));
                    break;
                }
                Err(e) => {
                    consecutive_errors += 1;
                    connected = false;
                    tracing::warn!(
                        error = %e,
                        consecutive_errors,
                        "Failed to fetch bus status"
                    );

                    if consecutive_errors >= self.config.max_retries {
                        self.deliver(StreamEvent::Error(unavailable_reason(
                            consecutive_errors,
                            &e,
                        )));
                        break;
                    }

                    if !outage_reported {
                        outage_reported = true;
                        if !self.deliver(StreamEvent::Disconnected) {
                            break;
                        }
                    }
                }
            }
        }

        tracing::info!(stream = %self.request.target, "HTTP position stream stopped");
    }

    fn deliver(&self, event: StreamEvent) -> bool {
        !self.cancellation.is_cancelled() && self.sink.send(event)
    }
}

fn unavailable_reason(attempts: u32, last_error: &TransportError) -> String {
    format!(
        "stream unavailable after {} attempts: {}",
        attempts, last_error
    )
}

/// Calculate exponential backoff: 2^n seconds, capped at MAX_BACKOFF.
fn calculate_backoff(consecutive_errors: u32) -> Duration {
    let secs = 2u64.saturating_pow(consecutive_errors.min(20));
    Duration::from_secs(secs).min(MAX_BACKOFF)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::Coordinate;
    use crate::source::StreamTarget;
    use crate::tracking::{BusId, RouteId};
    use crate::wire::{BusStatusMessage, LatLng};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    /// Mock client replaying scripted results; fails once the script is empty.
    struct ScriptedClient {
        script: Mutex<VecDeque<Result<BusStatusMessage, TransportError>>>,
        seen_tokens: Mutex<Vec<String>>,
    }

    impl ScriptedClient {
        fn new(script: Vec<Result<BusStatusMessage, TransportError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                seen_tokens: Mutex::new(Vec::new()),
            }
        }
    }

    impl BusStatusClient for ScriptedClient {
        async fn fetch_status(
            &self,
            _target: &StreamTarget,
            auth_token: &str,
        ) -> Result<BusStatusMessage, TransportError> {
            self.seen_tokens.lock().unwrap().push(auth_token.to_string());
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(TransportError::Status(503)))
        }
    }

    fn status(stop_index: Option<usize>) -> BusStatusMessage {
        BusStatusMessage {
            id: BusId::new("bus-1"),
            route_id: RouteId::new("route-1"),
            current_location: LatLng {
                lat: 37.78,
                lng: -122.41,
            },
            speed: 30.0,
            last_update: None,
            current_stop_index: stop_index,
        }
    }

    fn config(max_retries: u32) -> HttpSourceConfig {
        HttpSourceConfig {
            poll_interval: Duration::from_secs(1),
            max_retries,
            ..Default::default()
        }
    }

    fn subscribe(
        client: ScriptedClient,
        max_retries: u32,
    ) -> (
        Arc<ScriptedClient>,
        StreamSubscription,
        mpsc::UnboundedReceiver<StreamEvent>,
    ) {
        let client = Arc::new(client);
        let source = HttpPollingSource::with_shared_client(Arc::clone(&client), config(max_retries));
        let (tx, rx) = mpsc::unbounded_channel();
        let request =
            SubscribeRequest::new(StreamTarget::Route(RouteId::new("route-1")), "tok-123");

        let subscription = source.subscribe(request, EventSink::from_channel(tx)).unwrap();
        (client, subscription, rx)
    }

    #[test]
    fn test_calculate_backoff() {
        assert_eq!(calculate_backoff(0), Duration::from_secs(1));
        assert_eq!(calculate_backoff(1), Duration::from_secs(2));
        assert_eq!(calculate_backoff(2), Duration::from_secs(4));
        assert_eq!(calculate_backoff(5), Duration::from_secs(32));
        assert_eq!(calculate_backoff(6), MAX_BACKOFF); // 64 > 60
        assert_eq!(calculate_backoff(40), MAX_BACKOFF);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_emits_connected_sample_and_stop() {
        let client = ScriptedClient::new(vec![
            Ok(status(Some(1))),
            Ok(status(Some(1))),
            Ok(status(Some(2))),
        ]);
        let (client, _sub, mut rx) = subscribe(client, 5);

        assert_eq!(rx.recv().await, Some(StreamEvent::Connected));

        match rx.recv().await {
            Some(StreamEvent::SampleReceived(sample)) => {
                assert_eq!(sample.coordinate, Coordinate::new(37.78, -122.41));
                assert_eq!(sample.speed_kmh, 30.0);
            }
            other => panic!("Expected sample, got {:?}", other),
        }
        assert_eq!(rx.recv().await, Some(StreamEvent::StopReached { stop_index: 1 }));

        // Same stop index again: sample only
        assert!(matches!(rx.recv().await, Some(StreamEvent::SampleReceived(_))));
        assert!(matches!(rx.recv().await, Some(StreamEvent::SampleReceived(_))));
        assert_eq!(rx.recv().await, Some(StreamEvent::StopReached { stop_index: 2 }));

        assert_eq!(client.seen_tokens.lock().unwrap()[0], "tok-123");
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_exhausted_emits_single_disconnect_then_error() {
        let client = ScriptedClient::new(vec![]);
        let (_client, _sub, mut rx) = subscribe(client, 3);

        assert_eq!(rx.recv().await, Some(StreamEvent::Disconnected));
        match rx.recv().await {
            Some(StreamEvent::Error(reason)) => {
                assert!(reason.contains("stream unavailable after 3 attempts"), "{}", reason);
            }
            other => panic!("Expected error, got {:?}", other),
        }
        // Task ended and dropped the sink
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovery_reconnects() {
        let client = ScriptedClient::new(vec![
            Ok(status(None)),
            Err(TransportError::HttpError("reset".to_string())),
            Ok(status(None)),
        ]);
        let (_client, _sub, mut rx) = subscribe(client, 5);

        assert_eq!(rx.recv().await, Some(StreamEvent::Connected));
        assert!(matches!(rx.recv().await, Some(StreamEvent::SampleReceived(_))));
        assert_eq!(rx.recv().await, Some(StreamEvent::Disconnected));
        assert_eq!(rx.recv().await, Some(StreamEvent::Connected));
        assert!(matches!(rx.recv().await, Some(StreamEvent::SampleReceived(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unauthorized_is_terminal() {
        let client = ScriptedClient::new(vec![Err(TransportError::Unauthorized)]);
        let (_client, _sub, mut rx) = subscribe(client, 5);

        assert_eq!(
            rx.recv().await,
            Some(StreamEvent::Error("Unauthorized".to_string()))
        );
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_polling() {
        let client = ScriptedClient::new(vec![Ok(status(None))]);
        let (_client, mut sub, mut rx) = subscribe(client, 5);

        assert_eq!(rx.recv().await, Some(StreamEvent::Connected));
        sub.cancel();

        // Drain anything delivered before the cancel, then the channel closes
        while let Some(event) = rx.recv().await {
            assert!(matches!(event, StreamEvent::SampleReceived(_)));
        }
    }
}
