//! In-process push connector.

use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::{PushConnection, PushConnector, PushError};
use crate::wire::ControlMessage;

#[derive(Default)]
struct HubInner {
    connections: Vec<mpsc::UnboundedSender<String>>,
    controls: Vec<ControlMessage>,
    refusal: Option<String>,
}

/// Connector whose "server" is the caller.
///
/// Frames handed to [`push_frame`](Self::push_frame) reach every open
/// connection; control messages sent by clients are recorded in order.
/// Clones share the same hub.
#[derive(Clone, Default)]
pub struct MemoryPushHub {
    inner: Arc<Mutex<HubInner>>,
}

impl MemoryPushHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sends a text frame to every open connection. Returns how many got it.
    pub fn push_frame(&self, frame: impl Into<String>) -> usize {
        let frame = frame.into();
        let mut inner = self.inner.lock();
        inner.connections.retain(|tx| !tx.is_closed());
        inner
            .connections
            .iter()
            .filter(|tx| tx.send(frame.clone()).is_ok())
            .count()
    }

    /// Closes every open connection from the server side.
    pub fn close_all(&self) {
        self.inner.lock().connections.clear();
    }

    /// Refuses later connections with `reason`.
    pub fn refuse(&self, reason: impl Into<String>) {
        self.inner.lock().refusal = Some(reason.into());
    }

    /// Control messages received so far.
    pub fn controls(&self) -> Vec<ControlMessage> {
        self.inner.lock().controls.clone()
    }

    pub fn connection_count(&self) -> usize {
        let mut inner = self.inner.lock();
        inner.connections.retain(|tx| !tx.is_closed());
        inner.connections.len()
    }
}

impl PushConnector for MemoryPushHub {
    type Connection = MemoryConnection;

    fn connect(
        &self,
        _auth_token: &str,
    ) -> impl Future<Output = Result<MemoryConnection, PushError>> + Send {
        let mut inner = self.inner.lock();
        let result = match &inner.refusal {
            Some(reason) => Err(PushError::Refused(reason.clone())),
            None => {
                let (tx, rx) = mpsc::unbounded_channel();
                inner.connections.push(tx);
                Ok(MemoryConnection {
                    frames: rx,
                    hub: Arc::clone(&self.inner),
                })
            }
        };
        std::future::ready(result)
    }
}

/// Client side of a [`MemoryPushHub`] connection.
pub struct MemoryConnection {
    frames: mpsc::UnboundedReceiver<String>,
    hub: Arc<Mutex<HubInner>>,
}

impl PushConnection for MemoryConnection {
    fn send(&self, message: &ControlMessage) -> Result<(), PushError> {
        self.hub.lock().controls.push(message.clone());
        Ok(())
    }

    fn recv(&mut self) -> impl Future<Output = Option<String>> + Send {
        self.frames.recv()
    }
}
