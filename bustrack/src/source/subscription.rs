//! Cancellable handle for an active stream subscription.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Owns the delivery loop of one subscription.
///
/// Cancelling (or dropping) the handle trips the cancellation token and
/// aborts the delivery task, if there is one. Cancellation never blocks.
#[derive(Debug)]
pub struct StreamSubscription {
    cancellation: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl StreamSubscription {
    /// Subscription backed by a spawned delivery task.
    pub fn new(cancellation: CancellationToken, task: JoinHandle<()>) -> Self {
        Self {
            cancellation,
            task: Some(task),
        }
    }

    /// Subscription with no task of its own (caller-driven sources).
    pub fn detached(cancellation: CancellationToken) -> Self {
        Self {
            cancellation,
            task: None,
        }
    }

    pub fn cancel(&mut self) {
        self.cancellation.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Token observed by the delivery loop.
    pub fn token(&self) -> &CancellationToken {
        &self.cancellation
    }
}

impl Drop for StreamSubscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_cancel_is_idempotent() {
        let mut subscription = StreamSubscription::detached(CancellationToken::new());
        assert!(!subscription.is_cancelled());

        subscription.cancel();
        subscription.cancel();
        assert!(subscription.is_cancelled());
    }

    #[test]
    fn test_drop_cancels_token() {
        let token = CancellationToken::new();
        let subscription = StreamSubscription::detached(token.clone());

        drop(subscription);
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancel_aborts_task() {
        let token = CancellationToken::new();
        let task = tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        });
        let abort = task.abort_handle();

        let mut subscription = StreamSubscription::new(token, task);
        subscription.cancel();

        tokio::task::yield_now().await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(abort.is_finished());
    }
}
