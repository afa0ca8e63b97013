//! Local notification scheduling.
//!
//! The core hands a [`LocalNotification`] to a [`NotificationScheduler`]
//! and moves on. There is no acknowledgment contract: a scheduler failure is
//! logged by the caller and never reaches the delivery path.

use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;

use super::model::ProximityAlert;

/// Title used for approaching-bus notifications.
pub const APPROACHING_TITLE: &str = "Bus Approaching";

/// A notification to show on the device after a delay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalNotification {
    pub title: String,
    pub body: String,
    pub fire_after_seconds: u64,
}

impl LocalNotification {
    /// Notification for a proximity alert, due when the bus is expected.
    pub fn for_alert(alert: &ProximityAlert) -> Self {
        Self {
            title: APPROACHING_TITLE.to_string(),
            body: format!(
                "Your stop {} is coming up in {} minutes",
                alert.target_stop_name, alert.eta_minutes
            ),
            fire_after_seconds: u64::from(alert.eta_minutes) * 60,
        }
    }
}

/// Errors a scheduler may report.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Notification permission denied")]
    PermissionDenied,

    #[error("Failed to schedule notification: {0}")]
    Scheduling(String),
}

/// Platform notification scheduler.
pub trait NotificationScheduler: Send + Sync {
    fn schedule(&self, notification: LocalNotification) -> Result<(), NotifyError>;
}

/// Scheduler that writes notifications to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl NotificationScheduler for LogNotifier {
    fn schedule(&self, notification: LocalNotification) -> Result<(), NotifyError> {
        tracing::info!(
            title = %notification.title,
            body = %notification.body,
            fire_after_seconds = notification.fire_after_seconds,
            "Notification scheduled"
        );
        Ok(())
    }
}

/// Scheduler that keeps every notification, for tests and replay.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    scheduled: Arc<Mutex<Vec<LocalNotification>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scheduled(&self) -> Vec<LocalNotification> {
        self.scheduled.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.scheduled.lock().len()
    }
}

impl NotificationScheduler for RecordingNotifier {
    fn schedule(&self, notification: LocalNotification) -> Result<(), NotifyError> {
        self.scheduled.lock().push(notification);
        Ok(())
    }
}
