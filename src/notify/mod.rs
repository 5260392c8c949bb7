//! Desktop notification gateway.
//!
//! Notifications are fire-and-forget: no delivery guarantee is assumed,
//! and a send failure never disturbs the scheduler. The gateway trait
//! keeps the planner and daemon testable without a desktop session.

use thiserror::Error;
use tracing::debug;

use crate::types::PrayerName;

/// Errors from the notification layer.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The notification could not be handed to the OS layer.
    #[error("failed to send notification: {0}")]
    SendFailed(String),
}

/// Fire-and-forget notification delivery.
pub trait NotificationGateway: Send + Sync {
    /// Sends a notification with the given title and body.
    ///
    /// # Errors
    ///
    /// Returns an error if the OS notification layer rejects the request;
    /// callers log and continue.
    fn send(&self, title: &str, body: &str) -> Result<(), NotifyError>;
}

// ============================================================================
// Message templates
// ============================================================================

/// Title and body for a pre-prayer reminder.
pub fn reminder_message(prayer: PrayerName, lead_minutes: u32) -> (String, String) {
    (
        format!("Reminder: {} prayer", prayer),
        format!("{} will be in {} minutes.", prayer, lead_minutes),
    )
}

/// Title and body for the adhan firing itself.
pub fn adhan_message(prayer: PrayerName) -> (String, String) {
    (
        format!("{} prayer", prayer),
        format!("It is time for {}.", prayer),
    )
}

/// Title and body for a non-fatal playback failure.
pub fn playback_failure_message(detail: &str) -> (String, String) {
    (
        "Adhan playback failed".to_string(),
        format!("The adhan could not be played: {}.", detail),
    )
}

// ============================================================================
// DesktopGateway
// ============================================================================

/// Gateway backed by the desktop notification service.
#[derive(Debug, Default)]
pub struct DesktopGateway;

impl DesktopGateway {
    /// Creates the desktop gateway.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl NotificationGateway for DesktopGateway {
    fn send(&self, title: &str, body: &str) -> Result<(), NotifyError> {
        notify_rust::Notification::new()
            .summary(title)
            .body(body)
            .appname("muezzin")
            .show()
            .map_err(|e| NotifyError::SendFailed(e.to_string()))?;
        debug!("Notification sent: {}", title);
        Ok(())
    }
}

// ============================================================================
// MockGateway
// ============================================================================

/// Mock gateway recording every sent notification for assertions.
#[derive(Debug, Default)]
pub struct MockGateway {
    sent: std::sync::Mutex<Vec<(String, String)>>,
    should_fail: std::sync::atomic::AtomicBool,
}

impl MockGateway {
    /// Creates a new mock gateway.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent sends fail.
    pub fn set_should_fail(&self, should_fail: bool) {
        self.should_fail
            .store(should_fail, std::sync::atomic::Ordering::SeqCst);
    }

    /// All (title, body) pairs sent so far.
    #[must_use]
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    /// Number of notifications sent.
    #[must_use]
    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

impl NotificationGateway for MockGateway {
    fn send(&self, title: &str, body: &str) -> Result<(), NotifyError> {
        if self.should_fail.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(NotifyError::SendFailed("mock failure".to_string()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((title.to_string(), body.to_string()));
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
