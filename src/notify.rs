//! Transient user notifications.
//!
//! The dispatch path reports every outcome through a [`NotificationSink`]
//! and never blocks on it.

use parking_lot::Mutex;
use tracing::{error, info, warn};

use crate::config::DEFAULT_NOTIFICATION_DURATION_MS;
use crate::error::Severity;

pub const APP_NAME: &str = "Snippet Hotkeys";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub severity: Severity,
    pub duration_ms: u64,
}

impl Notification {
    pub fn new(message: impl Into<String>, severity: Severity) -> Self {
        Self {
            title: APP_NAME.to_string(),
            message: message.into(),
            severity,
            duration_ms: DEFAULT_NOTIFICATION_DURATION_MS,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(message, Severity::Info)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(message, Severity::Warning)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(message, Severity::Error)
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }
}

/// Where notifications go (tray balloon, HUD, log).
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Writes notifications to the structured log.
#[derive(Debug, Default)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn notify(&self, n: Notification) {
        match n.severity {
            Severity::Info => info!(
                event_type = "notification",
                title = %n.title,
                duration_ms = n.duration_ms,
                "{}", n.message
            ),
            Severity::Warning => warn!(
                event_type = "notification",
                title = %n.title,
                duration_ms = n.duration_ms,
                "{}", n.message
            ),
            Severity::Error => error!(
                event_type = "notification",
                title = %n.title,
                duration_ms = n.duration_ms,
                "{}", n.message
            ),
        }
    }
}

/// Keeps notifications in memory, in arrival order.
#[derive(Debug, Default)]
pub struct MemorySink {
    received: Mutex<Vec<Notification>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.received.lock().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.received
            .lock()
            .iter()
            .map(|n| n.message.clone())
            .collect()
    }

    pub fn last(&self) -> Option<Notification> {
        self.received.lock().last().cloned()
    }

    pub fn clear(&self) {
        self.received.lock().clear();
    }
}

impl NotificationSink for MemorySink {
    fn notify(&self, notification: Notification) {
        self.received.lock().push(notification);
    }
}
