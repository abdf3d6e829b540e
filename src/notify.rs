use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

/// A user-facing message, presented by whatever UI sits on top.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub severity: Severity,
}

impl Notification {
    pub fn new(title: impl Into<String>, description: impl Into<String>, severity: Severity) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity,
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.title, self.description)
    }
}

/// Fire-and-forget presenter for notifications.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: &Notification);
}

/// Routes notifications into the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, n: &Notification) {
        match n.severity {
            Severity::Info | Severity::Success => info!(title = %n.title, "{}", n.description),
            Severity::Warning => warn!(title = %n.title, "{}", n.description),
            Severity::Error => error!(title = %n.title, "{}", n.description),
        }
    }
}
