//! User-facing notifications

use std::fmt;

/// Notification severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotifyKind {
    /// Operation succeeded
    Success,
    /// Operation failed
    Error,
    /// Something the user should look at
    Warning,
    /// Informational
    Info,
}

impl fmt::Display for NotifyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        };
        f.write_str(s)
    }
}

/// Fire-and-forget notifier
pub trait Notifier: Send + Sync {
    /// Show a message to the user
    fn notify(&self, kind: NotifyKind, title: &str, message: &str);
}

/// Notifier that writes to the log, for headless use
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, kind: NotifyKind, title: &str, message: &str) {
        match kind {
            NotifyKind::Error => tracing::error!(%kind, title, "{message}"),
            NotifyKind::Warning => tracing::warn!(%kind, title, "{message}"),
            NotifyKind::Success | NotifyKind::Info => tracing::info!(%kind, title, "{message}"),
        }
    }
}

/// Pluralize "entry"
pub(crate) fn entries(n: usize) -> String {
    if n == 1 {
        "1 entry".to_string()
    } else {
        format!("{n} entries")
    }
}
