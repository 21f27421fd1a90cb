use chrono::{
    DateTime,
    Utc,
};
use tokio::sync::mpsc;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

/// One user-facing notification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub severity: Severity,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// Sender half of the notification channel. The lifecycle controller only
/// ever talks to the UI through this; there is no shared mutable state
/// between them.
#[derive(Clone, Debug)]
pub struct NoticeSink {
    tx: mpsc::UnboundedSender<Notice>,
}

impl NoticeSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Notice>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn send(&self, severity: Severity, message: impl Into<String>) {
        let notice = Notice {
            severity,
            message: message.into(),
            at: Utc::now(),
        };
        // A closed receiver just means the UI is gone; nothing to do.
        let _ = self.tx.send(notice);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.send(Severity::Info, message);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.send(Severity::Success, message);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.send(Severity::Warning, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.send(Severity::Error, message);
    }
}
