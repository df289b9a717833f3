//! Progression notifications
//!
//! The engine hands every event to a [`NotificationEmitter`] after its unit of
//! work has committed. Emission is fire-and-forget: a failing emitter is
//! logged and never undoes the progression change.

mod deferred;
mod retry;
mod sink;

pub use deferred::DeferredTaskBuffer;
pub use retry::{PendingNotification, RetryReport, RetryingNotifier};
pub use sink::{SqliteNotificationSink, StoredNotification};

use tracing::info;

use crate::domain::Notification;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Notification storage failed: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Notification transport unavailable: {0}")]
    Unavailable(String),
}

/// Consumer of progression events
pub trait NotificationEmitter: Send + Sync {
    fn emit(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Writes notifications to the log only
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl NotificationEmitter for LogNotifier {
    fn emit(&self, notification: &Notification) -> Result<(), NotifyError> {
        info!(
            user_id = notification.user_id,
            kind = %notification.kind,
            reference_id = ?notification.reference_id,
            "{}: {}",
            notification.title,
            notification.message
        );
        Ok(())
    }
}
