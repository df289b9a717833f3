//! Emitter wrapper that defers failed notifications for later retries

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};

use super::{DeferredTaskBuffer, NotificationEmitter, NotifyError};
use crate::domain::Notification;

/// A notification waiting for another delivery attempt
#[derive(Debug, Clone)]
pub struct PendingNotification {
    pub notification: Notification,
    /// Delivery attempts made so far
    pub attempts: u32,
}

/// Outcome of one retry sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RetryReport {
    pub delivered: usize,
    pub requeued: usize,
    pub dropped: usize,
}

/// Emits through `inner`; failures go into a deferred buffer instead of
/// reaching the caller, and are retried up to `max_attempts` deliveries.
pub struct RetryingNotifier {
    inner: Arc<dyn NotificationEmitter>,
    pending: DeferredTaskBuffer<PendingNotification>,
    max_attempts: u32,
}

impl RetryingNotifier {
    pub fn new(inner: Arc<dyn NotificationEmitter>, max_attempts: u32) -> Self {
        Self {
            inner,
            pending: DeferredTaskBuffer::new(),
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    fn defer(&self, mut pending: PendingNotification, err: &NotifyError) -> bool {
        pending.attempts += 1;
        if pending.attempts >= self.max_attempts {
            warn!(
                user_id = pending.notification.user_id,
                kind = %pending.notification.kind,
                attempts = pending.attempts,
                "Dropping notification after repeated failures: {}",
                err
            );
            return false;
        }
        warn!(
            user_id = pending.notification.user_id,
            kind = %pending.notification.kind,
            attempts = pending.attempts,
            "Notification delivery failed, will retry: {}",
            err
        );
        self.pending.push(pending);
        true
    }

    /// Try every deferred notification once more
    pub fn retry_pending(&self) -> RetryReport {
        let mut report = RetryReport::default();
        for pending in self.pending.drain() {
            match self.inner.emit(&pending.notification) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    if self.defer(pending, &e) {
                        report.requeued += 1;
                    } else {
                        report.dropped += 1;
                    }
                }
            }
        }
        if report != RetryReport::default() {
            debug!(?report, "Notification retry sweep finished");
        }
        report
    }

    /// Run [`Self::retry_pending`] every `interval` on the tokio runtime
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        let notifier = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                notifier.retry_pending();
            }
        })
    }
}

impl NotificationEmitter for RetryingNotifier {
    fn emit(&self, notification: &Notification) -> Result<(), NotifyError> {
        if let Err(e) = self.inner.emit(notification) {
            let pending = PendingNotification {
                notification: notification.clone(),
                attempts: 0,
            };
            self.defer(pending, &e);
        }
        Ok(())
    }
}
