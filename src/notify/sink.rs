//! Notifications persisted in the progression database

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{Row, params};
use serde::Serialize;

use super::{NotificationEmitter, NotifyError};
use crate::domain::{Notification, NotificationKind, UserId};
use crate::store::ProgressionDb;

/// A stored notification with its delivery bookkeeping
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredNotification {
    pub id: i64,
    #[serde(flatten)]
    pub notification: Notification,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

impl StoredNotification {
    pub fn is_read(&self) -> bool {
        self.read_at.is_some()
    }
}

fn stored_from_row(row: &Row<'_>) -> rusqlite::Result<StoredNotification> {
    let kind: String = row.get(2)?;
    let kind = NotificationKind::from_str(&kind).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            rusqlite::types::Type::Text,
            format!("unknown notification kind '{kind}'").into(),
        )
    })?;
    let created_at: i64 = row.get(6)?;
    let read_at: Option<i64> = row.get(7)?;

    Ok(StoredNotification {
        id: row.get(0)?,
        notification: Notification {
            user_id: row.get(1)?,
            kind,
            title: row.get(3)?,
            message: row.get(4)?,
            reference_id: row.get(5)?,
        },
        created_at: DateTime::<Utc>::from_timestamp_millis(created_at).unwrap_or_default(),
        read_at: read_at.and_then(DateTime::<Utc>::from_timestamp_millis),
    })
}

/// [`NotificationEmitter`] that writes into the `notifications` table
#[derive(Clone)]
pub struct SqliteNotificationSink {
    db: ProgressionDb,
}

impl SqliteNotificationSink {
    pub fn new(db: ProgressionDb) -> Self {
        Self { db }
    }

    /// Newest first
    pub fn list_for_user(&self, user_id: UserId, unread_only: bool) -> Result<Vec<StoredNotification>> {
        let conn = self.db.conn();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, kind, title, message, reference_id, created_at, read_at
             FROM notifications
             WHERE user_id = ?1 AND (?2 = 0 OR read_at IS NULL)
             ORDER BY created_at DESC, id DESC",
        )?;
        let notifications = stmt
            .query_map(params![user_id, unread_only], stored_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(notifications)
    }

    /// Mark one of the user's notifications read; false if it does not exist or is already read
    pub fn mark_read(&self, user_id: UserId, notification_id: i64) -> Result<bool> {
        let conn = self.db.conn();
        let changed = conn.execute(
            "UPDATE notifications SET read_at = ?3
             WHERE id = ?1 AND user_id = ?2 AND read_at IS NULL",
            params![notification_id, user_id, Utc::now().timestamp_millis()],
        )?;
        Ok(changed > 0)
    }
}

impl NotificationEmitter for SqliteNotificationSink {
    fn emit(&self, notification: &Notification) -> Result<(), NotifyError> {
        let conn = self.db.conn();
        conn.execute(
            "INSERT INTO notifications (user_id, kind, title, message, reference_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                notification.user_id,
                notification.kind.as_str(),
                notification.title,
                notification.message,
                notification.reference_id,
                Utc::now().timestamp_millis(),
            ],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_list_and_mark_read() {
        let sink = SqliteNotificationSink::new(ProgressionDb::open_in_memory().unwrap());
        sink.emit(
            &Notification::new(7, NotificationKind::BossUnlocked, "Boss unlocked", "Go fight")
                .with_reference(3),
        )
        .unwrap();
        sink.emit(&Notification::new(8, NotificationKind::LevelUp, "Level up", "Level 2"))
            .unwrap();

        let mine = sink.list_for_user(7, true).unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].notification.kind, NotificationKind::BossUnlocked);
        assert_eq!(mine[0].notification.reference_id, Some(3));

        assert!(!sink.mark_read(8, mine[0].id).unwrap());
        assert!(sink.mark_read(7, mine[0].id).unwrap());
        assert!(!sink.mark_read(7, mine[0].id).unwrap());

        assert!(sink.list_for_user(7, true).unwrap().is_empty());
        assert!(sink.list_for_user(7, false).unwrap()[0].is_read());
    }
}
