//! SQLite database connection and schema management for progression data
//!
//! Manages the `~/.questline/progress.db` database and its schema.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::{Context, Result};
use rusqlite::Connection;

/// Shared handle to the progression database
#[derive(Clone)]
pub struct ProgressionDb {
    pub(crate) conn: Arc<Mutex<Connection>>,
}

impl ProgressionDb {
    /// Open or create the database at a specific path
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create data dir: {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open progress db: {}", path.display()))?;

        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        Self::from_connection(conn)
    }

    /// Private in-memory database (tests and dry runs)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory db")?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.init_schema()?;
        Ok(db)
    }

    /// Lock the connection.
    ///
    /// A panic while the lock was held rolls back any open transaction when the
    /// `Transaction` guard unwinds, so a poisoned lock still holds a usable connection.
    pub fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn()
            .execute_batch(SCHEMA_SQL)
            .context("Failed to create progression schema")?;
        Ok(())
    }
}

/// SQL schema for the progression database
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY);
INSERT OR IGNORE INTO schema_version VALUES (1);

-- ============================================
-- REFERENCE DATA
-- ============================================

CREATE TABLE IF NOT EXISTS levels (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    order_index INTEGER NOT NULL UNIQUE CHECK (order_index >= 1),
    xp_threshold INTEGER NOT NULL CHECK (xp_threshold >= 0),
    difficulty TEXT NOT NULL,
    name TEXT NOT NULL,
    description TEXT
);

CREATE TABLE IF NOT EXISTS missions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    level_id INTEGER NOT NULL REFERENCES levels(id),
    title TEXT NOT NULL,
    description TEXT,
    xp_reward INTEGER NOT NULL CHECK (xp_reward >= 1),
    order_number INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_mission_level ON missions(level_id);

-- At most one boss per level
CREATE TABLE IF NOT EXISTS bosses (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    level_id INTEGER NOT NULL UNIQUE REFERENCES levels(id),
    name TEXT NOT NULL,
    description TEXT,
    xp_reward INTEGER NOT NULL CHECK (xp_reward >= 1),
    badge_name TEXT NOT NULL,
    badge_description TEXT,
    badge_icon TEXT,
    unlocks_next_level INTEGER NOT NULL DEFAULT 1
);

-- ============================================
-- PER-USER STATE
-- ============================================

CREATE TABLE IF NOT EXISTS characters (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL UNIQUE,
    name TEXT NOT NULL,
    level INTEGER NOT NULL DEFAULT 1,
    xp INTEGER NOT NULL DEFAULT 0 CHECK (xp >= 0),
    updated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS mission_attempts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    mission_id INTEGER NOT NULL REFERENCES missions(id),
    status TEXT NOT NULL,
    submission_url TEXT,
    submission_notes TEXT,
    feedback TEXT,
    evaluator_id INTEGER,
    started_at INTEGER,
    submitted_at INTEGER,
    evaluated_at INTEGER,
    completed_at INTEGER,
    updated_at INTEGER NOT NULL,
    UNIQUE (user_id, mission_id)
);
CREATE INDEX IF NOT EXISTS idx_mission_attempt_status ON mission_attempts(user_id, status);

CREATE TABLE IF NOT EXISTS boss_attempts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    boss_id INTEGER NOT NULL REFERENCES bosses(id),
    status TEXT NOT NULL,
    unlocked_at INTEGER,
    submission_url TEXT,
    submission_notes TEXT,
    feedback TEXT,
    evaluator_id INTEGER,
    started_at INTEGER,
    submitted_at INTEGER,
    evaluated_at INTEGER,
    completed_at INTEGER,
    updated_at INTEGER NOT NULL,
    UNIQUE (user_id, boss_id)
);

-- Append-only, one per (user, boss)
CREATE TABLE IF NOT EXISTS badge_awards (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    boss_id INTEGER NOT NULL REFERENCES bosses(id),
    boss_attempt_id INTEGER NOT NULL REFERENCES boss_attempts(id),
    badge_name TEXT NOT NULL,
    badge_description TEXT,
    badge_icon TEXT,
    awarded_at INTEGER NOT NULL,
    UNIQUE (user_id, boss_id)
);
CREATE INDEX IF NOT EXISTS idx_badge_user ON badge_awards(user_id);

CREATE TABLE IF NOT EXISTS notifications (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    kind TEXT NOT NULL,
    title TEXT NOT NULL,
    message TEXT NOT NULL,
    reference_id INTEGER,
    created_at INTEGER NOT NULL,
    read_at INTEGER
);
CREATE INDEX IF NOT EXISTS idx_notification_user ON notifications(user_id, created_at);
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_and_init() {
        let dir = tempdir().unwrap();
        let db = ProgressionDb::open(&dir.path().join("progress.db")).unwrap();

        let conn = db.conn();
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table'")
            .unwrap();
        let tables: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        for table in ["levels", "missions", "bosses", "characters", "boss_attempts", "badge_awards"] {
            assert!(tables.contains(&table.to_string()), "missing {table}");
        }
    }

    #[test]
    fn test_reopen_keeps_schema_version() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("progress.db");
        drop(ProgressionDb::open(&path).unwrap());
        let db = ProgressionDb::open(&path).unwrap();
        let conn = db.conn();

        let version: i32 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(version, 1);

        let has_read_at: i32 = conn
            .query_row(
                "SELECT COUNT(*) FROM pragma_table_info('notifications') WHERE name = 'read_at'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(has_read_at, 1);
    }
}
