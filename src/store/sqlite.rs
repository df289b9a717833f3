//! SQLite-backed [`ProgressionStore`]

use std::cell::Cell;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior, params};

use super::db::ProgressionDb;
use super::{Inserted, ProgressionStore};
use crate::domain::{
    AttemptId, AttemptRecord, BadgeAward, BadgeInfo, Boss, BossAttempt, BossId, BossStatus,
    Character, CharacterId, Difficulty, Level, LevelId, Mission, MissionAttempt, MissionId,
    MissionStatus, NewBoss, NewLevel, NewMission, UserId,
};
use crate::progression::{ProgressionError, Result};

// ============================================
// COLUMN CONVERSIONS
// ============================================

fn parse_text<T>(value: ValueRef<'_>, parse: fn(&str) -> Option<T>) -> FromSqlResult<T> {
    let text = value.as_str()?;
    parse(text).ok_or_else(|| FromSqlError::Other(format!("unknown value '{text}'").into()))
}

impl FromSql for Difficulty {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        parse_text(value, Difficulty::from_str)
    }
}

impl ToSql for Difficulty {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for MissionStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        parse_text(value, MissionStatus::from_str)
    }
}

impl ToSql for MissionStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for BossStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        parse_text(value, BossStatus::from_str)
    }
}

impl ToSql for BossStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

fn to_millis(ts: Option<DateTime<Utc>>) -> Option<i64> {
    ts.map(|t| t.timestamp_millis())
}

fn from_millis(ms: Option<i64>) -> Option<DateTime<Utc>> {
    ms.and_then(DateTime::<Utc>::from_timestamp_millis)
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

fn count(n: i64) -> u64 {
    u64::try_from(n).unwrap_or(0)
}

// ============================================
// ROW MAPPING
// ============================================

const LEVEL_COLUMNS: &str = "id, order_index, xp_threshold, difficulty, name, description";
const MISSION_COLUMNS: &str = "id, level_id, title, description, xp_reward, order_number";
const BOSS_COLUMNS: &str = "id, level_id, name, description, xp_reward, badge_name, \
     badge_description, badge_icon, unlocks_next_level";
const CHARACTER_COLUMNS: &str = "id, user_id, name, level, xp";
const MISSION_ATTEMPT_COLUMNS: &str = "id, user_id, mission_id, status, submission_url, \
     submission_notes, feedback, evaluator_id, started_at, submitted_at, evaluated_at, completed_at";
const BOSS_ATTEMPT_COLUMNS: &str = "id, user_id, boss_id, status, unlocked_at, submission_url, \
     submission_notes, feedback, evaluator_id, started_at, submitted_at, evaluated_at, completed_at";
const BADGE_COLUMNS: &str = "id, user_id, boss_id, boss_attempt_id, badge_name, \
     badge_description, badge_icon, awarded_at";

fn level_from_row(row: &Row<'_>) -> rusqlite::Result<Level> {
    Ok(Level {
        id: row.get(0)?,
        order: row.get(1)?,
        xp_threshold: row.get(2)?,
        difficulty: row.get(3)?,
        name: row.get(4)?,
        description: row.get(5)?,
    })
}

fn mission_from_row(row: &Row<'_>) -> rusqlite::Result<Mission> {
    Ok(Mission {
        id: row.get(0)?,
        level_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        xp_reward: row.get(4)?,
        order_number: row.get(5)?,
    })
}

fn boss_from_row(row: &Row<'_>) -> rusqlite::Result<Boss> {
    Ok(Boss {
        id: row.get(0)?,
        level_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        xp_reward: row.get(4)?,
        badge: BadgeInfo {
            name: row.get(5)?,
            description: row.get(6)?,
            icon: row.get(7)?,
        },
        unlocks_next_level: row.get(8)?,
    })
}

fn character_from_row(row: &Row<'_>) -> rusqlite::Result<Character> {
    Ok(Character {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        level: row.get(3)?,
        xp: row.get(4)?,
    })
}

/// Reads the eight shared attempt columns starting at `offset`
fn record_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<AttemptRecord> {
    Ok(AttemptRecord {
        submission_url: row.get(offset)?,
        submission_notes: row.get(offset + 1)?,
        feedback: row.get(offset + 2)?,
        evaluator_id: row.get(offset + 3)?,
        started_at: from_millis(row.get(offset + 4)?),
        submitted_at: from_millis(row.get(offset + 5)?),
        evaluated_at: from_millis(row.get(offset + 6)?),
        completed_at: from_millis(row.get(offset + 7)?),
    })
}

fn mission_attempt_from_row(row: &Row<'_>) -> rusqlite::Result<MissionAttempt> {
    Ok(MissionAttempt::restore(
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        record_from_row(row, 4)?,
    ))
}

fn boss_attempt_from_row(row: &Row<'_>) -> rusqlite::Result<BossAttempt> {
    Ok(BossAttempt::restore(
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        from_millis(row.get(4)?),
        record_from_row(row, 5)?,
    ))
}

fn badge_from_row(row: &Row<'_>) -> rusqlite::Result<BadgeAward> {
    Ok(BadgeAward {
        id: row.get(0)?,
        user_id: row.get(1)?,
        boss_id: row.get(2)?,
        boss_attempt_id: row.get(3)?,
        badge: BadgeInfo {
            name: row.get(4)?,
            description: row.get(5)?,
            icon: row.get(6)?,
        },
        awarded_at: from_millis(row.get(7)?).unwrap_or_default(),
    })
}

// ============================================
// STORE
// ============================================

/// [`ProgressionStore`] over a shared [`ProgressionDb`]
#[derive(Clone)]
pub struct SqliteStore {
    db: ProgressionDb,
    writes: Arc<AtomicU64>,
}

impl SqliteStore {
    pub fn new(db: ProgressionDb) -> Self {
        Self {
            db,
            writes: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn db(&self) -> &ProgressionDb {
        &self.db
    }

    /// Number of committed row-changing statements issued through this store.
    ///
    /// Statements inside a rolled-back [`ProgressionStore::atomically`] are not counted.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// Autocommit: every successful statement is durable on its own
    fn with_conn<T>(&self, work: impl FnOnce(&ConnStore<'_>) -> Result<T>) -> Result<T> {
        let conn = self.db.conn();
        let pending = Cell::new(0);
        let result = work(&ConnStore {
            conn: &conn,
            pending: &pending,
        });
        self.writes.fetch_add(pending.get(), Ordering::Relaxed);
        result
    }
}

impl ProgressionStore for SqliteStore {
    fn atomically<T, F>(&self, work: F) -> Result<T>
    where
        F: FnOnce(&dyn ProgressionStore) -> Result<T>,
    {
        let mut conn = self.db.conn();
        // Take the write lock up front so other connections wait on the busy
        // timeout instead of failing to upgrade a read snapshot.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let pending = Cell::new(0);
        let result = work(&ConnStore {
            conn: &*tx,
            pending: &pending,
        })?;
        tx.commit()?;
        self.writes.fetch_add(pending.get(), Ordering::Relaxed);
        Ok(result)
    }

    fn list_levels(&self) -> Result<Vec<Level>> {
        self.with_conn(|s| s.list_levels())
    }

    fn level(&self, id: LevelId) -> Result<Option<Level>> {
        self.with_conn(|s| s.level(id))
    }

    fn insert_level(&self, level: &NewLevel) -> Result<Level> {
        self.with_conn(|s| s.insert_level(level))
    }

    fn mission(&self, id: MissionId) -> Result<Option<Mission>> {
        self.with_conn(|s| s.mission(id))
    }

    fn missions_for_level(&self, level_id: LevelId) -> Result<Vec<Mission>> {
        self.with_conn(|s| s.missions_for_level(level_id))
    }

    fn count_missions(&self, level_id: LevelId) -> Result<u64> {
        self.with_conn(|s| s.count_missions(level_id))
    }

    fn insert_mission(&self, mission: &NewMission) -> Result<Mission> {
        self.with_conn(|s| s.insert_mission(mission))
    }

    fn mission_attempt(&self, id: AttemptId) -> Result<Option<MissionAttempt>> {
        self.with_conn(|s| s.mission_attempt(id))
    }

    fn mission_attempt_for(
        &self,
        user_id: UserId,
        mission_id: MissionId,
    ) -> Result<Option<MissionAttempt>> {
        self.with_conn(|s| s.mission_attempt_for(user_id, mission_id))
    }

    fn insert_mission_attempt(&self, attempt: &MissionAttempt) -> Result<Inserted<MissionAttempt>> {
        self.with_conn(|s| s.insert_mission_attempt(attempt))
    }

    fn save_mission_attempt(&self, attempt: &MissionAttempt) -> Result<()> {
        self.with_conn(|s| s.save_mission_attempt(attempt))
    }

    fn count_completed_missions(&self, user_id: UserId, level_id: LevelId) -> Result<u64> {
        self.with_conn(|s| s.count_completed_missions(user_id, level_id))
    }

    fn boss(&self, id: BossId) -> Result<Option<Boss>> {
        self.with_conn(|s| s.boss(id))
    }

    fn boss_for_level(&self, level_id: LevelId) -> Result<Option<Boss>> {
        self.with_conn(|s| s.boss_for_level(level_id))
    }

    fn insert_boss(&self, boss: &NewBoss) -> Result<Boss> {
        self.with_conn(|s| s.insert_boss(boss))
    }

    fn boss_attempt(&self, id: AttemptId) -> Result<Option<BossAttempt>> {
        self.with_conn(|s| s.boss_attempt(id))
    }

    fn boss_attempt_for(&self, user_id: UserId, boss_id: BossId) -> Result<Option<BossAttempt>> {
        self.with_conn(|s| s.boss_attempt_for(user_id, boss_id))
    }

    fn insert_boss_attempt(&self, attempt: &BossAttempt) -> Result<Inserted<BossAttempt>> {
        self.with_conn(|s| s.insert_boss_attempt(attempt))
    }

    fn save_boss_attempt(&self, attempt: &BossAttempt) -> Result<()> {
        self.with_conn(|s| s.save_boss_attempt(attempt))
    }

    fn character(&self, id: CharacterId) -> Result<Option<Character>> {
        self.with_conn(|s| s.character(id))
    }

    fn character_for_user(&self, user_id: UserId) -> Result<Option<Character>> {
        self.with_conn(|s| s.character_for_user(user_id))
    }

    fn list_characters(&self) -> Result<Vec<Character>> {
        self.with_conn(|s| s.list_characters())
    }

    fn insert_character(&self, user_id: UserId, name: &str, level: u32) -> Result<Character> {
        self.with_conn(|s| s.insert_character(user_id, name, level))
    }

    fn save_character(&self, character: &Character) -> Result<()> {
        self.with_conn(|s| s.save_character(character))
    }

    fn insert_badge_award(&self, award: &BadgeAward) -> Result<Inserted<BadgeAward>> {
        self.with_conn(|s| s.insert_badge_award(award))
    }

    fn badge_awards_for_user(&self, user_id: UserId) -> Result<Vec<BadgeAward>> {
        self.with_conn(|s| s.badge_awards_for_user(user_id))
    }
}

/// Store view over one locked connection (or open transaction)
struct ConnStore<'c> {
    conn: &'c Connection,
    /// Writes not yet published to the store's counter
    pending: &'c Cell<u64>,
}

impl ConnStore<'_> {
    fn wrote(&self) {
        self.pending.set(self.pending.get() + 1);
    }
}

impl ProgressionStore for ConnStore<'_> {
    fn atomically<T, F>(&self, work: F) -> Result<T>
    where
        F: FnOnce(&dyn ProgressionStore) -> Result<T>,
    {
        // Already inside the caller's connection scope
        work(self)
    }

    // ---------- levels ----------

    fn list_levels(&self) -> Result<Vec<Level>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {LEVEL_COLUMNS} FROM levels ORDER BY order_index"))?;
        let levels = stmt
            .query_map([], level_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(levels)
    }

    fn level(&self, id: LevelId) -> Result<Option<Level>> {
        let level = self
            .conn
            .query_row(
                &format!("SELECT {LEVEL_COLUMNS} FROM levels WHERE id = ?1"),
                params![id],
                level_from_row,
            )
            .optional()?;
        Ok(level)
    }

    fn insert_level(&self, level: &NewLevel) -> Result<Level> {
        let inserted = self.conn.execute(
            "INSERT INTO levels (order_index, xp_threshold, difficulty, name, description)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                level.order,
                level.xp_threshold,
                level.difficulty,
                level.name,
                level.description,
            ],
        );
        match inserted {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                return Err(ProgressionError::rule(format!(
                    "A level with order {} already exists",
                    level.order
                )));
            }
            Err(e) => return Err(e.into()),
        }
        self.wrote();

        Ok(Level {
            id: self.conn.last_insert_rowid(),
            order: level.order,
            xp_threshold: level.xp_threshold,
            difficulty: level.difficulty,
            name: level.name.clone(),
            description: level.description.clone(),
        })
    }

    // ---------- missions ----------

    fn mission(&self, id: MissionId) -> Result<Option<Mission>> {
        let mission = self
            .conn
            .query_row(
                &format!("SELECT {MISSION_COLUMNS} FROM missions WHERE id = ?1"),
                params![id],
                mission_from_row,
            )
            .optional()?;
        Ok(mission)
    }

    fn missions_for_level(&self, level_id: LevelId) -> Result<Vec<Mission>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {MISSION_COLUMNS} FROM missions WHERE level_id = ?1 ORDER BY order_number, id"
        ))?;
        let missions = stmt
            .query_map(params![level_id], mission_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(missions)
    }

    fn count_missions(&self, level_id: LevelId) -> Result<u64> {
        let total: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM missions WHERE level_id = ?1",
            params![level_id],
            |r| r.get(0),
        )?;
        Ok(count(total))
    }

    fn insert_mission(&self, mission: &NewMission) -> Result<Mission> {
        self.conn.execute(
            "INSERT INTO missions (level_id, title, description, xp_reward, order_number)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                mission.level_id,
                mission.title,
                mission.description,
                mission.xp_reward,
                mission.order_number,
            ],
        )?;
        self.wrote();

        Ok(Mission {
            id: self.conn.last_insert_rowid(),
            level_id: mission.level_id,
            title: mission.title.clone(),
            description: mission.description.clone(),
            xp_reward: mission.xp_reward,
            order_number: mission.order_number,
        })
    }

    // ---------- mission attempts ----------

    fn mission_attempt(&self, id: AttemptId) -> Result<Option<MissionAttempt>> {
        let attempt = self
            .conn
            .query_row(
                &format!("SELECT {MISSION_ATTEMPT_COLUMNS} FROM mission_attempts WHERE id = ?1"),
                params![id],
                mission_attempt_from_row,
            )
            .optional()?;
        Ok(attempt)
    }

    fn mission_attempt_for(
        &self,
        user_id: UserId,
        mission_id: MissionId,
    ) -> Result<Option<MissionAttempt>> {
        let attempt = self
            .conn
            .query_row(
                &format!(
                    "SELECT {MISSION_ATTEMPT_COLUMNS} FROM mission_attempts
                     WHERE user_id = ?1 AND mission_id = ?2"
                ),
                params![user_id, mission_id],
                mission_attempt_from_row,
            )
            .optional()?;
        Ok(attempt)
    }

    fn insert_mission_attempt(&self, attempt: &MissionAttempt) -> Result<Inserted<MissionAttempt>> {
        let r = &attempt.record;
        let changed = self.conn.execute(
            "INSERT INTO mission_attempts
               (user_id, mission_id, status, submission_url, submission_notes, feedback,
                evaluator_id, started_at, submitted_at, evaluated_at, completed_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
             ON CONFLICT(user_id, mission_id) DO NOTHING",
            params![
                attempt.user_id,
                attempt.mission_id,
                attempt.status(),
                r.submission_url,
                r.submission_notes,
                r.feedback,
                r.evaluator_id,
                to_millis(r.started_at),
                to_millis(r.submitted_at),
                to_millis(r.evaluated_at),
                to_millis(r.completed_at),
                now_ms(),
            ],
        )?;

        if changed == 0 {
            let existing = self
                .mission_attempt_for(attempt.user_id, attempt.mission_id)?
                .ok_or_else(|| {
                    ProgressionError::unexpected(anyhow::anyhow!(
                        "mission attempt conflict without a stored row"
                    ))
                })?;
            return Ok(Inserted::Existing(existing));
        }
        self.wrote();

        let mut stored = attempt.clone();
        stored.id = self.conn.last_insert_rowid();
        Ok(Inserted::Created(stored))
    }

    fn save_mission_attempt(&self, attempt: &MissionAttempt) -> Result<()> {
        let r = &attempt.record;
        let changed = self.conn.execute(
            "UPDATE mission_attempts SET
                status = ?2, submission_url = ?3, submission_notes = ?4, feedback = ?5,
                evaluator_id = ?6, started_at = ?7, submitted_at = ?8, evaluated_at = ?9,
                completed_at = ?10, updated_at = ?11
             WHERE id = ?1",
            params![
                attempt.id,
                attempt.status(),
                r.submission_url,
                r.submission_notes,
                r.feedback,
                r.evaluator_id,
                to_millis(r.started_at),
                to_millis(r.submitted_at),
                to_millis(r.evaluated_at),
                to_millis(r.completed_at),
                now_ms(),
            ],
        )?;
        if changed == 0 {
            return Err(ProgressionError::not_found(format!(
                "Mission attempt {} not found",
                attempt.id
            )));
        }
        self.wrote();
        Ok(())
    }

    fn count_completed_missions(&self, user_id: UserId, level_id: LevelId) -> Result<u64> {
        let completed: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM mission_attempts a
             JOIN missions m ON m.id = a.mission_id
             WHERE a.user_id = ?1 AND m.level_id = ?2 AND a.status = ?3",
            params![user_id, level_id, MissionStatus::Completed],
            |r| r.get(0),
        )?;
        Ok(count(completed))
    }

    // ---------- bosses ----------

    fn boss(&self, id: BossId) -> Result<Option<Boss>> {
        let boss = self
            .conn
            .query_row(
                &format!("SELECT {BOSS_COLUMNS} FROM bosses WHERE id = ?1"),
                params![id],
                boss_from_row,
            )
            .optional()?;
        Ok(boss)
    }

    fn boss_for_level(&self, level_id: LevelId) -> Result<Option<Boss>> {
        let boss = self
            .conn
            .query_row(
                &format!("SELECT {BOSS_COLUMNS} FROM bosses WHERE level_id = ?1"),
                params![level_id],
                boss_from_row,
            )
            .optional()?;
        Ok(boss)
    }

    fn insert_boss(&self, boss: &NewBoss) -> Result<Boss> {
        let inserted = self.conn.execute(
            "INSERT INTO bosses
               (level_id, name, description, xp_reward, badge_name, badge_description,
                badge_icon, unlocks_next_level)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                boss.level_id,
                boss.name,
                boss.description,
                boss.xp_reward,
                boss.badge.name,
                boss.badge.description,
                boss.badge.icon,
                boss.unlocks_next_level,
            ],
        );
        match inserted {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                return Err(ProgressionError::rule("Level already has a boss"));
            }
            Err(e) => return Err(e.into()),
        }
        self.wrote();

        Ok(Boss {
            id: self.conn.last_insert_rowid(),
            level_id: boss.level_id,
            name: boss.name.clone(),
            description: boss.description.clone(),
            xp_reward: boss.xp_reward,
            badge: boss.badge.clone(),
            unlocks_next_level: boss.unlocks_next_level,
        })
    }

    // ---------- boss attempts ----------

    fn boss_attempt(&self, id: AttemptId) -> Result<Option<BossAttempt>> {
        let attempt = self
            .conn
            .query_row(
                &format!("SELECT {BOSS_ATTEMPT_COLUMNS} FROM boss_attempts WHERE id = ?1"),
                params![id],
                boss_attempt_from_row,
            )
            .optional()?;
        Ok(attempt)
    }

    fn boss_attempt_for(&self, user_id: UserId, boss_id: BossId) -> Result<Option<BossAttempt>> {
        let attempt = self
            .conn
            .query_row(
                &format!(
                    "SELECT {BOSS_ATTEMPT_COLUMNS} FROM boss_attempts
                     WHERE user_id = ?1 AND boss_id = ?2"
                ),
                params![user_id, boss_id],
                boss_attempt_from_row,
            )
            .optional()?;
        Ok(attempt)
    }

    fn insert_boss_attempt(&self, attempt: &BossAttempt) -> Result<Inserted<BossAttempt>> {
        let r = &attempt.record;
        let changed = self.conn.execute(
            "INSERT INTO boss_attempts
               (user_id, boss_id, status, unlocked_at, submission_url, submission_notes,
                feedback, evaluator_id, started_at, submitted_at, evaluated_at, completed_at,
                updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
             ON CONFLICT(user_id, boss_id) DO NOTHING",
            params![
                attempt.user_id,
                attempt.boss_id,
                attempt.status(),
                to_millis(attempt.unlocked_at),
                r.submission_url,
                r.submission_notes,
                r.feedback,
                r.evaluator_id,
                to_millis(r.started_at),
                to_millis(r.submitted_at),
                to_millis(r.evaluated_at),
                to_millis(r.completed_at),
                now_ms(),
            ],
        )?;

        if changed == 0 {
            let existing = self
                .boss_attempt_for(attempt.user_id, attempt.boss_id)?
                .ok_or_else(|| {
                    ProgressionError::unexpected(anyhow::anyhow!(
                        "boss attempt conflict without a stored row"
                    ))
                })?;
            return Ok(Inserted::Existing(existing));
        }
        self.wrote();

        let mut stored = attempt.clone();
        stored.id = self.conn.last_insert_rowid();
        Ok(Inserted::Created(stored))
    }

    fn save_boss_attempt(&self, attempt: &BossAttempt) -> Result<()> {
        let r = &attempt.record;
        let changed = self.conn.execute(
            "UPDATE boss_attempts SET
                status = ?2, unlocked_at = ?3, submission_url = ?4, submission_notes = ?5,
                feedback = ?6, evaluator_id = ?7, started_at = ?8, submitted_at = ?9,
                evaluated_at = ?10, completed_at = ?11, updated_at = ?12
             WHERE id = ?1",
            params![
                attempt.id,
                attempt.status(),
                to_millis(attempt.unlocked_at),
                r.submission_url,
                r.submission_notes,
                r.feedback,
                r.evaluator_id,
                to_millis(r.started_at),
                to_millis(r.submitted_at),
                to_millis(r.evaluated_at),
                to_millis(r.completed_at),
                now_ms(),
            ],
        )?;
        if changed == 0 {
            return Err(ProgressionError::not_found(format!(
                "Boss attempt {} not found",
                attempt.id
            )));
        }
        self.wrote();
        Ok(())
    }

    // ---------- characters ----------

    fn character(&self, id: CharacterId) -> Result<Option<Character>> {
        let character = self
            .conn
            .query_row(
                &format!("SELECT {CHARACTER_COLUMNS} FROM characters WHERE id = ?1"),
                params![id],
                character_from_row,
            )
            .optional()?;
        Ok(character)
    }

    fn character_for_user(&self, user_id: UserId) -> Result<Option<Character>> {
        let character = self
            .conn
            .query_row(
                &format!("SELECT {CHARACTER_COLUMNS} FROM characters WHERE user_id = ?1"),
                params![user_id],
                character_from_row,
            )
            .optional()?;
        Ok(character)
    }

    fn list_characters(&self) -> Result<Vec<Character>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {CHARACTER_COLUMNS} FROM characters ORDER BY xp DESC, id ASC"
        ))?;
        let characters = stmt
            .query_map([], character_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(characters)
    }

    fn insert_character(&self, user_id: UserId, name: &str, level: u32) -> Result<Character> {
        let inserted = self.conn.execute(
            "INSERT INTO characters (user_id, name, level, xp, updated_at)
             VALUES (?1, ?2, ?3, 0, ?4)",
            params![user_id, name, level, now_ms()],
        );
        match inserted {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                return Err(ProgressionError::rule(format!(
                    "User {user_id} already has a character"
                )));
            }
            Err(e) => return Err(e.into()),
        }
        self.wrote();

        Ok(Character {
            id: self.conn.last_insert_rowid(),
            user_id,
            name: name.to_string(),
            level,
            xp: 0,
        })
    }

    fn save_character(&self, character: &Character) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE characters SET name = ?2, level = ?3, xp = ?4, updated_at = ?5 WHERE id = ?1",
            params![
                character.id,
                character.name,
                character.level,
                character.xp,
                now_ms(),
            ],
        )?;
        if changed == 0 {
            return Err(ProgressionError::not_found(format!(
                "Character {} not found",
                character.id
            )));
        }
        self.wrote();
        Ok(())
    }

    // ---------- badges ----------

    fn insert_badge_award(&self, award: &BadgeAward) -> Result<Inserted<BadgeAward>> {
        let changed = self.conn.execute(
            "INSERT INTO badge_awards
               (user_id, boss_id, boss_attempt_id, badge_name, badge_description, badge_icon,
                awarded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(user_id, boss_id) DO NOTHING",
            params![
                award.user_id,
                award.boss_id,
                award.boss_attempt_id,
                award.badge.name,
                award.badge.description,
                award.badge.icon,
                award.awarded_at.timestamp_millis(),
            ],
        )?;

        if changed == 0 {
            let existing = self
                .conn
                .query_row(
                    &format!(
                        "SELECT {BADGE_COLUMNS} FROM badge_awards WHERE user_id = ?1 AND boss_id = ?2"
                    ),
                    params![award.user_id, award.boss_id],
                    badge_from_row,
                )?;
            return Ok(Inserted::Existing(existing));
        }
        self.wrote();

        let mut stored = award.clone();
        stored.id = self.conn.last_insert_rowid();
        Ok(Inserted::Created(stored))
    }

    fn badge_awards_for_user(&self, user_id: UserId) -> Result<Vec<BadgeAward>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {BADGE_COLUMNS} FROM badge_awards WHERE user_id = ?1 ORDER BY awarded_at, id"
        ))?;
        let awards = stmt
            .query_map(params![user_id], badge_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(awards)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progression::ErrorKind;

    fn store() -> SqliteStore {
        SqliteStore::new(ProgressionDb::open_in_memory().unwrap())
    }

    #[test]
    fn test_boss_attempt_insert_or_fetch() {
        let store = store();
        let level = store.insert_level(&NewLevel::new(1, 0, "Novice")).unwrap();
        let boss = store
            .insert_boss(&NewBoss::new(level.id, "Gatekeeper", 50, BadgeInfo::new("Gate")))
            .unwrap();

        let first = store.insert_boss_attempt(&BossAttempt::new(9, boss.id)).unwrap();
        assert!(first.was_created());
        let second = store.insert_boss_attempt(&BossAttempt::new(9, boss.id)).unwrap();
        assert!(!second.was_created());
        assert_eq!(first.into_inner().id, second.into_inner().id);
        assert_eq!(store.write_count(), 3);
    }

    #[test]
    fn test_second_boss_for_level_is_rejected() {
        let store = store();
        let level = store.insert_level(&NewLevel::new(1, 0, "Novice")).unwrap();
        store
            .insert_boss(&NewBoss::new(level.id, "First", 10, BadgeInfo::new("One")))
            .unwrap();

        let err = store
            .insert_boss(&NewBoss::new(level.id, "Second", 10, BadgeInfo::new("Two")))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RuleViolation);
    }

    #[test]
    fn test_atomically_rolls_back_on_error() {
        let store = store();
        let result: Result<()> = store.atomically(|tx| {
            tx.insert_level(&NewLevel::new(1, 0, "Novice"))?;
            Err(ProgressionError::rule("abort"))
        });
        assert!(result.is_err());
        assert!(store.list_levels().unwrap().is_empty());
        assert_eq!(store.write_count(), 0);

        store
            .atomically(|tx| tx.insert_level(&NewLevel::new(1, 0, "Novice")))
            .unwrap();
        assert_eq!(store.write_count(), 1);
    }

    #[test]
    fn test_concurrent_connections_wait_for_the_write_lock() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.db");
        let first = SqliteStore::new(ProgressionDb::open(&path).unwrap());
        let second = SqliteStore::new(ProgressionDb::open(&path).unwrap());

        first.insert_level(&NewLevel::new(1, 0, "Novice")).unwrap();
        let character = first.insert_character(5, "hero", 1).unwrap();

        let (read_done, wait_read) = std::sync::mpsc::channel();
        std::thread::scope(|s| {
            let slow = s.spawn(|| {
                first.atomically(|tx| {
                    let mut c = tx.character(character.id)?.unwrap();
                    read_done.send(()).unwrap();
                    std::thread::sleep(std::time::Duration::from_millis(100));
                    c.xp += 10;
                    tx.save_character(&c)
                })
            });

            wait_read.recv().unwrap();
            let fast: Result<()> = second.atomically(|tx| {
                let mut c = tx.character(character.id)?.unwrap();
                c.xp += 5;
                tx.save_character(&c)
            });

            fast.unwrap();
            slow.join().unwrap().unwrap();
        });

        let stored = second.character(character.id).unwrap().unwrap();
        assert_eq!(stored.xp, 15);
    }

    #[test]
    fn test_attempt_roundtrip_keeps_status_and_record() {
        let store = store();
        let level = store.insert_level(&NewLevel::new(1, 0, "Novice")).unwrap();
        let mission = store
            .insert_mission(&NewMission::new(level.id, "Hello world", 10, 1))
            .unwrap();

        let mut attempt = MissionAttempt::new(3, mission.id);
        attempt.start(Utc::now()).unwrap();
        let mut attempt = store.insert_mission_attempt(&attempt).unwrap().into_inner();
        attempt
            .submit("https://github.com/ada/hello", Some("done".into()), Utc::now())
            .unwrap();
        store.save_mission_attempt(&attempt).unwrap();

        let loaded = store.mission_attempt(attempt.id).unwrap().unwrap();
        assert_eq!(loaded.status(), MissionStatus::AwaitingEvaluation);
        assert_eq!(loaded.record.submission_url.as_deref(), Some("https://github.com/ada/hello"));
        assert!(loaded.record.started_at.is_some());
        assert!(loaded.record.submitted_at.is_some());
    }
}
