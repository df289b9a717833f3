//! Persistence for progression state
//!
//! The engine talks to storage only through [`ProgressionStore`]. The SQLite
//! implementation lives in `~/.questline/progress.db` by default.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐      ┌──────────────────┐
//! │  Lifecycles /    │      │  Notification    │
//! │  XP ledger       │      │  sink            │
//! └────────┬─────────┘      └────────┬─────────┘
//!          │ ProgressionStore        │
//!          ▼                         ▼
//!    SqliteStore ──────────► ProgressionDb (progress.db)
//! ```

mod db;
mod sqlite;

pub use db::ProgressionDb;
pub use sqlite::SqliteStore;

use crate::domain::{
    BadgeAward, Boss, BossAttempt, BossId, Character, CharacterId, Level, LevelId, Mission,
    MissionAttempt, MissionId, NewBoss, NewLevel, NewMission, AttemptId, UserId,
};
use crate::progression::Result;

/// Outcome of an insert guarded by a uniqueness constraint
#[derive(Debug, Clone, PartialEq)]
pub enum Inserted<T> {
    /// The row did not exist and was written
    Created(T),
    /// Another row already held the key; nothing was written
    Existing(T),
}

impl<T> Inserted<T> {
    pub fn into_inner(self) -> T {
        match self {
            Inserted::Created(value) | Inserted::Existing(value) => value,
        }
    }

    pub fn was_created(&self) -> bool {
        matches!(self, Inserted::Created(_))
    }
}

/// Repository-style access to everything the engine reads and writes
pub trait ProgressionStore {
    /// Run `work` as a single unit of work; every write inside commits or none does
    fn atomically<T, F>(&self, work: F) -> Result<T>
    where
        Self: Sized,
        F: FnOnce(&dyn ProgressionStore) -> Result<T>;

    // Levels
    fn list_levels(&self) -> Result<Vec<Level>>;
    fn level(&self, id: LevelId) -> Result<Option<Level>>;
    fn insert_level(&self, level: &NewLevel) -> Result<Level>;

    // Missions
    fn mission(&self, id: MissionId) -> Result<Option<Mission>>;
    fn missions_for_level(&self, level_id: LevelId) -> Result<Vec<Mission>>;
    fn count_missions(&self, level_id: LevelId) -> Result<u64>;
    fn insert_mission(&self, mission: &NewMission) -> Result<Mission>;

    // Mission attempts
    fn mission_attempt(&self, id: AttemptId) -> Result<Option<MissionAttempt>>;
    fn mission_attempt_for(&self, user_id: UserId, mission_id: MissionId)
    -> Result<Option<MissionAttempt>>;
    /// Insert-or-fetch on the unique (user, mission) key
    fn insert_mission_attempt(&self, attempt: &MissionAttempt) -> Result<Inserted<MissionAttempt>>;
    fn save_mission_attempt(&self, attempt: &MissionAttempt) -> Result<()>;
    /// Count of the user's COMPLETED attempts on missions of the level
    fn count_completed_missions(&self, user_id: UserId, level_id: LevelId) -> Result<u64>;

    // Bosses
    fn boss(&self, id: BossId) -> Result<Option<Boss>>;
    fn boss_for_level(&self, level_id: LevelId) -> Result<Option<Boss>>;
    /// Fails with a rule violation when the level already has a boss
    fn insert_boss(&self, boss: &NewBoss) -> Result<Boss>;

    // Boss attempts
    fn boss_attempt(&self, id: AttemptId) -> Result<Option<BossAttempt>>;
    fn boss_attempt_for(&self, user_id: UserId, boss_id: BossId) -> Result<Option<BossAttempt>>;
    /// Insert-or-fetch on the unique (user, boss) key
    fn insert_boss_attempt(&self, attempt: &BossAttempt) -> Result<Inserted<BossAttempt>>;
    fn save_boss_attempt(&self, attempt: &BossAttempt) -> Result<()>;

    // Characters
    fn character(&self, id: CharacterId) -> Result<Option<Character>>;
    fn character_for_user(&self, user_id: UserId) -> Result<Option<Character>>;
    fn list_characters(&self) -> Result<Vec<Character>>;
    /// Fails with a rule violation when the user already has a character
    fn insert_character(&self, user_id: UserId, name: &str, level: u32) -> Result<Character>;
    fn save_character(&self, character: &Character) -> Result<()>;

    // Badges
    /// Insert-or-fetch on the unique (user, boss) key
    fn insert_badge_award(&self, award: &BadgeAward) -> Result<Inserted<BadgeAward>>;
    fn badge_awards_for_user(&self, user_id: UserId) -> Result<Vec<BadgeAward>>;
}
