//! Administration of levels, missions, bosses and characters

use tracing::info;

use super::level_table::LevelTable;
use super::{ProgressionError, Result};
use crate::domain::{
    Boss, Character, Level, LevelId, Mission, NewBoss, NewLevel, NewMission, UserId,
};
use crate::store::ProgressionStore;

pub struct Catalog<'a, S> {
    store: &'a S,
}

fn validate_level(level: &NewLevel) -> Result<()> {
    if level.order < 1 {
        return Err(ProgressionError::rule("Level order must be at least 1"));
    }
    if level.xp_threshold < 0 {
        return Err(ProgressionError::rule("Level XP threshold must not be negative"));
    }
    if level.name.trim().is_empty() {
        return Err(ProgressionError::rule("Level name is required"));
    }
    Ok(())
}

fn require_level(store: &dyn ProgressionStore, level_id: LevelId) -> Result<Level> {
    store
        .level(level_id)?
        .ok_or_else(|| ProgressionError::not_found(format!("Level {level_id} not found")))
}

impl<'a, S: ProgressionStore> Catalog<'a, S> {
    pub(crate) fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub fn levels(&self) -> Result<LevelTable> {
        LevelTable::load(self.store)
    }

    pub fn missions_for_level(&self, level_id: LevelId) -> Result<Vec<Mission>> {
        require_level(self.store, level_id)?;
        self.store.missions_for_level(level_id)
    }

    pub fn create_level(&self, level: &NewLevel) -> Result<Level> {
        validate_level(level)?;
        let created = self.store.insert_level(level)?;
        info!(level_id = created.id, order = created.order, "Created level '{}'", created.name);
        Ok(created)
    }

    /// Insert every level whose order is not taken yet; returns how many were added
    pub fn seed_levels(&self, levels: &[NewLevel]) -> Result<usize> {
        for level in levels {
            validate_level(level)?;
        }

        let added = self.store.atomically(|tx| {
            let existing = LevelTable::load(tx)?;
            let mut added = 0;
            for level in levels {
                if existing.by_order(level.order).is_none() {
                    tx.insert_level(level)?;
                    added += 1;
                }
            }
            Ok(added)
        })?;

        if added > 0 {
            info!(added, "Seeded level table");
        }
        Ok(added)
    }

    pub fn create_mission(&self, mission: &NewMission) -> Result<Mission> {
        if mission.xp_reward < 1 {
            return Err(ProgressionError::rule("Mission XP reward must be at least 1"));
        }
        if mission.title.trim().is_empty() {
            return Err(ProgressionError::rule("Mission title is required"));
        }

        let created = self.store.atomically(|tx| {
            require_level(tx, mission.level_id)?;
            tx.insert_mission(mission)
        })?;
        info!(mission_id = created.id, level_id = created.level_id, "Created mission '{}'", created.title);
        Ok(created)
    }

    /// Fails with "Level already has a boss" when the level has one
    pub fn create_boss(&self, boss: &NewBoss) -> Result<Boss> {
        if boss.xp_reward < 1 {
            return Err(ProgressionError::rule("Boss XP reward must be at least 1"));
        }
        if boss.badge.name.trim().is_empty() {
            return Err(ProgressionError::rule("Boss badge name is required"));
        }

        let created = self.store.atomically(|tx| {
            require_level(tx, boss.level_id)?;
            if tx.boss_for_level(boss.level_id)?.is_some() {
                return Err(ProgressionError::rule("Level already has a boss"));
            }
            tx.insert_boss(boss)
        })?;
        info!(boss_id = created.id, level_id = created.level_id, "Created boss '{}'", created.name);
        Ok(created)
    }

    /// Create the user's character at the level its zero XP qualifies for
    pub fn create_character(&self, user_id: UserId, name: &str) -> Result<Character> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ProgressionError::rule("Character name is required"));
        }

        let created = self.store.atomically(|tx| {
            if tx.character_for_user(user_id)?.is_some() {
                return Err(ProgressionError::rule(format!(
                    "User {user_id} already has a character"
                )));
            }
            let level = LevelTable::load(tx)?
                .level_for_xp(0)
                .map(|l| l.order)
                .unwrap_or(1);
            tx.insert_character(user_id, name, level)
        })?;
        info!(user_id, character_id = created.id, "Created character '{}'", created.name);
        Ok(created)
    }
}
