//! Read-only summary of a user's progress across all levels

use serde::Serialize;

use super::calculator::xp_progress;
use super::level_table::LevelTable;
use super::{ProgressionError, Result, percent};
use crate::domain::{BadgeAward, BossId, BossStatus, Character, LevelId, UserId};
use crate::store::ProgressionStore;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BossOverview {
    pub boss_id: BossId,
    pub name: String,
    /// LOCKED when the user never checked this boss
    pub status: BossStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelOverview {
    pub level_id: LevelId,
    pub order: u32,
    pub name: String,
    pub completed_missions: u64,
    pub total_missions: u64,
    /// `None` for a level without missions
    pub completion_percentage: Option<f64>,
    pub boss: Option<BossOverview>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressOverview {
    pub character: Character,
    pub level_name: Option<String>,
    pub progress_to_next_level: f64,
    pub levels: Vec<LevelOverview>,
    pub badges: Vec<BadgeAward>,
}

impl ProgressOverview {
    pub fn for_user(store: &dyn ProgressionStore, user_id: UserId) -> Result<Self> {
        let character = store.character_for_user(user_id)?.ok_or_else(|| {
            ProgressionError::not_found(format!("No character found for user {user_id}"))
        })?;
        let table = LevelTable::load(store)?;

        let mut levels = Vec::with_capacity(table.levels().len());
        for level in table.levels() {
            let total_missions = store.count_missions(level.id)?;
            let completed_missions = store.count_completed_missions(user_id, level.id)?;

            let boss = match store.boss_for_level(level.id)? {
                Some(boss) => {
                    let status = store
                        .boss_attempt_for(user_id, boss.id)?
                        .map(|a| a.status())
                        .unwrap_or(BossStatus::Locked);
                    Some(BossOverview {
                        boss_id: boss.id,
                        name: boss.name,
                        status,
                    })
                }
                None => None,
            };

            levels.push(LevelOverview {
                level_id: level.id,
                order: level.order,
                name: level.name.clone(),
                completed_missions,
                total_missions,
                completion_percentage: percent::percentage(completed_missions, total_missions),
                boss,
            });
        }

        Ok(Self {
            level_name: table.by_order(character.level).map(|l| l.name.clone()),
            progress_to_next_level: xp_progress(&table, character.xp, character.level)?,
            badges: store.badge_awards_for_user(user_id)?,
            levels,
            character,
        })
    }
}
