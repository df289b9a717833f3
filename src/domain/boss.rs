use serde::{Deserialize, Serialize};

use super::{BadgeInfo, BossId, LevelId};

/// The level-ending challenge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Boss {
    pub id: BossId,
    pub level_id: LevelId,
    pub name: String,
    pub description: Option<String>,
    pub xp_reward: i64,
    /// Badge handed out on defeat
    pub badge: BadgeInfo,
    /// Whether defeating this boss opens the next level's grimoire
    pub unlocks_next_level: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBoss {
    pub level_id: LevelId,
    pub name: String,
    pub description: Option<String>,
    pub xp_reward: i64,
    pub badge: BadgeInfo,
    pub unlocks_next_level: bool,
}

impl NewBoss {
    pub fn new(level_id: LevelId, name: impl Into<String>, xp_reward: i64, badge: BadgeInfo) -> Self {
        Self {
            level_id,
            name: name.into(),
            description: None,
            xp_reward,
            badge,
            unlocks_next_level: true,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn unlocks_next_level(mut self, unlocks: bool) -> Self {
        self.unlocks_next_level = unlocks;
        self
    }
}
