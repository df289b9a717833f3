use serde::{Deserialize, Serialize};

use super::{LevelId, MissionId};

/// A mission definition (shared by all users)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mission {
    pub id: MissionId,
    pub level_id: LevelId,
    pub title: String,
    pub description: Option<String>,
    pub xp_reward: i64,
    pub order_number: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMission {
    pub level_id: LevelId,
    pub title: String,
    pub description: Option<String>,
    pub xp_reward: i64,
    pub order_number: u32,
}

impl NewMission {
    pub fn new(level_id: LevelId, title: impl Into<String>, xp_reward: i64, order_number: u32) -> Self {
        Self {
            level_id,
            title: title.into(),
            description: None,
            xp_reward,
            order_number,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}
