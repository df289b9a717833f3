use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AttemptId, BadgeAwardId, BossId, UserId};

/// Badge metadata carried by a boss
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeInfo {
    pub name: String,
    pub description: Option<String>,
    pub icon: Option<String>,
}

impl BadgeInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            icon: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }
}

/// Permanent record that a user defeated a boss
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BadgeAward {
    pub id: BadgeAwardId,
    pub user_id: UserId,
    pub boss_id: BossId,
    /// The boss attempt whose approval produced this award
    pub boss_attempt_id: AttemptId,
    pub badge: BadgeInfo,
    pub awarded_at: DateTime<Utc>,
}
