use serde::{Deserialize, Serialize};

use super::UserId;

/// Kind of progression event sent to a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    MissionEvaluated,
    LevelUp,
    BadgeUnlocked,
    BossEvaluated,
    BossUnlocked,
    GrimoireUnlocked,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::MissionEvaluated => "MISSION_EVALUATED",
            NotificationKind::LevelUp => "LEVEL_UP",
            NotificationKind::BadgeUnlocked => "BADGE_UNLOCKED",
            NotificationKind::BossEvaluated => "BOSS_EVALUATED",
            NotificationKind::BossUnlocked => "BOSS_UNLOCKED",
            NotificationKind::GrimoireUnlocked => "GRIMOIRE_UNLOCKED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "MISSION_EVALUATED" => Some(NotificationKind::MissionEvaluated),
            "LEVEL_UP" => Some(NotificationKind::LevelUp),
            "BADGE_UNLOCKED" => Some(NotificationKind::BadgeUnlocked),
            "BOSS_EVALUATED" => Some(NotificationKind::BossEvaluated),
            "BOSS_UNLOCKED" => Some(NotificationKind::BossUnlocked),
            "GRIMOIRE_UNLOCKED" => Some(NotificationKind::GrimoireUnlocked),
            _ => None,
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A progression event addressed to one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub user_id: UserId,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    /// Id of the entity the event is about (attempt, level, badge award)
    pub reference_id: Option<i64>,
}

impl Notification {
    pub fn new(
        user_id: UserId,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            kind,
            title: title.into(),
            message: message.into(),
            reference_id: None,
        }
    }

    pub fn with_reference(mut self, reference_id: i64) -> Self {
        self.reference_id = Some(reference_id);
        self
    }
}
