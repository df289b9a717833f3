//! Core domain types for Questline

mod attempt;
mod badge;
mod boss;
mod character;
mod identity;
mod level;
mod mission;
mod notification;
mod status;

pub use attempt::{AttemptRecord, BossAttempt, MissionAttempt};
pub use badge::{BadgeAward, BadgeInfo};
pub use boss::{Boss, NewBoss};
pub use character::Character;
pub use identity::{CallerContext, Role};
pub use level::{Difficulty, Level, NewLevel};
pub use mission::{Mission, NewMission};
pub use notification::{Notification, NotificationKind};
pub use status::{AttemptAction, BossStatus, MissionStatus};

/// Identifier of a user (owned by the identity provider, not by the engine)
pub type UserId = i64;

pub type LevelId = i64;
pub type MissionId = i64;
pub type BossId = i64;
pub type AttemptId = i64;
pub type CharacterId = i64;
pub type BadgeAwardId = i64;
