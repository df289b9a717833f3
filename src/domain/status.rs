//! Attempt state machines
//!
//! Status values only change through `transition`, which either returns the
//! next state or a rule violation. Illegal moves are rejected, never corrected.

use serde::{Deserialize, Serialize};

use crate::progression::{ProgressionError, Result};

/// Something a user, mentor or the engine does to an attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptAction {
    /// Mission completion crossed the unlock threshold (boss only)
    Unlock,
    Start,
    Submit,
    Approve,
    Reject,
}

impl AttemptAction {
    pub fn verb(&self) -> &'static str {
        match self {
            AttemptAction::Unlock => "unlock",
            AttemptAction::Start => "start",
            AttemptAction::Submit => "submit",
            AttemptAction::Approve => "approve",
            AttemptAction::Reject => "reject",
        }
    }
}

/// Status of a user's mission attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionStatus {
    Available,
    InProgress,
    AwaitingEvaluation,
    Completed,
    Failed,
}

impl MissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MissionStatus::Available => "available",
            MissionStatus::InProgress => "in_progress",
            MissionStatus::AwaitingEvaluation => "awaiting_evaluation",
            MissionStatus::Completed => "completed",
            MissionStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "available" => Some(MissionStatus::Available),
            "in_progress" => Some(MissionStatus::InProgress),
            "awaiting_evaluation" => Some(MissionStatus::AwaitingEvaluation),
            "completed" => Some(MissionStatus::Completed),
            "failed" => Some(MissionStatus::Failed),
            _ => None,
        }
    }

    pub fn transition(self, action: AttemptAction) -> Result<Self> {
        use AttemptAction::*;
        use MissionStatus::*;

        match (self, action) {
            (Available, Start) => Ok(InProgress),
            // TODO: confirm with product whether FAILED must go through a new start first
            (InProgress | Failed, Submit) => Ok(AwaitingEvaluation),
            (AwaitingEvaluation, Approve) => Ok(Completed),
            (AwaitingEvaluation, Reject) => Ok(Failed),
            (status, action) => Err(ProgressionError::rule(format!(
                "Cannot {} a mission attempt in status {}",
                action.verb(),
                status
            ))),
        }
    }
}

impl std::fmt::Display for MissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Status of a user's boss attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BossStatus {
    Locked,
    Unlocked,
    InProgress,
    AwaitingEvaluation,
    Defeated,
    Failed,
}

impl BossStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BossStatus::Locked => "locked",
            BossStatus::Unlocked => "unlocked",
            BossStatus::InProgress => "in_progress",
            BossStatus::AwaitingEvaluation => "awaiting_evaluation",
            BossStatus::Defeated => "defeated",
            BossStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "locked" => Some(BossStatus::Locked),
            "unlocked" => Some(BossStatus::Unlocked),
            "in_progress" => Some(BossStatus::InProgress),
            "awaiting_evaluation" => Some(BossStatus::AwaitingEvaluation),
            "defeated" => Some(BossStatus::Defeated),
            "failed" => Some(BossStatus::Failed),
            _ => None,
        }
    }

    /// True once the boss has left LOCKED
    pub fn is_unlocked(&self) -> bool {
        !matches!(self, BossStatus::Locked)
    }

    pub fn transition(self, action: AttemptAction) -> Result<Self> {
        use AttemptAction::*;
        use BossStatus::*;

        match (self, action) {
            (Locked, Unlock) => Ok(Unlocked),
            (Locked, Start) => Err(ProgressionError::rule(
                "Boss is locked: complete more of the level's missions first",
            )),
            (Unlocked, Start) => Ok(InProgress),
            (InProgress | Failed, Submit) => Ok(AwaitingEvaluation),
            (AwaitingEvaluation, Approve) => Ok(Defeated),
            (AwaitingEvaluation, Reject) => Ok(Failed),
            (status, action) => Err(ProgressionError::rule(format!(
                "Cannot {} a boss attempt in status {}",
                action.verb(),
                status
            ))),
        }
    }
}

impl std::fmt::Display for BossStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progression::ErrorKind;

    #[test]
    fn test_mission_happy_path() {
        let status = MissionStatus::Available
            .transition(AttemptAction::Start)
            .and_then(|s| s.transition(AttemptAction::Submit))
            .and_then(|s| s.transition(AttemptAction::Approve))
            .unwrap();
        assert_eq!(status, MissionStatus::Completed);
    }

    #[test]
    fn test_mission_failed_can_resubmit() {
        let failed = MissionStatus::AwaitingEvaluation
            .transition(AttemptAction::Reject)
            .unwrap();
        assert_eq!(failed, MissionStatus::Failed);
        assert_eq!(
            failed.transition(AttemptAction::Submit).unwrap(),
            MissionStatus::AwaitingEvaluation
        );
    }

    #[test]
    fn test_mission_rejects_illegal_moves() {
        let illegal = [
            (MissionStatus::Available, AttemptAction::Submit),
            (MissionStatus::InProgress, AttemptAction::Start),
            (MissionStatus::InProgress, AttemptAction::Approve),
            (MissionStatus::Completed, AttemptAction::Approve),
            (MissionStatus::Completed, AttemptAction::Submit),
            (MissionStatus::Failed, AttemptAction::Reject),
            (MissionStatus::Available, AttemptAction::Unlock),
        ];
        for (status, action) in illegal {
            let err = status.transition(action).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::RuleViolation, "{status} + {action:?}");
        }
    }

    #[test]
    fn test_boss_locked_cannot_start() {
        let err = BossStatus::Locked.transition(AttemptAction::Start).unwrap_err();
        assert!(err.to_string().contains("locked"));
    }

    #[test]
    fn test_boss_full_cycle_with_retry() {
        let mut status = BossStatus::Locked;
        for action in [
            AttemptAction::Unlock,
            AttemptAction::Start,
            AttemptAction::Submit,
            AttemptAction::Reject,
            AttemptAction::Submit,
            AttemptAction::Approve,
        ] {
            status = status.transition(action).unwrap();
        }
        assert_eq!(status, BossStatus::Defeated);
        assert!(status.transition(AttemptAction::Approve).is_err());
        assert!(status.transition(AttemptAction::Reject).is_err());
    }

    #[test]
    fn test_boss_unlock_only_from_locked() {
        assert!(BossStatus::Unlocked.transition(AttemptAction::Unlock).is_err());
        assert!(BossStatus::Defeated.transition(AttemptAction::Unlock).is_err());
        assert!(BossStatus::Unlocked.is_unlocked());
        assert!(!BossStatus::Locked.is_unlocked());
    }

    #[test]
    fn test_status_strings() {
        assert_eq!(
            BossStatus::from_str(BossStatus::AwaitingEvaluation.as_str()),
            Some(BossStatus::AwaitingEvaluation)
        );
        assert_eq!(MissionStatus::from_str("COMPLETED"), Some(MissionStatus::Completed));
        assert_eq!(MissionStatus::from_str("done"), None);
    }
}
