//! Per-user attempt records for missions and bosses
//!
//! The status field is private: it only moves through the methods below,
//! each of which runs the state machine before stamping timestamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AttemptAction, AttemptId, BossId, BossStatus, MissionId, MissionStatus, UserId};
use crate::progression::Result;

/// Submission and evaluation data shared by mission and boss attempts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub submission_url: Option<String>,
    pub submission_notes: Option<String>,
    pub feedback: Option<String>,
    /// User id of the mentor/admin who evaluated the attempt
    pub evaluator_id: Option<UserId>,
    pub started_at: Option<DateTime<Utc>>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub evaluated_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl AttemptRecord {
    fn record_submission(&mut self, url: &str, notes: Option<String>, now: DateTime<Utc>) {
        self.submission_url = Some(url.to_string());
        self.submission_notes = notes;
        self.submitted_at = Some(now);
    }

    fn record_evaluation(
        &mut self,
        approved: bool,
        feedback: Option<String>,
        evaluator_id: UserId,
        now: DateTime<Utc>,
    ) {
        self.feedback = feedback;
        self.evaluator_id = Some(evaluator_id);
        self.evaluated_at = Some(now);
        if approved {
            self.completed_at = Some(now);
        }
    }
}

fn evaluation_action(approved: bool) -> AttemptAction {
    if approved {
        AttemptAction::Approve
    } else {
        AttemptAction::Reject
    }
}

/// A user's attempt at one mission
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissionAttempt {
    /// Assigned by the store on insert (0 until then)
    pub id: AttemptId,
    pub user_id: UserId,
    pub mission_id: MissionId,
    status: MissionStatus,
    #[serde(flatten)]
    pub record: AttemptRecord,
}

impl MissionAttempt {
    /// Unsaved attempt in AVAILABLE
    pub fn new(user_id: UserId, mission_id: MissionId) -> Self {
        Self {
            id: 0,
            user_id,
            mission_id,
            status: MissionStatus::Available,
            record: AttemptRecord::default(),
        }
    }

    /// Rebuild a stored attempt
    pub(crate) fn restore(
        id: AttemptId,
        user_id: UserId,
        mission_id: MissionId,
        status: MissionStatus,
        record: AttemptRecord,
    ) -> Self {
        Self {
            id,
            user_id,
            mission_id,
            status,
            record,
        }
    }

    pub fn status(&self) -> MissionStatus {
        self.status
    }

    pub fn start(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.status = self.status.transition(AttemptAction::Start)?;
        self.record.started_at = Some(now);
        Ok(())
    }

    pub fn submit(&mut self, url: &str, notes: Option<String>, now: DateTime<Utc>) -> Result<()> {
        self.status = self.status.transition(AttemptAction::Submit)?;
        self.record.record_submission(url, notes, now);
        Ok(())
    }

    pub fn evaluate(
        &mut self,
        approved: bool,
        feedback: Option<String>,
        evaluator_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.status = self.status.transition(evaluation_action(approved))?;
        self.record
            .record_evaluation(approved, feedback, evaluator_id, now);
        Ok(())
    }
}

/// A user's attempt at a level's boss
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BossAttempt {
    /// Assigned by the store on insert (0 until then)
    pub id: AttemptId,
    pub user_id: UserId,
    pub boss_id: BossId,
    status: BossStatus,
    pub unlocked_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub record: AttemptRecord,
}

impl BossAttempt {
    /// Unsaved attempt in LOCKED
    pub fn new(user_id: UserId, boss_id: BossId) -> Self {
        Self {
            id: 0,
            user_id,
            boss_id,
            status: BossStatus::Locked,
            unlocked_at: None,
            record: AttemptRecord::default(),
        }
    }

    pub(crate) fn restore(
        id: AttemptId,
        user_id: UserId,
        boss_id: BossId,
        status: BossStatus,
        unlocked_at: Option<DateTime<Utc>>,
        record: AttemptRecord,
    ) -> Self {
        Self {
            id,
            user_id,
            boss_id,
            status,
            unlocked_at,
            record,
        }
    }

    pub fn status(&self) -> BossStatus {
        self.status
    }

    pub fn unlock(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.status = self.status.transition(AttemptAction::Unlock)?;
        self.unlocked_at = Some(now);
        Ok(())
    }

    pub fn start(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.status = self.status.transition(AttemptAction::Start)?;
        self.record.started_at = Some(now);
        Ok(())
    }

    pub fn submit(&mut self, url: &str, notes: Option<String>, now: DateTime<Utc>) -> Result<()> {
        self.status = self.status.transition(AttemptAction::Submit)?;
        self.record.record_submission(url, notes, now);
        Ok(())
    }

    pub fn evaluate(
        &mut self,
        approved: bool,
        feedback: Option<String>,
        evaluator_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.status = self.status.transition(evaluation_action(approved))?;
        self.record
            .record_evaluation(approved, feedback, evaluator_id, now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mission_attempt_stamps_each_step() {
        let now = Utc::now();
        let mut attempt = MissionAttempt::new(7, 3);
        attempt.start(now).unwrap();
        assert_eq!(attempt.record.started_at, Some(now));

        attempt
            .submit("https://github.com/ada/quest", Some("first try".into()), now)
            .unwrap();
        assert_eq!(attempt.status(), MissionStatus::AwaitingEvaluation);
        assert_eq!(attempt.record.submission_notes.as_deref(), Some("first try"));

        attempt.evaluate(false, Some("missing tests".into()), 99, now).unwrap();
        assert_eq!(attempt.status(), MissionStatus::Failed);
        assert_eq!(attempt.record.evaluator_id, Some(99));
        assert!(attempt.record.completed_at.is_none());
    }

    #[test]
    fn test_failed_transition_leaves_attempt_untouched() {
        let now = Utc::now();
        let mut attempt = BossAttempt::new(1, 1);
        let before = attempt.clone();

        assert!(attempt.submit("https://github.com/a/b", None, now).is_err());
        assert_eq!(attempt, before);
    }

    #[test]
    fn test_boss_approval_sets_completion() {
        let now = Utc::now();
        let mut attempt = BossAttempt::new(1, 1);
        attempt.unlock(now).unwrap();
        attempt.start(now).unwrap();
        attempt.submit("https://github.com/a/b", None, now).unwrap();
        attempt.evaluate(true, None, 2, now).unwrap();

        assert_eq!(attempt.status(), BossStatus::Defeated);
        assert_eq!(attempt.unlocked_at, Some(now));
        assert_eq!(attempt.record.completed_at, Some(now));
    }
}
