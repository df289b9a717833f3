//! Per-user mission attempts: start, submit, evaluate

use chrono::Utc;
use serde::Serialize;
use tracing::info;

use super::locks::PairKey;
use super::submission::validate_submission_url;
use super::xp_ledger::{XpAward, apply_xp};
use super::{Progression, ProgressionError, Result};
use crate::domain::{
    AttemptId, CallerContext, Mission, MissionAttempt, MissionId, Notification, NotificationKind,
};
use crate::store::{Inserted, ProgressionStore};

fn require_mission(store: &dyn ProgressionStore, mission_id: MissionId) -> Result<Mission> {
    store
        .mission(mission_id)?
        .ok_or_else(|| ProgressionError::not_found(format!("Mission {mission_id} not found")))
}

/// Outcome of a mentor's decision on a mission submission
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissionEvaluation {
    pub attempt: MissionAttempt,
    pub mission: Mission,
    /// Present when the submission was approved
    pub xp: Option<XpAward>,
}

impl MissionEvaluation {
    pub fn approved(&self) -> bool {
        self.xp.is_some()
    }

    fn notifications(&self) -> Vec<Notification> {
        let (title, message) = match &self.xp {
            Some(award) => (
                "Mission completed",
                format!(
                    "'{}' was approved: +{} XP",
                    self.mission.title, award.amount
                ),
            ),
            None => (
                "Mission needs another try",
                format!("'{}' was not approved yet", self.mission.title),
            ),
        };

        let mut out = vec![
            Notification::new(
                self.attempt.user_id,
                NotificationKind::MissionEvaluated,
                title,
                message,
            )
            .with_reference(self.attempt.id),
        ];
        out.extend(self.xp.as_ref().and_then(XpAward::notification));
        out
    }
}

pub struct MissionLifecycle<'a, S> {
    engine: &'a Progression<S>,
}

impl<'a, S: ProgressionStore> MissionLifecycle<'a, S> {
    pub(crate) fn new(engine: &'a Progression<S>) -> Self {
        Self { engine }
    }

    /// Move the caller's attempt from AVAILABLE to IN_PROGRESS, creating it on first start
    pub fn start(&self, caller: &CallerContext, mission_id: MissionId) -> Result<MissionAttempt> {
        let user_id = caller.require_user()?;
        let engine = self.engine;

        let attempt = engine
            .pair_locks
            .with_lock(PairKey::Mission(user_id, mission_id), || {
                engine.store.atomically(|tx| {
                    require_mission(tx, mission_id)?;
                    let now = Utc::now();

                    if let Some(mut attempt) = tx.mission_attempt_for(user_id, mission_id)? {
                        attempt.start(now)?;
                        tx.save_mission_attempt(&attempt)?;
                        return Ok(attempt);
                    }

                    let mut attempt = MissionAttempt::new(user_id, mission_id);
                    attempt.start(now)?;
                    match tx.insert_mission_attempt(&attempt)? {
                        Inserted::Created(attempt) => Ok(attempt),
                        Inserted::Existing(mut attempt) => {
                            attempt.start(now)?;
                            tx.save_mission_attempt(&attempt)?;
                            Ok(attempt)
                        }
                    }
                })
            })?;

        info!(user_id, mission_id, attempt_id = attempt.id, "Mission started");
        Ok(attempt)
    }

    /// Hand in work for review; allowed from IN_PROGRESS and FAILED
    pub fn submit(
        &self,
        caller: &CallerContext,
        mission_id: MissionId,
        submission_url: &str,
        notes: Option<String>,
    ) -> Result<MissionAttempt> {
        let user_id = caller.require_user()?;
        let url = validate_submission_url(submission_url)?;
        let engine = self.engine;

        let attempt = engine
            .pair_locks
            .with_lock(PairKey::Mission(user_id, mission_id), || {
                engine.store.atomically(|tx| {
                    require_mission(tx, mission_id)?;
                    // No row yet means the mission was never started (AVAILABLE)
                    let mut attempt = tx
                        .mission_attempt_for(user_id, mission_id)?
                        .unwrap_or_else(|| MissionAttempt::new(user_id, mission_id));
                    attempt.submit(url, notes, Utc::now())?;
                    tx.save_mission_attempt(&attempt)?;
                    Ok(attempt)
                })
            })?;

        info!(user_id, mission_id, attempt_id = attempt.id, "Mission submitted");
        Ok(attempt)
    }

    /// Approve or reject a submission; approval credits the mission's XP
    pub fn evaluate(
        &self,
        caller: &CallerContext,
        attempt_id: AttemptId,
        approved: bool,
        feedback: Option<String>,
    ) -> Result<MissionEvaluation> {
        let evaluator_id = caller.require_evaluator()?;
        let engine = self.engine;

        let found = engine.store.mission_attempt(attempt_id)?.ok_or_else(|| {
            ProgressionError::not_found(format!("Mission attempt {attempt_id} not found"))
        })?;
        let user_id = found.user_id;

        let evaluation = engine
            .pair_locks
            .with_lock(PairKey::Mission(user_id, found.mission_id), || {
                let character_id = if approved {
                    Some(engine.character_id_for(user_id)?)
                } else {
                    None
                };

                engine.with_character_lock(character_id, || {
                    engine.store.atomically(|tx| {
                        let mut attempt = tx.mission_attempt(attempt_id)?.ok_or_else(|| {
                            ProgressionError::not_found(format!(
                                "Mission attempt {attempt_id} not found"
                            ))
                        })?;
                        let mission = require_mission(tx, attempt.mission_id)?;

                        attempt.evaluate(approved, feedback, evaluator_id, Utc::now())?;
                        tx.save_mission_attempt(&attempt)?;

                        let xp = match character_id {
                            Some(character_id) => {
                                Some(apply_xp(tx, character_id, Some(mission.xp_reward))?)
                            }
                            None => None,
                        };

                        Ok(MissionEvaluation {
                            attempt,
                            mission,
                            xp,
                        })
                    })
                })
            })?;

        info!(
            user_id,
            attempt_id,
            evaluator_id,
            approved,
            "Mission attempt evaluated"
        );
        engine.emit_all(evaluation.notifications());
        Ok(evaluation)
    }
}
