//! Per-user boss attempts, gated by the level's mission completion

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info};

use super::badges::{BadgeAwarder, badge_notification};
use super::calculator::ProgressCalculator;
use super::level_table::LevelTable;
use super::locks::PairKey;
use super::submission::validate_submission_url;
use super::xp_ledger::{XpAward, apply_xp};
use super::{Progression, ProgressionError, Result};
use crate::domain::{
    AttemptId, BadgeAward, Boss, BossAttempt, BossId, BossStatus, CallerContext, Level, LevelId,
    Notification, NotificationKind,
};
use crate::store::{Inserted, ProgressionStore};

fn require_boss(store: &dyn ProgressionStore, boss_id: BossId) -> Result<Boss> {
    store
        .boss(boss_id)?
        .ok_or_else(|| ProgressionError::not_found(format!("Boss {boss_id} not found")))
}

/// Result of an unlock check
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BossProgress {
    pub level_id: LevelId,
    pub boss_id: BossId,
    pub boss_name: String,
    pub attempt_id: AttemptId,
    pub completion_percentage: f64,
    pub unlock_threshold_percent: f64,
    pub status: BossStatus,
    pub unlocked: bool,
    /// This check moved the attempt out of LOCKED
    pub just_unlocked: bool,
}

/// Outcome of a mentor's decision on a boss submission
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BossEvaluation {
    pub attempt: BossAttempt,
    pub boss: Boss,
    /// Present when the submission was approved
    pub xp: Option<XpAward>,
    /// Newly created award; `None` on rejection or if the badge was already held
    pub badge: Option<BadgeAward>,
    /// Level whose grimoire this defeat unlocked
    pub grimoire: Option<Level>,
}

impl BossEvaluation {
    pub fn approved(&self) -> bool {
        self.attempt.status() == BossStatus::Defeated
    }

    fn notifications(&self) -> Vec<Notification> {
        let user_id = self.attempt.user_id;
        let (title, message) = if self.approved() {
            ("Boss defeated", format!("You defeated {}!", self.boss.name))
        } else {
            (
                "Boss still standing",
                format!("Your attempt against {} was not approved yet", self.boss.name),
            )
        };

        let mut out = vec![
            Notification::new(user_id, NotificationKind::BossEvaluated, title, message)
                .with_reference(self.attempt.id),
        ];
        out.extend(self.xp.as_ref().and_then(XpAward::notification));
        out.extend(self.badge.as_ref().map(badge_notification));
        out.extend(self.grimoire.as_ref().map(|level| {
            Notification::new(
                user_id,
                NotificationKind::GrimoireUnlocked,
                "Grimoire unlocked",
                format!(
                    "The grimoire for level {} ({}) is now available",
                    level.order, level.name
                ),
            )
            .with_reference(level.id)
        }));
        out
    }
}

pub struct BossLifecycle<'a, S> {
    engine: &'a Progression<S>,
}

impl<'a, S: ProgressionStore> BossLifecycle<'a, S> {
    pub(crate) fn new(engine: &'a Progression<S>) -> Self {
        Self { engine }
    }

    /// Check the caller's progress on the level and unlock its boss once the
    /// completion threshold is reached. Writes only on creation or unlock.
    pub fn check_unlock(&self, caller: &CallerContext, level_id: LevelId) -> Result<BossProgress> {
        let user_id = caller.require_user()?;
        let engine = self.engine;
        let threshold = engine.settings.unlock_threshold_percent;

        let boss = engine.store.boss_for_level(level_id)?.ok_or_else(|| {
            ProgressionError::not_found(format!("Level {level_id} has no boss"))
        })?;

        let progress = engine
            .pair_locks
            .with_lock(PairKey::Boss(user_id, boss.id), || {
                engine.store.atomically(|tx| {
                    let pct =
                        ProgressCalculator::new(tx).level_completion_percentage(level_id, user_id)?;
                    let reached = pct >= threshold;
                    let now = Utc::now();
                    let mut just_unlocked = false;

                    let attempt = match tx.boss_attempt_for(user_id, boss.id)? {
                        Some(attempt) => attempt,
                        None => {
                            let mut fresh = BossAttempt::new(user_id, boss.id);
                            if reached {
                                fresh.unlock(now)?;
                            }
                            match tx.insert_boss_attempt(&fresh)? {
                                Inserted::Created(created) => {
                                    just_unlocked = reached;
                                    created
                                }
                                Inserted::Existing(existing) => existing,
                            }
                        }
                    };

                    let mut attempt = attempt;
                    if reached && attempt.status() == BossStatus::Locked {
                        attempt.unlock(now)?;
                        tx.save_boss_attempt(&attempt)?;
                        just_unlocked = true;
                    }

                    Ok(BossProgress {
                        level_id,
                        boss_id: boss.id,
                        boss_name: boss.name.clone(),
                        attempt_id: attempt.id,
                        completion_percentage: pct,
                        unlock_threshold_percent: threshold,
                        status: attempt.status(),
                        unlocked: attempt.status().is_unlocked(),
                        just_unlocked,
                    })
                })
            })?;

        if progress.just_unlocked {
            info!(user_id, boss_id = boss.id, "Boss unlocked at {}%", progress.completion_percentage);
            engine.emit_all([Notification::new(
                user_id,
                NotificationKind::BossUnlocked,
                "Boss unlocked",
                format!("{} is ready for you", boss.name),
            )
            .with_reference(progress.attempt_id)]);
        } else {
            debug!(
                user_id,
                boss_id = boss.id,
                status = %progress.status,
                "Boss unlock check at {}%",
                progress.completion_percentage
            );
        }
        Ok(progress)
    }

    /// Begin the fight; only an UNLOCKED attempt can start
    pub fn start(&self, caller: &CallerContext, boss_id: BossId) -> Result<BossAttempt> {
        let user_id = caller.require_user()?;
        let engine = self.engine;

        let attempt = engine
            .pair_locks
            .with_lock(PairKey::Boss(user_id, boss_id), || {
                engine.store.atomically(|tx| {
                    require_boss(tx, boss_id)?;
                    // Never checked means never unlocked
                    let mut attempt = tx
                        .boss_attempt_for(user_id, boss_id)?
                        .unwrap_or_else(|| BossAttempt::new(user_id, boss_id));
                    attempt.start(Utc::now())?;
                    tx.save_boss_attempt(&attempt)?;
                    Ok(attempt)
                })
            })?;

        info!(user_id, boss_id, attempt_id = attempt.id, "Boss fight started");
        Ok(attempt)
    }

    /// Hand in the boss project; allowed from IN_PROGRESS and FAILED
    pub fn submit(
        &self,
        caller: &CallerContext,
        boss_id: BossId,
        submission_url: &str,
        notes: Option<String>,
    ) -> Result<BossAttempt> {
        let user_id = caller.require_user()?;
        let url = validate_submission_url(submission_url)?;
        let engine = self.engine;

        let attempt = engine
            .pair_locks
            .with_lock(PairKey::Boss(user_id, boss_id), || {
                engine.store.atomically(|tx| {
                    require_boss(tx, boss_id)?;
                    let mut attempt = tx
                        .boss_attempt_for(user_id, boss_id)?
                        .unwrap_or_else(|| BossAttempt::new(user_id, boss_id));
                    attempt.submit(url, notes, Utc::now())?;
                    tx.save_boss_attempt(&attempt)?;
                    Ok(attempt)
                })
            })?;

        info!(user_id, boss_id, attempt_id = attempt.id, "Boss submission received");
        Ok(attempt)
    }

    /// Approve or reject a boss submission. Approval credits XP, awards the
    /// badge and, for bosses that open the next level, its grimoire.
    pub fn evaluate(
        &self,
        caller: &CallerContext,
        attempt_id: AttemptId,
        approved: bool,
        feedback: Option<String>,
    ) -> Result<BossEvaluation> {
        let evaluator_id = caller.require_evaluator()?;
        let engine = self.engine;

        let found = engine.store.boss_attempt(attempt_id)?.ok_or_else(|| {
            ProgressionError::not_found(format!("Boss attempt {attempt_id} not found"))
        })?;
        let user_id = found.user_id;

        let evaluation = engine
            .pair_locks
            .with_lock(PairKey::Boss(user_id, found.boss_id), || {
                let character_id = if approved {
                    Some(engine.character_id_for(user_id)?)
                } else {
                    None
                };

                engine.with_character_lock(character_id, || {
                    engine.store.atomically(|tx| {
                        let mut attempt = tx.boss_attempt(attempt_id)?.ok_or_else(|| {
                            ProgressionError::not_found(format!(
                                "Boss attempt {attempt_id} not found"
                            ))
                        })?;
                        let boss = require_boss(tx, attempt.boss_id)?;
                        let now = Utc::now();

                        attempt.evaluate(approved, feedback, evaluator_id, now)?;
                        tx.save_boss_attempt(&attempt)?;

                        let Some(character_id) = character_id else {
                            return Ok(BossEvaluation {
                                attempt,
                                boss,
                                xp: None,
                                badge: None,
                                grimoire: None,
                            });
                        };

                        let xp = apply_xp(tx, character_id, Some(boss.xp_reward))?;
                        let badge = match BadgeAwarder::new(tx).award_for_defeat(&attempt, &boss, now)? {
                            Inserted::Created(award) => Some(award),
                            Inserted::Existing(_) => None,
                        };
                        let grimoire = if boss.unlocks_next_level {
                            let table = LevelTable::load(tx)?;
                            table
                                .by_id(boss.level_id)
                                .and_then(|level| table.next_after(level.order))
                                .cloned()
                        } else {
                            None
                        };

                        Ok(BossEvaluation {
                            attempt,
                            boss,
                            xp: Some(xp),
                            badge,
                            grimoire,
                        })
                    })
                })
            })?;

        if evaluation.approved() {
            info!(user_id, attempt_id, evaluator_id, "Boss defeated");
        } else {
            info!(user_id, attempt_id, evaluator_id, "Boss attempt rejected");
        }
        engine.emit_all(evaluation.notifications());
        Ok(evaluation)
    }
}
