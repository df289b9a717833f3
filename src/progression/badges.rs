//! Badge awards for defeated bosses

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::{ProgressionError, Result};
use crate::domain::{
    BadgeAward, Boss, BossAttempt, BossStatus, Notification, NotificationKind, UserId,
};
use crate::store::{Inserted, ProgressionStore};

pub struct BadgeAwarder<'a> {
    store: &'a dyn ProgressionStore,
}

impl<'a> BadgeAwarder<'a> {
    pub fn new(store: &'a dyn ProgressionStore) -> Self {
        Self { store }
    }

    /// Record the boss's badge for a DEFEATED attempt.
    ///
    /// At most one award exists per (user, boss); a repeat call returns the
    /// stored award as [`Inserted::Existing`].
    pub fn award_for_defeat(
        &self,
        attempt: &BossAttempt,
        boss: &Boss,
        now: DateTime<Utc>,
    ) -> Result<Inserted<BadgeAward>> {
        if attempt.status() != BossStatus::Defeated {
            return Err(ProgressionError::rule(format!(
                "Badges are only awarded for defeated bosses (attempt is {})",
                attempt.status()
            )));
        }
        if attempt.boss_id != boss.id {
            return Err(ProgressionError::rule(format!(
                "Attempt {} does not belong to boss {}",
                attempt.id, boss.id
            )));
        }

        let award = BadgeAward {
            id: 0,
            user_id: attempt.user_id,
            boss_id: boss.id,
            boss_attempt_id: attempt.id,
            badge: boss.badge.clone(),
            awarded_at: now,
        };
        let inserted = self.store.insert_badge_award(&award)?;

        match &inserted {
            Inserted::Created(award) => info!(
                user_id = award.user_id,
                boss_id = award.boss_id,
                "Badge '{}' awarded",
                award.badge.name
            ),
            Inserted::Existing(award) => debug!(
                user_id = award.user_id,
                boss_id = award.boss_id,
                "Badge '{}' already awarded",
                award.badge.name
            ),
        }
        Ok(inserted)
    }

    pub fn badges_for_user(&self, user_id: UserId) -> Result<Vec<BadgeAward>> {
        self.store.badge_awards_for_user(user_id)
    }
}

pub(crate) fn badge_notification(award: &BadgeAward) -> Notification {
    Notification::new(
        award.user_id,
        NotificationKind::BadgeUnlocked,
        "Badge unlocked",
        format!("You earned the '{}' badge", award.badge.name),
    )
    .with_reference(award.id)
}
