//! Progression engine: attempt lifecycles, XP, badges and ranking
//!
//! # Usage
//!
//! ```ignore
//! let store = SqliteStore::new(ProgressionDb::open(&config.database_path())?);
//! let engine = Progression::new(store, Arc::new(LogNotifier));
//!
//! let caller = CallerContext::student(42);
//! engine.missions().start(&caller, mission_id)?;
//! let progress = engine.bosses().check_unlock(&caller, level_id)?;
//! ```
//!
//! Every state-changing operation runs as one store transaction, serialized
//! per (user, mission) or (user, boss) pair and per character. Notifications
//! are emitted only after the transaction commits.

mod badges;
mod boss_lifecycle;
mod calculator;
mod catalog;
mod error;
mod level_table;
mod locks;
mod mission_lifecycle;
mod overview;
pub mod percent;
mod ranking;
mod submission;
mod xp_ledger;

pub use badges::BadgeAwarder;
pub use boss_lifecycle::{BossEvaluation, BossLifecycle, BossProgress};
pub use calculator::ProgressCalculator;
pub use catalog::Catalog;
pub use error::{ErrorKind, ProgressionError, Result};
pub use level_table::LevelTable;
pub use mission_lifecycle::{MissionEvaluation, MissionLifecycle};
pub use overview::{BossOverview, LevelOverview, ProgressOverview};
pub use ranking::{RankingAggregator, RankingEntry, RankingPosition, RankingSnapshot};
pub use submission::validate_submission_url;
pub use xp_ledger::{LevelUp, XpAward, XpLedger};

use std::sync::Arc;

use tracing::warn;

use crate::domain::{CallerContext, CharacterId, LevelId, Notification, UserId};
use crate::notify::NotificationEmitter;
use crate::store::ProgressionStore;
use locks::{KeyedLocks, PairKey};

/// Default share of a level's missions needed to unlock its boss
pub const DEFAULT_UNLOCK_THRESHOLD_PERCENT: f64 = 80.0;

/// Tunables of the engine
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressionSettings {
    /// Mission completion (percent) at which a boss leaves LOCKED
    pub unlock_threshold_percent: f64,
}

impl Default for ProgressionSettings {
    fn default() -> Self {
        Self {
            unlock_threshold_percent: DEFAULT_UNLOCK_THRESHOLD_PERCENT,
        }
    }
}

/// The progression engine over a store `S`
pub struct Progression<S> {
    store: S,
    notifier: Arc<dyn NotificationEmitter>,
    settings: ProgressionSettings,
    pair_locks: KeyedLocks<PairKey>,
    character_locks: KeyedLocks<CharacterId>,
    ranking: RankingAggregator,
}

impl<S: ProgressionStore> Progression<S> {
    pub fn new(store: S, notifier: Arc<dyn NotificationEmitter>) -> Self {
        Self {
            store,
            notifier,
            settings: ProgressionSettings::default(),
            pair_locks: KeyedLocks::new(),
            character_locks: KeyedLocks::new(),
            ranking: RankingAggregator::new(),
        }
    }

    pub fn with_settings(mut self, settings: ProgressionSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn settings(&self) -> &ProgressionSettings {
        &self.settings
    }

    pub fn calculator(&self) -> ProgressCalculator<'_> {
        ProgressCalculator::new(&self.store)
    }

    pub fn missions(&self) -> MissionLifecycle<'_, S> {
        MissionLifecycle::new(self)
    }

    pub fn bosses(&self) -> BossLifecycle<'_, S> {
        BossLifecycle::new(self)
    }

    pub fn xp(&self) -> XpLedger<'_, S> {
        XpLedger::new(self)
    }

    pub fn badges(&self) -> BadgeAwarder<'_> {
        BadgeAwarder::new(&self.store)
    }

    pub fn catalog(&self) -> Catalog<'_, S> {
        Catalog::new(&self.store)
    }

    pub fn ranking(&self) -> &RankingAggregator {
        &self.ranking
    }

    /// Rebuild the ranking from current character state and publish it
    pub fn refresh_ranking(&self) -> Result<Arc<RankingSnapshot>> {
        self.ranking.refresh(&self.store)
    }

    /// Cached ranking restricted to characters at or above the level
    pub fn level_ranking(&self, level_id: LevelId) -> Result<Vec<RankingEntry>> {
        let level = self
            .store
            .level(level_id)?
            .ok_or_else(|| ProgressionError::not_found(format!("Level {level_id} not found")))?;
        Ok(self.ranking.snapshot().for_level(level.order))
    }

    /// The caller's character, levels and boss states
    pub fn overview(&self, caller: &CallerContext) -> Result<ProgressOverview> {
        let user_id = caller.require_user()?;
        ProgressOverview::for_user(&self.store, user_id)
    }

    fn character_id_for(&self, user_id: UserId) -> Result<CharacterId> {
        self.store
            .character_for_user(user_id)?
            .map(|c| c.id)
            .ok_or_else(|| {
                ProgressionError::not_found(format!("No character found for user {user_id}"))
            })
    }

    /// Hold the character lock when XP is about to change
    fn with_character_lock<T>(
        &self,
        character_id: Option<CharacterId>,
        work: impl FnOnce() -> T,
    ) -> T {
        match character_id {
            Some(id) => self.character_locks.with_lock(id, work),
            None => work(),
        }
    }

    fn emit_all(&self, notifications: impl IntoIterator<Item = Notification>) {
        for notification in notifications {
            if let Err(e) = self.notifier.emit(&notification) {
                warn!(
                    user_id = notification.user_id,
                    kind = %notification.kind,
                    "Failed to emit notification: {}",
                    e
                );
            }
        }
    }
}
