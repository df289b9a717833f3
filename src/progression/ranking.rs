//! Global XP ranking
//!
//! The ranking is an immutable snapshot published behind an `RwLock<Arc<_>>`.
//! `refresh` builds a new snapshot off to the side and swaps it in, so
//! readers always see either the old or the new ordering in full.

use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use super::percent;
use super::{ProgressionError, Result};
use crate::domain::{Character, UserId};
use crate::store::ProgressionStore;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingEntry {
    /// 1-based
    pub position: usize,
    pub user_id: UserId,
    pub character_name: String,
    pub level: u32,
    pub xp: i64,
}

/// Where a user stands in the ranking
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RankingPosition {
    /// 1-based; 0 when nobody is ranked
    pub position: usize,
    pub total_players: usize,
    /// Share of players ranked below this one
    pub percentile: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RankingSnapshot {
    entries: Vec<RankingEntry>,
    refreshed_at: Option<DateTime<Utc>>,
}

impl RankingSnapshot {
    /// Order by XP descending, then character id ascending
    pub fn build(mut characters: Vec<Character>) -> Self {
        characters.sort_by(|a, b| b.xp.cmp(&a.xp).then(a.id.cmp(&b.id)));
        let entries = characters
            .into_iter()
            .enumerate()
            .map(|(i, c)| RankingEntry {
                position: i + 1,
                user_id: c.user_id,
                character_name: c.name,
                level: c.level,
                xp: c.xp,
            })
            .collect();
        Self {
            entries,
            refreshed_at: Some(Utc::now()),
        }
    }

    pub fn entries(&self) -> &[RankingEntry] {
        &self.entries
    }

    pub fn total_players(&self) -> usize {
        self.entries.len()
    }

    /// `None` if the snapshot was never refreshed
    pub fn refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.refreshed_at
    }

    pub fn top(&self, limit: usize) -> &[RankingEntry] {
        &self.entries[..limit.min(self.entries.len())]
    }

    /// Same ordering, restricted to characters at or above `level_order`, renumbered
    pub fn for_level(&self, level_order: u32) -> Vec<RankingEntry> {
        self.entries
            .iter()
            .filter(|e| e.level >= level_order)
            .enumerate()
            .map(|(i, e)| RankingEntry {
                position: i + 1,
                ..e.clone()
            })
            .collect()
    }

    pub fn position_of(&self, user_id: UserId) -> Result<RankingPosition> {
        let total = self.entries.len();
        if total == 0 {
            return Ok(RankingPosition {
                position: 0,
                total_players: 0,
                percentile: 0.0,
            });
        }

        let entry = self
            .entries
            .iter()
            .find(|e| e.user_id == user_id)
            .ok_or_else(|| ProgressionError::not_found(format!("User {user_id} is not ranked")))?;

        Ok(RankingPosition {
            position: entry.position,
            total_players: total,
            percentile: percent::percentile(entry.position, total),
        })
    }
}

/// Shared, atomically refreshed ranking cache
pub struct RankingAggregator {
    snapshot: RwLock<Arc<RankingSnapshot>>,
}

impl Default for RankingAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl RankingAggregator {
    pub fn new() -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(RankingSnapshot::default())),
        }
    }

    /// Current snapshot (empty until the first refresh)
    pub fn snapshot(&self) -> Arc<RankingSnapshot> {
        Arc::clone(&self.snapshot.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Recompute from character state and publish
    pub fn refresh(&self, store: &dyn ProgressionStore) -> Result<Arc<RankingSnapshot>> {
        let next = Arc::new(RankingSnapshot::build(store.list_characters()?));
        *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = Arc::clone(&next);
        info!(players = next.total_players(), "Ranking refreshed");
        Ok(next)
    }

    pub fn position_of(&self, user_id: UserId) -> Result<RankingPosition> {
        self.snapshot().position_of(user_id)
    }
}
