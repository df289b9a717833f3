//! Ordered level reference data

use serde::Serialize;

use crate::domain::{Level, LevelId};
use crate::progression::Result;
use crate::store::ProgressionStore;

/// Levels sorted by order index
#[derive(Debug, Clone, Default, Serialize)]
pub struct LevelTable {
    levels: Vec<Level>,
}

impl LevelTable {
    /// Read the current table from the store
    pub fn load(store: &dyn ProgressionStore) -> Result<Self> {
        Ok(Self::from_levels(store.list_levels()?))
    }

    pub fn from_levels(mut levels: Vec<Level>) -> Self {
        levels.sort_by_key(|l| l.order);
        Self { levels }
    }

    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn by_id(&self, id: LevelId) -> Option<&Level> {
        self.levels.iter().find(|l| l.id == id)
    }

    pub fn by_order(&self, order: u32) -> Option<&Level> {
        self.levels.iter().find(|l| l.order == order)
    }

    /// The level whose order is exactly `order + 1`
    pub fn next_after(&self, order: u32) -> Option<&Level> {
        self.by_order(order.checked_add(1)?)
    }

    /// Highest-order level whose threshold is at or below `xp`
    pub fn level_for_xp(&self, xp: i64) -> Option<&Level> {
        self.levels.iter().rev().find(|l| l.xp_threshold <= xp)
    }
}
