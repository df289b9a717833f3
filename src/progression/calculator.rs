//! Mission completion and XP progress percentages

use tracing::debug;

use super::level_table::LevelTable;
use super::percent;
use crate::domain::{LevelId, UserId};
use crate::progression::{ProgressionError, Result};
use crate::store::ProgressionStore;

/// Read-only progress arithmetic over a store view
pub struct ProgressCalculator<'a> {
    store: &'a dyn ProgressionStore,
}

impl<'a> ProgressCalculator<'a> {
    pub fn new(store: &'a dyn ProgressionStore) -> Self {
        Self { store }
    }

    /// Share of the level's missions the user has COMPLETED
    pub fn level_completion_percentage(&self, level_id: LevelId, user_id: UserId) -> Result<f64> {
        if self.store.level(level_id)?.is_none() {
            return Err(ProgressionError::not_found(format!(
                "Level {level_id} not found"
            )));
        }

        let total = self.store.count_missions(level_id)?;
        let completed = self.store.count_completed_missions(user_id, level_id)?;
        let pct = percent::percentage(completed, total)
            .ok_or_else(|| ProgressionError::rule(format!("Level {level_id} has no missions")))?;

        debug!(level_id, user_id, completed, total, "Level completion {pct}%");
        Ok(pct)
    }

    /// Progress from the current level's threshold toward the next one's, in [0, 100]
    pub fn xp_progress_to_next_level(&self, current_xp: i64, current_level_order: u32) -> Result<f64> {
        let table = LevelTable::load(self.store)?;
        xp_progress(&table, current_xp, current_level_order)
    }
}

/// Same as [`ProgressCalculator::xp_progress_to_next_level`] over an already loaded table
pub(crate) fn xp_progress(table: &LevelTable, current_xp: i64, current_level_order: u32) -> Result<f64> {
    let current = table.by_order(current_level_order).ok_or_else(|| {
        ProgressionError::not_found(format!("Level with order {current_level_order} not found"))
    })?;

    match table.next_after(current.order) {
        None => Ok(100.0),
        Some(next) => Ok(percent::span_progress(
            current_xp,
            current.xp_threshold,
            next.xp_threshold,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Difficulty, Level};

    fn table() -> LevelTable {
        LevelTable::from_levels(
            [(1, 0), (2, 100), (3, 200)]
                .into_iter()
                .map(|(order, xp_threshold)| Level {
                    id: order as i64,
                    order,
                    xp_threshold,
                    difficulty: Difficulty::Beginner,
                    name: format!("L{order}"),
                    description: None,
                })
                .collect(),
        )
    }

    #[test]
    fn test_progress_between_thresholds() {
        let table = table();
        assert_eq!(xp_progress(&table, 150, 2).unwrap(), 50.0);
        assert_eq!(xp_progress(&table, 90, 2).unwrap(), 0.0);
        assert_eq!(xp_progress(&table, 200, 3).unwrap(), 100.0);
    }

    #[test]
    fn test_unknown_level_order() {
        let err = xp_progress(&table(), 10, 9).unwrap_err();
        assert_eq!(err.kind(), crate::progression::ErrorKind::NotFound);
    }
}
