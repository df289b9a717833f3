//! XP awards and level recomputation

use serde::Serialize;
use tracing::info;

use super::level_table::LevelTable;
use super::{Progression, ProgressionError, Result};
use crate::domain::{Character, CharacterId, LevelId, Notification, NotificationKind};
use crate::store::ProgressionStore;

/// A character moved to a different level
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelUp {
    pub old_level: u32,
    pub new_level: u32,
    pub level_id: LevelId,
    pub level_name: String,
}

/// Result of adding XP to a character
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct XpAward {
    /// The character as persisted after the award
    pub character: Character,
    pub amount: i64,
    pub level_up: Option<LevelUp>,
}

impl XpAward {
    pub(crate) fn notification(&self) -> Option<Notification> {
        let up = self.level_up.as_ref()?;
        Some(
            Notification::new(
                self.character.user_id,
                NotificationKind::LevelUp,
                "Level up!",
                format!("You reached level {}: {}", up.new_level, up.level_name),
            )
            .with_reference(up.level_id),
        )
    }
}

/// Add `amount` XP to a character and re-derive its level, in the caller's unit of work
pub(crate) fn apply_xp(
    store: &dyn ProgressionStore,
    character_id: CharacterId,
    amount: Option<i64>,
) -> Result<XpAward> {
    let amount = match amount {
        Some(amount) if amount > 0 => amount,
        _ => return Err(ProgressionError::rule("XP to add must be a positive number")),
    };

    let mut character = store.character(character_id)?.ok_or_else(|| {
        ProgressionError::not_found(format!("Character {character_id} not found"))
    })?;

    let xp = character
        .xp
        .checked_add(amount)
        .ok_or_else(|| ProgressionError::rule("XP total is out of range"))?;

    let table = LevelTable::load(store)?;
    let old_level = character.level;
    let new_level = table.level_for_xp(xp);

    character.xp = xp;
    if let Some(level) = new_level {
        character.level = level.order;
    }
    store.save_character(&character)?;

    let level_up = new_level
        .filter(|level| level.order != old_level)
        .map(|level| LevelUp {
            old_level,
            new_level: level.order,
            level_id: level.id,
            level_name: level.name.clone(),
        });

    if let Some(up) = &level_up {
        info!(
            character_id,
            user_id = character.user_id,
            "Character level {} -> {} ({})",
            up.old_level,
            up.new_level,
            up.level_name
        );
    }

    Ok(XpAward {
        character,
        amount,
        level_up,
    })
}

/// Direct XP grants outside of mission/boss evaluation
pub struct XpLedger<'a, S> {
    engine: &'a Progression<S>,
}

impl<'a, S: ProgressionStore> XpLedger<'a, S> {
    pub(crate) fn new(engine: &'a Progression<S>) -> Self {
        Self { engine }
    }

    /// Add XP to a character; `None` or a non-positive amount is rejected
    pub fn add_xp(&self, character_id: CharacterId, amount: Option<i64>) -> Result<XpAward> {
        let engine = self.engine;
        let award = engine.character_locks.with_lock(character_id, || {
            engine
                .store
                .atomically(|tx| apply_xp(tx, character_id, amount))
        })?;

        info!(
            character_id,
            amount = award.amount,
            xp = award.character.xp,
            "Added XP"
        );
        engine.emit_all(award.notification());
        Ok(award)
    }
}
