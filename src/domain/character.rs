use serde::{Deserialize, Serialize};

use super::{CharacterId, UserId};

/// A user's avatar on the learning path.
///
/// `xp` and `level` are stored independently; the XP ledger re-derives
/// `level` from the level table after every XP change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub id: CharacterId,
    pub user_id: UserId,
    pub name: String,
    /// Order index of the current level
    pub level: u32,
    pub xp: i64,
}
