//! Questline - progression engine for gamified learning paths
//!
//! Students move through ordered levels by completing missions. Once enough
//! of a level's missions are done its boss unlocks; defeating the boss
//! awards XP, a badge and the next level's grimoire. Character levels are
//! always re-derived from XP.
//!
//! ## Layout
//!
//! - [`domain`]: levels, missions, bosses, attempts and their state machines
//! - [`progression`]: the engine (lifecycles, XP ledger, badges, ranking)
//! - [`store`]: the persistence trait and its SQLite implementation
//! - [`notify`]: notification emitters and the deferred retry buffer
//! - [`config`]: `~/.questline/config.toml`

pub mod config;
pub mod domain;
pub mod notify;
pub mod progression;
pub mod store;

pub use domain::*;
