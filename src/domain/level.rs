use serde::{Deserialize, Serialize};

use super::LevelId;

/// Difficulty tier of a level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[serde(alias = "easy")]
    Beginner,
    #[serde(alias = "medium")]
    Intermediate,
    #[serde(alias = "hard")]
    Advanced,
    Expert,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
            Difficulty::Expert => "expert",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "beginner" | "easy" => Some(Difficulty::Beginner),
            "intermediate" | "medium" => Some(Difficulty::Intermediate),
            "advanced" | "hard" => Some(Difficulty::Advanced),
            "expert" => Some(Difficulty::Expert),
            _ => None,
        }
    }
}

/// A tier of the learning path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Level {
    pub id: LevelId,
    /// Position in the path, starting at 1
    pub order: u32,
    /// XP a character needs to reach this level
    pub xp_threshold: i64,
    pub difficulty: Difficulty,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Level definition before it is stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLevel {
    pub order: u32,
    pub xp_threshold: i64,
    pub difficulty: Difficulty,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl NewLevel {
    pub fn new(order: u32, xp_threshold: i64, name: impl Into<String>) -> Self {
        Self {
            order,
            xp_threshold,
            difficulty: Difficulty::Beginner,
            name: name.into(),
            description: None,
        }
    }

    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}
