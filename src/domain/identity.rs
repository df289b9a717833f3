use serde::{Deserialize, Serialize};

use super::UserId;
use crate::progression::{ProgressionError, Result};

/// Role of the caller, as asserted by the authentication layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Mentor,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Mentor => "mentor",
            Role::Admin => "admin",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "student" => Some(Role::Student),
            "mentor" => Some(Role::Mentor),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    pub fn can_evaluate(&self) -> bool {
        matches!(self, Role::Mentor | Role::Admin)
    }
}

/// Identity of whoever is calling into the engine.
///
/// Passed explicitly into every operation that needs to know who is acting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerContext {
    user_id: Option<UserId>,
    role: Role,
}

impl CallerContext {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self {
            user_id: Some(user_id),
            role,
        }
    }

    pub fn student(user_id: UserId) -> Self {
        Self::new(user_id, Role::Student)
    }

    pub fn mentor(user_id: UserId) -> Self {
        Self::new(user_id, Role::Mentor)
    }

    /// No authenticated user
    pub fn anonymous() -> Self {
        Self {
            user_id: None,
            role: Role::Student,
        }
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// The authenticated user, or `Unauthorized`
    pub fn require_user(&self) -> Result<UserId> {
        self.user_id
            .ok_or_else(|| ProgressionError::Unauthorized("Authentication required".to_string()))
    }

    /// The authenticated user if they may evaluate submissions, `Forbidden` otherwise
    pub fn require_evaluator(&self) -> Result<UserId> {
        let user_id = self.require_user()?;
        if self.role.can_evaluate() {
            Ok(user_id)
        } else {
            Err(ProgressionError::Forbidden(
                "Only mentors and admins can evaluate submissions".to_string(),
            ))
        }
    }
}
