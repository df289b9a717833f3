//! Error taxonomy for the progression engine
//!
//! `NotFound` and `RuleViolation` are expected outcomes that carry a message
//! meant for the caller. `Unexpected` wraps everything else; it is logged once
//! with a correlation id and rendered to callers only as an opaque reference.

use uuid::Uuid;

/// Result alias used across the engine
pub type Result<T> = std::result::Result<T, ProgressionError>;

/// Coarse error category, mapped to status codes by the hosting boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    RuleViolation,
    Unauthorized,
    Forbidden,
    Unexpected,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::RuleViolation => "rule_violation",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::Unexpected => "unexpected",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProgressionError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    RuleViolation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("Unexpected error (reference {correlation_id}): {source}")]
    Unexpected {
        correlation_id: Uuid,
        #[source]
        source: anyhow::Error,
    },
}

impl ProgressionError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn rule(message: impl Into<String>) -> Self {
        Self::RuleViolation(message.into())
    }

    /// Wrap an unexpected failure, logging it with a fresh correlation id
    pub fn unexpected(source: impl Into<anyhow::Error>) -> Self {
        let source = source.into();
        let correlation_id = Uuid::new_v4();
        tracing::error!(%correlation_id, "Unexpected progression failure: {:#}", source);
        Self::Unexpected {
            correlation_id,
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::RuleViolation(_) => ErrorKind::RuleViolation,
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::Unexpected { .. } => ErrorKind::Unexpected,
        }
    }

    /// Correlation id of an unexpected failure
    pub fn correlation_id(&self) -> Option<Uuid> {
        match self {
            Self::Unexpected { correlation_id, .. } => Some(*correlation_id),
            _ => None,
        }
    }

    /// Message safe to hand to a caller.
    ///
    /// Unexpected failures only expose their reference unless `debug` is set.
    pub fn public_message(&self, debug: bool) -> String {
        match self {
            Self::Unexpected {
                correlation_id,
                source,
            } => {
                if debug {
                    format!("Unexpected error (reference {correlation_id}): {source:#}")
                } else {
                    format!("Unexpected error (reference {correlation_id})")
                }
            }
            other => other.to_string(),
        }
    }
}

impl From<rusqlite::Error> for ProgressionError {
    fn from(err: rusqlite::Error) -> Self {
        Self::unexpected(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expected_errors_keep_their_message() {
        let err = ProgressionError::rule("XP to add must be a positive number");
        assert_eq!(err.kind(), ErrorKind::RuleViolation);
        assert_eq!(err.public_message(false), "XP to add must be a positive number");
        assert!(err.correlation_id().is_none());
    }

    #[test]
    fn test_unexpected_hides_details_unless_debug() {
        let err = ProgressionError::unexpected(anyhow::anyhow!("disk on fire"));
        let id = err.correlation_id().unwrap();

        let public = err.public_message(false);
        assert!(public.contains(&id.to_string()));
        assert!(!public.contains("disk on fire"));

        assert!(err.public_message(true).contains("disk on fire"));
        assert_eq!(err.kind().as_str(), "unexpected");
    }
}
