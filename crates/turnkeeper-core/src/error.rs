//! Domain error types.

use thiserror::Error;

use crate::key::ChannelKey;

/// Top-level domain error type.
///
/// Every variant is a per-request outcome reported back to the initiating
/// user. None of them abort the process, and a rejected transition never
/// writes state.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The acting user is neither a GM nor the owner of the current
    /// participant.
    #[error("user {user_id} is not allowed to {action}")]
    NotAuthorized {
        /// The rejected user.
        user_id: String,
        /// What the user tried to do.
        action: &'static str,
    },

    /// A popcorn nomination outside the legal choice set.
    #[error("{nominee_id} cannot be picked now")]
    InvalidNominee {
        /// The rejected nominee.
        nominee_id: String,
        /// Participant ids that may be picked instead.
        legal: Vec<String>,
    },

    /// A turn transition was attempted with an empty roster.
    #[error("no participants in initiative")]
    NoParticipants,

    /// A turn transition was attempted before the GM started initiative.
    #[error("initiative has not started yet")]
    NotYetStarted,

    /// No initiative record exists for the channel.
    #[error("no initiative is running in {0}")]
    InitiativeNotFound(ChannelKey),

    /// A participant id did not resolve.
    #[error("participant not found: {0}")]
    ParticipantNotFound(String),

    /// Optimistic concurrency conflict on write.
    #[error("concurrency conflict on {key}: expected version {expected}, found {actual}")]
    ConcurrencyConflict {
        /// The channel that had the conflict.
        key: ChannelKey,
        /// The expected version.
        expected: i64,
        /// The actual version found.
        actual: i64,
    },

    /// The prompt was rendered from an older state than the stored one, or
    /// for an encounter that has since been cleared.
    #[error("prompt is out of date: rendered from version {prompt_version}, current is {current}")]
    StalePrompt {
        /// Version the prompt was rendered from.
        prompt_version: i64,
        /// Version currently stored.
        current: i64,
    },

    /// The prompt outlived its idle timeout.
    #[error("prompt has expired")]
    PromptExpired,

    /// A validation error in domain logic.
    #[error("validation error: {0}")]
    Validation(String),

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

impl DomainError {
    /// Shorthand for [`DomainError::NotAuthorized`].
    #[must_use]
    pub fn not_authorized(user_id: &str, action: &'static str) -> Self {
        Self::NotAuthorized {
            user_id: user_id.to_owned(),
            action,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_authorized_message_names_user_and_action() {
        let err = DomainError::not_authorized("u-42", "end the turn");

        assert_eq!(err.to_string(), "user u-42 is not allowed to end the turn");
    }

    #[test]
    fn test_concurrency_conflict_message_includes_versions() {
        let err = DomainError::ConcurrencyConflict {
            key: ChannelKey::new("g", "c"),
            expected: 3,
            actual: 4,
        };

        assert_eq!(
            err.to_string(),
            "concurrency conflict on g/c: expected version 3, found 4"
        );
    }
}
