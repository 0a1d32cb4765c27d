//! Participant directory port.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// What the character/entity store knows about a participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    /// Entity identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Controlling user, `None` for ungoverned NPCs.
    pub owner_id: Option<String>,
}

/// Resolves participant ids against the external entity store.
#[async_trait]
pub trait ParticipantDirectory: Send + Sync {
    /// Look up a participant.
    ///
    /// Entities can be deleted while an encounter is running, so a missing
    /// id is `Ok(None)`; only infrastructure failures are errors.
    async fn lookup(
        &self,
        session_id: &str,
        participant_id: &str,
    ) -> Result<Option<DirectoryEntry>, DomainError>;
}
