//! `PostgreSQL` implementation of the `ParticipantDirectory` trait.

use async_trait::async_trait;
use sqlx::PgPool;

use turnkeeper_core::directory::{DirectoryEntry, ParticipantDirectory};
use turnkeeper_core::error::DomainError;

use crate::infrastructure;

/// Character and NPC lookups against the `session_participants` table.
#[derive(Debug, Clone)]
pub struct PgParticipantDirectory {
    pool: PgPool,
}

impl PgParticipantDirectory {
    /// Creates a new `PgParticipantDirectory`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ParticipantDirectory for PgParticipantDirectory {
    async fn lookup(
        &self,
        session_id: &str,
        participant_id: &str,
    ) -> Result<Option<DirectoryEntry>, DomainError> {
        let row: Option<(String, String, Option<String>)> = sqlx::query_as(
            "SELECT participant_id, name, owner_id FROM session_participants \
             WHERE session_id = $1 AND participant_id = $2",
        )
        .bind(session_id)
        .bind(participant_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| infrastructure(&e))?;

        Ok(row.map(|(id, name, owner_id)| DirectoryEntry { id, name, owner_id }))
    }
}
