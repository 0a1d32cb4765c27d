//! `PostgreSQL` implementation of the `StateRepository` trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::debug;

use turnkeeper_core::error::DomainError;
use turnkeeper_core::key::ChannelKey;
use turnkeeper_core::repository::{StateRepository, StoredRecord};

use crate::infrastructure;

/// PostgreSQL-backed initiative state repository.
///
/// One row per channel. The `version` column carries the optimistic
/// concurrency check: inserts only succeed for new channels and updates
/// only succeed against the version the caller read.
#[derive(Debug, Clone)]
pub struct PgStateRepository {
    pool: PgPool,
}

impl PgStateRepository {
    /// Creates a new `PgStateRepository`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn current_version(&self, key: &ChannelKey) -> Result<i64, DomainError> {
        let version: Option<i64> = sqlx::query_scalar(
            "SELECT version FROM initiative_states WHERE session_id = $1 AND channel_id = $2",
        )
        .bind(&key.session_id)
        .bind(&key.channel_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| infrastructure(&e))?;
        Ok(version.unwrap_or(0))
    }

    async fn conflict(&self, key: &ChannelKey, expected: i64) -> DomainError {
        match self.current_version(key).await {
            Ok(actual) => DomainError::ConcurrencyConflict {
                key: key.clone(),
                expected,
                actual,
            },
            Err(e) => e,
        }
    }
}

#[async_trait]
impl StateRepository for PgStateRepository {
    async fn load(&self, key: &ChannelKey) -> Result<Option<StoredRecord>, DomainError> {
        let row: Option<(serde_json::Value, i64, DateTime<Utc>)> = sqlx::query_as(
            "SELECT payload, version, updated_at FROM initiative_states \
             WHERE session_id = $1 AND channel_id = $2",
        )
        .bind(&key.session_id)
        .bind(&key.channel_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| infrastructure(&e))?;

        Ok(row.map(|(payload, version, updated_at)| StoredRecord {
            key: key.clone(),
            payload,
            version,
            updated_at,
        }))
    }

    async fn save(
        &self,
        key: &ChannelKey,
        expected_version: i64,
        payload: serde_json::Value,
    ) -> Result<i64, DomainError> {
        let result = if expected_version == 0 {
            sqlx::query(
                "INSERT INTO initiative_states (session_id, channel_id, payload, version, updated_at) \
                 VALUES ($1, $2, $3, 1, NOW()) \
                 ON CONFLICT (session_id, channel_id) DO NOTHING",
            )
            .bind(&key.session_id)
            .bind(&key.channel_id)
            .bind(&payload)
            .execute(&self.pool)
            .await
        } else {
            sqlx::query(
                "UPDATE initiative_states \
                 SET payload = $3, version = version + 1, updated_at = NOW() \
                 WHERE session_id = $1 AND channel_id = $2 AND version = $4",
            )
            .bind(&key.session_id)
            .bind(&key.channel_id)
            .bind(&payload)
            .bind(expected_version)
            .execute(&self.pool)
            .await
        }
        .map_err(|e| infrastructure(&e))?;

        if result.rows_affected() == 0 {
            return Err(self.conflict(key, expected_version).await);
        }
        let version = expected_version + 1;
        debug!(%key, version, "saved initiative state");
        Ok(version)
    }

    async fn delete(&self, key: &ChannelKey) -> Result<bool, DomainError> {
        let result =
            sqlx::query("DELETE FROM initiative_states WHERE session_id = $1 AND channel_id = $2")
                .bind(&key.session_id)
                .bind(&key.channel_id)
                .execute(&self.pool)
                .await
                .map_err(|e| infrastructure(&e))?;
        Ok(result.rows_affected() > 0)
    }
}
