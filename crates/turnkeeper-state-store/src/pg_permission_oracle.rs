//! `PostgreSQL` implementation of the `PermissionOracle` trait.

use std::collections::BTreeSet;

use async_trait::async_trait;
use sqlx::PgPool;

use turnkeeper_core::error::DomainError;
use turnkeeper_core::permissions::PermissionOracle;

use crate::infrastructure;

/// GM lookups against the `session_gms` table.
#[derive(Debug, Clone)]
pub struct PgPermissionOracle {
    pool: PgPool,
}

impl PgPermissionOracle {
    /// Creates a new `PgPermissionOracle`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PermissionOracle for PgPermissionOracle {
    async fn is_gm(&self, session_id: &str, user_id: &str) -> Result<bool, DomainError> {
        sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM session_gms WHERE session_id = $1 AND user_id = $2)",
        )
        .bind(session_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| infrastructure(&e))
    }

    async fn list_gm_ids(&self, session_id: &str) -> Result<BTreeSet<String>, DomainError> {
        let ids: Vec<String> =
            sqlx::query_scalar("SELECT user_id FROM session_gms WHERE session_id = $1")
                .bind(session_id)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| infrastructure(&e))?;
        Ok(ids.into_iter().collect())
    }
}
