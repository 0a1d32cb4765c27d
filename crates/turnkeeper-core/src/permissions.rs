//! Permission oracle port.

use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::error::DomainError;

/// Answers "who may arbitrate this session".
///
/// Injected into handlers so the turn-order core never performs ambient
/// permission lookups.
#[async_trait]
pub trait PermissionOracle: Send + Sync {
    /// Returns whether `user_id` is a GM of `session_id`.
    async fn is_gm(&self, session_id: &str, user_id: &str) -> Result<bool, DomainError>;

    /// Returns every GM id of `session_id`.
    async fn list_gm_ids(&self, session_id: &str) -> Result<BTreeSet<String>, DomainError>;
}
