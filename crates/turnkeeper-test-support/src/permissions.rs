//! Test permission oracles.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use turnkeeper_core::error::DomainError;
use turnkeeper_core::permissions::PermissionOracle;

/// A permission oracle backed by a fixed session → GM ids table. Counts
/// `is_gm` lookups so tests can assert on round trips.
#[derive(Debug, Default, Clone)]
pub struct StaticPermissionOracle {
    gms: HashMap<String, BTreeSet<String>>,
    gm_checks: Arc<AtomicUsize>,
}

impl StaticPermissionOracle {
    /// Create an oracle with no GMs anywhere.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `user_id` as a GM of `session_id`.
    #[must_use]
    pub fn with_gm(mut self, session_id: &str, user_id: &str) -> Self {
        self.gms
            .entry(session_id.to_owned())
            .or_default()
            .insert(user_id.to_owned());
        self
    }

    /// Returns how many `is_gm` lookups have been made.
    #[must_use]
    pub fn gm_checks(&self) -> usize {
        self.gm_checks.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PermissionOracle for StaticPermissionOracle {
    async fn is_gm(&self, session_id: &str, user_id: &str) -> Result<bool, DomainError> {
        self.gm_checks.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .gms
            .get(session_id)
            .is_some_and(|ids| ids.contains(user_id)))
    }

    async fn list_gm_ids(&self, session_id: &str) -> Result<BTreeSet<String>, DomainError> {
        Ok(self.gms.get(session_id).cloned().unwrap_or_default())
    }
}

/// A permission oracle that always returns an infrastructure error.
#[derive(Debug)]
pub struct FailingPermissionOracle;

#[async_trait]
impl PermissionOracle for FailingPermissionOracle {
    async fn is_gm(&self, _session_id: &str, _user_id: &str) -> Result<bool, DomainError> {
        Err(DomainError::Infrastructure("permission lookup failed".into()))
    }

    async fn list_gm_ids(&self, _session_id: &str) -> Result<BTreeSet<String>, DomainError> {
        Err(DomainError::Infrastructure("permission lookup failed".into()))
    }
}
