//! Test repositories — mock `StateRepository` implementations for tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use turnkeeper_core::error::DomainError;
use turnkeeper_core::key::ChannelKey;
use turnkeeper_core::repository::{StateRepository, StoredRecord};

use crate::clock::fixed_now;

/// A state repository held in memory with real optimistic-concurrency
/// semantics. Records every successful `save` call so tests can assert on
/// writes (or their absence after a rejected transition).
#[derive(Debug, Default)]
pub struct InMemoryStateRepository {
    records: Mutex<HashMap<ChannelKey, StoredRecord>>,
    saves: Mutex<Vec<(ChannelKey, i64, serde_json::Value)>>,
}

impl InMemoryStateRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record at an arbitrary version without counting it as a save.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn with_record(self, key: &ChannelKey, payload: serde_json::Value, version: i64) -> Self {
        self.records.lock().unwrap().insert(
            key.clone(),
            StoredRecord {
                key: key.clone(),
                payload,
                version,
                updated_at: fixed_now(),
            },
        );
        self
    }

    /// Returns a snapshot of all successful saves as
    /// `(key, expected_version, payload)`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn saves(&self) -> Vec<(ChannelKey, i64, serde_json::Value)> {
        self.saves.lock().unwrap().clone()
    }

    /// Returns the record currently stored for `key`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn current(&self, key: &ChannelKey) -> Option<StoredRecord> {
        self.records.lock().unwrap().get(key).cloned()
    }
}

#[async_trait]
impl StateRepository for InMemoryStateRepository {
    async fn load(&self, key: &ChannelKey) -> Result<Option<StoredRecord>, DomainError> {
        Ok(self.records.lock().unwrap().get(key).cloned())
    }

    async fn save(
        &self,
        key: &ChannelKey,
        expected_version: i64,
        payload: serde_json::Value,
    ) -> Result<i64, DomainError> {
        let mut records = self.records.lock().unwrap();
        let actual = records.get(key).map_or(0, |r| r.version);
        if actual != expected_version {
            return Err(DomainError::ConcurrencyConflict {
                key: key.clone(),
                expected: expected_version,
                actual,
            });
        }
        let version = actual + 1;
        records.insert(
            key.clone(),
            StoredRecord {
                key: key.clone(),
                payload: payload.clone(),
                version,
                updated_at: fixed_now(),
            },
        );
        self.saves
            .lock()
            .unwrap()
            .push((key.clone(), expected_version, payload));
        Ok(version)
    }

    async fn delete(&self, key: &ChannelKey) -> Result<bool, DomainError> {
        Ok(self.records.lock().unwrap().remove(key).is_some())
    }
}

/// A state repository that always returns an infrastructure error. Useful for
/// testing error-handling paths.
#[derive(Debug)]
pub struct FailingStateRepository;

#[async_trait]
impl StateRepository for FailingStateRepository {
    async fn load(&self, _key: &ChannelKey) -> Result<Option<StoredRecord>, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn save(
        &self,
        _key: &ChannelKey,
        _expected_version: i64,
        _payload: serde_json::Value,
    ) -> Result<i64, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn delete(&self, _key: &ChannelKey) -> Result<bool, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }
}
