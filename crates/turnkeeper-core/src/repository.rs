//! State repository abstraction.

use async_trait::async_trait;

use crate::error::DomainError;
use crate::key::ChannelKey;

/// Stored representation of one channel's state record.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    /// The channel this record belongs to.
    pub key: ChannelKey,
    /// Serialized record payload.
    pub payload: serde_json::Value,
    /// Monotonically increasing write counter, starting at 1 on creation.
    pub version: i64,
    /// Timestamp of the last write.
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Repository trait for loading and saving per-channel state records.
///
/// Every interaction re-reads the record, transforms it and writes the
/// whole record back; the store is the only serialization point.
#[async_trait]
pub trait StateRepository: Send + Sync {
    /// Load the record for a channel, if any.
    async fn load(&self, key: &ChannelKey) -> Result<Option<StoredRecord>, DomainError>;

    /// Write a full record with optimistic concurrency.
    ///
    /// `expected_version` is the version last read; `0` means the record
    /// must not exist yet. Returns the new version, or
    /// `DomainError::ConcurrencyConflict` when another writer got there
    /// first.
    async fn save(
        &self,
        key: &ChannelKey,
        expected_version: i64,
        payload: serde_json::Value,
    ) -> Result<i64, DomainError>;

    /// Delete the record for a channel. Returns whether a record existed.
    async fn delete(&self, key: &ChannelKey) -> Result<bool, DomainError>;
}
