//! Test participant directory.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use turnkeeper_core::directory::{DirectoryEntry, ParticipantDirectory};
use turnkeeper_core::error::DomainError;

/// A participant directory held in memory. Entries can be removed mid-test to
/// simulate characters deleted out from under a running encounter.
#[derive(Debug, Default)]
pub struct InMemoryParticipantDirectory {
    entries: Mutex<HashMap<(String, String), DirectoryEntry>>,
}

impl InMemoryParticipantDirectory {
    /// Create an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry for `session_id`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn with_entry(
        self,
        session_id: &str,
        id: &str,
        name: &str,
        owner_id: Option<&str>,
    ) -> Self {
        self.entries.lock().unwrap().insert(
            (session_id.to_owned(), id.to_owned()),
            DirectoryEntry {
                id: id.to_owned(),
                name: name.to_owned(),
                owner_id: owner_id.map(str::to_owned),
            },
        );
        self
    }

    /// Remove an entry, as if the character had been deleted.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn remove(&self, session_id: &str, id: &str) {
        self.entries
            .lock()
            .unwrap()
            .remove(&(session_id.to_owned(), id.to_owned()));
    }
}

#[async_trait]
impl ParticipantDirectory for InMemoryParticipantDirectory {
    async fn lookup(
        &self,
        session_id: &str,
        participant_id: &str,
    ) -> Result<Option<DirectoryEntry>, DomainError> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .get(&(session_id.to_owned(), participant_id.to_owned()))
            .cloned())
    }
}
