//! Participant record.

use serde::{Deserialize, Serialize};
use turnkeeper_core::directory::DirectoryEntry;

/// One entry in the turn order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Entity identifier; the participant's identity.
    pub id: String,
    /// Display name captured when the participant joined.
    pub name: String,
    /// Controlling user. `None` means only GMs act for this participant.
    pub owner_id: Option<String>,
}

impl Participant {
    /// Creates a participant.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, owner_id: Option<&str>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            owner_id: owner_id.map(str::to_owned),
        }
    }

    /// Returns whether `user_id` controls this participant.
    #[must_use]
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.owner_id.as_deref() == Some(user_id)
    }
}

impl From<DirectoryEntry> for Participant {
    fn from(entry: DirectoryEntry) -> Self {
        Self {
            id: entry.id,
            name: entry.name,
            owner_id: entry.owner_id,
        }
    }
}
