//! Composite storage key for per-channel state.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies one channel inside one session (guild).
///
/// Each key owns at most one initiative record; keys in different channels
/// are fully independent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChannelKey {
    /// The session (guild/server) identifier.
    pub session_id: String,
    /// The channel identifier within the session.
    pub channel_id: String,
}

impl ChannelKey {
    /// Creates a new key.
    #[must_use]
    pub fn new(session_id: impl Into<String>, channel_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            channel_id: channel_id.into(),
        }
    }
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.session_id, self.channel_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_joins_session_and_channel() {
        let key = ChannelKey::new("guild-1", "chan-9");

        assert_eq!(key.to_string(), "guild-1/chan-9");
    }

    #[test]
    fn test_keys_with_same_channel_in_different_sessions_differ() {
        let a = ChannelKey::new("guild-1", "chan-9");
        let b = ChannelKey::new("guild-2", "chan-9");

        assert_ne!(a, b);
    }
}
