//! Initiative state and its storage record.

use serde::{Deserialize, Serialize};
use tracing::warn;
use turnkeeper_core::error::DomainError;
use uuid::Uuid;

use super::participant::Participant;

/// Label used when a stored id no longer resolves to a participant.
pub const UNKNOWN_PARTICIPANT: &str = "Unknown participant";

/// Which initiative scheme a channel runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitiativeKind {
    /// Fixed order, cycling through every participant each round.
    RoundRobin,
    /// The acting participant nominates who goes next.
    Popcorn,
}

impl InitiativeKind {
    /// Returns the storage tag for this kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RoundRobin => "round_robin",
            Self::Popcorn => "popcorn",
        }
    }
}

fn first_round() -> u32 {
    1
}

/// Persisted shape shared by both initiative kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitiativeRecord {
    /// Discriminates the two schemes.
    pub kind: InitiativeKind,
    /// Roster in insertion order.
    #[serde(default)]
    pub participants: Vec<Participant>,
    /// Current round, starting at 1.
    #[serde(default = "first_round")]
    pub round_number: u32,
    /// Whether the scheme's start gate has been passed.
    #[serde(default)]
    pub is_started: bool,
    /// Id of the participant whose turn it is.
    #[serde(default)]
    pub current: Option<String>,
    /// Round-robin position; `None` before start and for popcorn.
    #[serde(default)]
    pub current_index: Option<usize>,
    /// Popcorn ids that have not acted this round.
    #[serde(default)]
    pub remaining_in_round: Vec<String>,
}

/// Round-robin initiative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundRobin {
    pub(crate) participants: Vec<Participant>,
    pub(crate) round_number: u32,
    pub(crate) is_started: bool,
    /// Only meaningful once started.
    pub(crate) current_index: usize,
}

/// Popcorn initiative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Popcorn {
    pub(crate) participants: Vec<Participant>,
    pub(crate) round_number: u32,
    pub(crate) is_started: bool,
    pub(crate) current: Option<String>,
    pub(crate) remaining_in_round: Vec<String>,
}

/// The per-channel turn-order state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitiativeState {
    /// Round-robin variant.
    RoundRobin(RoundRobin),
    /// Popcorn variant.
    Popcorn(Popcorn),
}

impl InitiativeState {
    /// Creates a fresh, not-yet-started state with the given roster.
    #[must_use]
    pub fn new(kind: InitiativeKind, participants: Vec<Participant>) -> Self {
        match kind {
            InitiativeKind::RoundRobin => Self::RoundRobin(RoundRobin::new(participants)),
            InitiativeKind::Popcorn => Self::Popcorn(Popcorn::new(participants)),
        }
    }

    /// Returns the scheme.
    #[must_use]
    pub fn kind(&self) -> InitiativeKind {
        match self {
            Self::RoundRobin(_) => InitiativeKind::RoundRobin,
            Self::Popcorn(_) => InitiativeKind::Popcorn,
        }
    }

    /// Returns the roster in insertion order.
    #[must_use]
    pub fn participants(&self) -> &[Participant] {
        match self {
            Self::RoundRobin(rr) => &rr.participants,
            Self::Popcorn(pc) => &pc.participants,
        }
    }

    /// Returns the current round.
    #[must_use]
    pub fn round_number(&self) -> u32 {
        match self {
            Self::RoundRobin(rr) => rr.round_number,
            Self::Popcorn(pc) => pc.round_number,
        }
    }

    /// Returns whether someone holds the turn: round-robin has been started,
    /// or popcorn has a current actor.
    #[must_use]
    pub fn has_turn_holder(&self) -> bool {
        match self {
            Self::RoundRobin(rr) => rr.is_started,
            Self::Popcorn(pc) => pc.current.is_some(),
        }
    }

    /// Returns the participant whose turn it is, if any.
    #[must_use]
    pub fn current_participant(&self) -> Option<&Participant> {
        match self {
            Self::RoundRobin(rr) => rr.current(),
            Self::Popcorn(pc) => pc.current.as_deref().and_then(|id| self.participant(id)),
        }
    }

    /// Returns the id of the participant whose turn it is, if any.
    #[must_use]
    pub fn current_id(&self) -> Option<&str> {
        match self {
            Self::RoundRobin(rr) => rr.current().map(|p| p.id.as_str()),
            Self::Popcorn(pc) => pc.current.as_deref(),
        }
    }

    /// Finds a participant by id.
    #[must_use]
    pub fn participant(&self, id: &str) -> Option<&Participant> {
        self.participants().iter().find(|p| p.id == id)
    }

    /// Returns the display name for `id`, or [`UNKNOWN_PARTICIPANT`] when the
    /// id is stale. Never fails.
    #[must_use]
    pub fn participant_name(&self, id: &str) -> String {
        if let Some(p) = self.participant(id) {
            p.name.clone()
        } else {
            warn!(participant_id = %id, "stale participant reference");
            UNKNOWN_PARTICIPANT.to_owned()
        }
    }

    /// Returns whether the current round has run out of actors.
    #[must_use]
    pub fn is_round_end(&self) -> bool {
        match self {
            Self::RoundRobin(rr) => rr.is_round_end(),
            Self::Popcorn(pc) => pc.is_round_end(),
        }
    }

    /// Decodes a storage record. Dangling ids are kept as-is; they degrade to
    /// placeholder labels when rendered.
    #[must_use]
    pub fn from_storage(record: InitiativeRecord) -> Self {
        match record.kind {
            InitiativeKind::RoundRobin => Self::RoundRobin(RoundRobin {
                participants: record.participants,
                round_number: record.round_number,
                is_started: record.is_started,
                current_index: record.current_index.unwrap_or(0),
            }),
            InitiativeKind::Popcorn => Self::Popcorn(Popcorn {
                participants: record.participants,
                round_number: record.round_number,
                is_started: record.is_started,
                current: record.current,
                remaining_in_round: record.remaining_in_round,
            }),
        }
    }

    /// Encodes the state as a storage record.
    #[must_use]
    pub fn to_storage(&self) -> InitiativeRecord {
        match self {
            Self::RoundRobin(rr) => InitiativeRecord {
                kind: InitiativeKind::RoundRobin,
                participants: rr.participants.clone(),
                round_number: rr.round_number,
                is_started: rr.is_started,
                current: rr.current().map(|p| p.id.clone()),
                current_index: rr.is_started.then_some(rr.current_index),
                remaining_in_round: Vec::new(),
            },
            Self::Popcorn(pc) => InitiativeRecord {
                kind: InitiativeKind::Popcorn,
                participants: pc.participants.clone(),
                round_number: pc.round_number,
                is_started: pc.is_started,
                current: pc.current.clone(),
                current_index: None,
                remaining_in_round: pc.remaining_in_round.clone(),
            },
        }
    }

    /// Decodes a JSON payload from the state store.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the payload is not a valid
    /// initiative record.
    pub fn from_payload(payload: &serde_json::Value) -> Result<Self, DomainError> {
        let record: InitiativeRecord = serde_json::from_value(payload.clone()).map_err(|e| {
            DomainError::Infrastructure(format!("initiative record deserialization failed: {e}"))
        })?;
        Ok(Self::from_storage(record))
    }

    /// Encodes the state as a JSON payload for the state store.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if serialization fails.
    pub fn to_payload(&self) -> Result<serde_json::Value, DomainError> {
        serde_json::to_value(self.to_storage()).map_err(|e| {
            DomainError::Infrastructure(format!("initiative record serialization failed: {e}"))
        })
    }
}

/// One run of initiative in a channel, from setup until it is cleared.
///
/// Store versions restart at 1 after a clear; the id does not repeat, so a
/// prompt from a cleared encounter never matches the next one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encounter {
    /// Assigned at setup.
    pub id: Uuid,
    /// The turn-order state.
    pub state: InitiativeState,
}

#[derive(Serialize, Deserialize)]
struct EncounterRecord {
    /// Nil for records written before encounters were stamped.
    #[serde(default)]
    encounter_id: Uuid,
    #[serde(flatten)]
    record: InitiativeRecord,
}

impl Encounter {
    /// Starts a new encounter around `state`.
    #[must_use]
    pub fn begin(state: InitiativeState) -> Self {
        Self {
            id: Uuid::new_v4(),
            state,
        }
    }

    /// Keeps this encounter's id for a successor state.
    #[must_use]
    pub fn with_state(&self, state: InitiativeState) -> Self {
        Self { id: self.id, state }
    }

    /// Decodes a JSON payload from the state store.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the payload is not a valid
    /// initiative record.
    pub fn from_payload(payload: &serde_json::Value) -> Result<Self, DomainError> {
        let stored: EncounterRecord = serde_json::from_value(payload.clone()).map_err(|e| {
            DomainError::Infrastructure(format!("initiative record deserialization failed: {e}"))
        })?;
        Ok(Self {
            id: stored.encounter_id,
            state: InitiativeState::from_storage(stored.record),
        })
    }

    /// Encodes the encounter as a JSON payload for the state store.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if serialization fails.
    pub fn to_payload(&self) -> Result<serde_json::Value, DomainError> {
        let stored = EncounterRecord {
            encounter_id: self.id,
            record: self.state.to_storage(),
        };
        serde_json::to_value(stored).map_err(|e| {
            DomainError::Infrastructure(format!("initiative record serialization failed: {e}"))
        })
    }
}
