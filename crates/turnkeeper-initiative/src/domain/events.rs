//! Domain events for the Initiative context.
//!
//! Transitions report what happened as a list of events. They are not
//! persisted; the broadcaster reads them to pick the announcement and the
//! API echoes them back to the caller.

use serde::{Deserialize, Serialize};

/// Event type identifier for [`TurnEvent::InitiativeCreated`].
pub const INITIATIVE_CREATED_EVENT_TYPE: &str = "initiative.created";

/// Event type identifier for [`TurnEvent::InitiativeStarted`].
pub const INITIATIVE_STARTED_EVENT_TYPE: &str = "initiative.started";

/// Event type identifier for [`TurnEvent::FirstPicked`].
pub const FIRST_PICKED_EVENT_TYPE: &str = "initiative.first_picked";

/// Event type identifier for [`TurnEvent::TurnPassed`].
pub const TURN_PASSED_EVENT_TYPE: &str = "initiative.turn_passed";

/// Event type identifier for [`TurnEvent::RoundStarted`].
pub const ROUND_STARTED_EVENT_TYPE: &str = "initiative.round_started";

/// Event type identifier for [`TurnEvent::ParticipantAdded`].
pub const PARTICIPANT_ADDED_EVENT_TYPE: &str = "initiative.participant_added";

/// Event type identifier for [`TurnEvent::ParticipantRemoved`].
pub const PARTICIPANT_REMOVED_EVENT_TYPE: &str = "initiative.participant_removed";

/// Event type identifier for [`TurnEvent::PickReturnedToGm`].
pub const PICK_RETURNED_TO_GM_EVENT_TYPE: &str = "initiative.pick_returned_to_gm";

/// Something that happened during a transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnEvent {
    /// A GM set up initiative for the channel.
    InitiativeCreated,
    /// A GM started round-robin initiative.
    InitiativeStarted,
    /// A GM chose who acts first in popcorn initiative.
    FirstPicked {
        /// The chosen participant.
        participant_id: String,
    },
    /// The turn moved from one participant to another.
    TurnPassed {
        /// Who held the turn, if anyone.
        from: Option<String>,
        /// Who holds the turn now.
        to: String,
    },
    /// A new round began.
    RoundStarted {
        /// The round that just began.
        round_number: u32,
    },
    /// A participant joined the roster.
    ParticipantAdded {
        /// The new participant.
        participant_id: String,
    },
    /// A participant left the roster.
    ParticipantRemoved {
        /// The removed participant.
        participant_id: String,
    },
    /// The current popcorn actor was removed; the GM picks again.
    PickReturnedToGm,
}

impl TurnEvent {
    /// Returns the event type name.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::InitiativeCreated => INITIATIVE_CREATED_EVENT_TYPE,
            Self::InitiativeStarted => INITIATIVE_STARTED_EVENT_TYPE,
            Self::FirstPicked { .. } => FIRST_PICKED_EVENT_TYPE,
            Self::TurnPassed { .. } => TURN_PASSED_EVENT_TYPE,
            Self::RoundStarted { .. } => ROUND_STARTED_EVENT_TYPE,
            Self::ParticipantAdded { .. } => PARTICIPANT_ADDED_EVENT_TYPE,
            Self::ParticipantRemoved { .. } => PARTICIPANT_REMOVED_EVENT_TYPE,
            Self::PickReturnedToGm => PICK_RETURNED_TO_GM_EVENT_TYPE,
        }
    }
}

/// Returns the round number if `events` contains a round start.
#[must_use]
pub fn started_round(events: &[TurnEvent]) -> Option<u32> {
    events.iter().find_map(|event| match event {
        TurnEvent::RoundStarted { round_number } => Some(*round_number),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_passed_serializes_with_type_tag() {
        let event = TurnEvent::TurnPassed {
            from: Some("a".to_owned()),
            to: "b".to_owned(),
        };

        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(
            json,
            serde_json::json!({ "type": "turn_passed", "from": "a", "to": "b" })
        );
        assert_eq!(event.event_type(), "initiative.turn_passed");
    }

    #[test]
    fn test_started_round_finds_round_start_among_other_events() {
        let events = vec![
            TurnEvent::TurnPassed {
                from: Some("c".to_owned()),
                to: "a".to_owned(),
            },
            TurnEvent::RoundStarted { round_number: 3 },
        ];

        assert_eq!(started_round(&events), Some(3));
        assert_eq!(started_round(&events[..1]), None);
    }
}
