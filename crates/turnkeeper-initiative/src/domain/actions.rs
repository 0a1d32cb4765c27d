//! Authorized transitions: `(state, action, actor) -> Result<Transition>`.
//!
//! Authorization runs before any transition so a rejected action never
//! produces a partial state.

use serde::Serialize;
use turnkeeper_core::error::DomainError;

use super::events::TurnEvent;
use super::participant::Participant;
use super::state::InitiativeState;

/// The user attempting an action, with GM status already resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Actor {
    /// Chat-platform user id.
    pub user_id: String,
    /// Whether the user is a GM of the session.
    pub is_gm: bool,
}

/// Something a user can do to a running initiative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnAction {
    /// Start round-robin initiative.
    Start,
    /// End the current round-robin turn.
    Advance,
    /// Popcorn opening pick.
    FirstPick {
        /// Who acts first.
        participant_id: String,
    },
    /// Popcorn nomination of the next actor.
    Nominate {
        /// Who acts next.
        nominee_id: String,
    },
    /// Add a participant to the roster.
    AddParticipant(Participant),
    /// Remove a participant from the roster.
    RemoveParticipant {
        /// Who leaves.
        participant_id: String,
    },
}

impl TurnAction {
    /// Human-readable verb phrase for denial messages.
    #[must_use]
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Start => "start initiative",
            Self::Advance => "end the turn",
            Self::FirstPick { .. } => "pick who goes first",
            Self::Nominate { .. } => "pick who goes next",
            Self::AddParticipant(_) => "add participants",
            Self::RemoveParticipant { .. } => "remove participants",
        }
    }
}

/// Outcome of an accepted action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// The successor state.
    pub state: InitiativeState,
    /// What happened.
    pub events: Vec<TurnEvent>,
}

/// Returns whether `actor` may act for whoever holds the turn: any GM, or
/// the owner of the current participant.
#[must_use]
pub fn may_act_for_current(state: &InitiativeState, actor: &Actor) -> bool {
    actor.is_gm
        || state
            .current_participant()
            .is_some_and(|p| p.is_owned_by(&actor.user_id))
}

fn authorize(state: &InitiativeState, action: &TurnAction, actor: &Actor) -> Result<(), DomainError> {
    let allowed = match action {
        TurnAction::Advance | TurnAction::Nominate { .. } => may_act_for_current(state, actor),
        TurnAction::Start
        | TurnAction::FirstPick { .. }
        | TurnAction::AddParticipant(_)
        | TurnAction::RemoveParticipant { .. } => actor.is_gm,
    };
    if allowed {
        Ok(())
    } else {
        Err(DomainError::not_authorized(&actor.user_id, action.describe()))
    }
}

fn wrong_kind(action: &TurnAction, state: &InitiativeState) -> DomainError {
    DomainError::Validation(format!(
        "cannot {} in {} initiative",
        action.describe(),
        state.kind().as_str()
    ))
}

/// Applies `action` on behalf of `actor`.
///
/// # Errors
///
/// Returns `DomainError::Validation` when the action does not fit the
/// initiative kind, `DomainError::NotAuthorized` when the actor may not
/// perform it, and whatever the underlying transition rejects.
pub fn apply(
    state: &InitiativeState,
    action: &TurnAction,
    actor: &Actor,
) -> Result<Transition, DomainError> {
    match (state, action) {
        (InitiativeState::Popcorn(_), TurnAction::Start | TurnAction::Advance)
        | (
            InitiativeState::RoundRobin(_),
            TurnAction::FirstPick { .. } | TurnAction::Nominate { .. },
        ) => return Err(wrong_kind(action, state)),
        _ => {}
    }
    authorize(state, action, actor)?;

    let (state, events) = match (state, action) {
        (InitiativeState::RoundRobin(rr), TurnAction::Start) => {
            let (next, events) = rr.start()?;
            (InitiativeState::RoundRobin(next), events)
        }
        (InitiativeState::RoundRobin(rr), TurnAction::Advance) => {
            let (next, events) = rr.advance()?;
            (InitiativeState::RoundRobin(next), events)
        }
        (InitiativeState::RoundRobin(rr), TurnAction::AddParticipant(p)) => {
            let (next, events) = rr.add(p.clone())?;
            (InitiativeState::RoundRobin(next), events)
        }
        (InitiativeState::RoundRobin(rr), TurnAction::RemoveParticipant { participant_id }) => {
            let (next, events) = rr.remove(participant_id)?;
            (InitiativeState::RoundRobin(next), events)
        }
        (InitiativeState::Popcorn(pc), TurnAction::FirstPick { participant_id }) => {
            let (next, events) = pc.first_pick(participant_id)?;
            (InitiativeState::Popcorn(next), events)
        }
        (InitiativeState::Popcorn(pc), TurnAction::Nominate { nominee_id }) => {
            let (next, events) = pc.advance(nominee_id)?;
            (InitiativeState::Popcorn(next), events)
        }
        (InitiativeState::Popcorn(pc), TurnAction::AddParticipant(p)) => {
            let (next, events) = pc.add(p.clone())?;
            (InitiativeState::Popcorn(next), events)
        }
        (InitiativeState::Popcorn(pc), TurnAction::RemoveParticipant { participant_id }) => {
            let (next, events) = pc.remove(participant_id)?;
            (InitiativeState::Popcorn(next), events)
        }
        _ => return Err(wrong_kind(action, state)),
    };
    Ok(Transition { state, events })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::state::InitiativeKind;

    fn gm() -> Actor {
        Actor {
            user_id: "u-gm".to_owned(),
            is_gm: true,
        }
    }

    fn player(user_id: &str) -> Actor {
        Actor {
            user_id: user_id.to_owned(),
            is_gm: false,
        }
    }

    fn state(kind: InitiativeKind) -> InitiativeState {
        InitiativeState::new(
            kind,
            vec![
                Participant::new("a", "A", Some("u-a")),
                Participant::new("b", "B", Some("u-b")),
                Participant::new("c", "C", None),
            ],
        )
    }

    fn started_round_robin() -> InitiativeState {
        apply(&state(InitiativeKind::RoundRobin), &TurnAction::Start, &gm())
            .unwrap()
            .state
    }

    #[test]
    fn test_scenario_c_unauthorized_advance_leaves_state_identical() {
        let before = started_round_robin();
        let snapshot = before.clone();

        let result = apply(&before, &TurnAction::Advance, &player("u-b"));

        match result.unwrap_err() {
            DomainError::NotAuthorized { user_id, action } => {
                assert_eq!(user_id, "u-b");
                assert_eq!(action, "end the turn");
            }
            other => panic!("expected NotAuthorized, got {other:?}"),
        }
        assert_eq!(before, snapshot);
    }

    #[test]
    fn test_current_owner_may_end_own_turn() {
        let before = started_round_robin();

        let transition = apply(&before, &TurnAction::Advance, &player("u-a")).unwrap();

        assert_eq!(transition.state.current_id(), Some("b"));
    }

    #[test]
    fn test_only_gm_may_act_for_unowned_npc() {
        let on_c = apply(
            &apply(&started_round_robin(), &TurnAction::Advance, &gm())
                .unwrap()
                .state,
            &TurnAction::Advance,
            &gm(),
        )
        .unwrap()
        .state;
        assert_eq!(on_c.current_id(), Some("c"));

        assert!(apply(&on_c, &TurnAction::Advance, &player("u-a")).is_err());
        assert!(apply(&on_c, &TurnAction::Advance, &gm()).is_ok());
    }

    #[test]
    fn test_start_requires_gm() {
        let result = apply(
            &state(InitiativeKind::RoundRobin),
            &TurnAction::Start,
            &player("u-a"),
        );

        assert!(matches!(
            result.unwrap_err(),
            DomainError::NotAuthorized { .. }
        ));
    }

    #[test]
    fn test_nomination_is_made_by_current_actor_not_nominee() {
        let picked = apply(
            &state(InitiativeKind::Popcorn),
            &TurnAction::FirstPick {
                participant_id: "a".to_owned(),
            },
            &gm(),
        )
        .unwrap()
        .state;
        let nominate_b = TurnAction::Nominate {
            nominee_id: "b".to_owned(),
        };

        assert!(apply(&picked, &nominate_b, &player("u-b")).is_err());
        let transition = apply(&picked, &nominate_b, &player("u-a")).unwrap();
        assert_eq!(transition.state.current_id(), Some("b"));
    }

    #[test]
    fn test_round_robin_action_on_popcorn_is_rejected_before_authorization() {
        let result = apply(
            &state(InitiativeKind::Popcorn),
            &TurnAction::Advance,
            &player("u-nobody"),
        );

        match result.unwrap_err() {
            DomainError::Validation(msg) => {
                assert_eq!(msg, "cannot end the turn in popcorn initiative");
            }
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn test_roster_changes_require_gm() {
        let add = TurnAction::AddParticipant(Participant::new("d", "D", Some("u-a")));

        assert!(apply(&state(InitiativeKind::Popcorn), &add, &player("u-a")).is_err());
        let transition = apply(&state(InitiativeKind::Popcorn), &add, &gm()).unwrap();
        assert_eq!(transition.state.participants().len(), 4);
    }
}
