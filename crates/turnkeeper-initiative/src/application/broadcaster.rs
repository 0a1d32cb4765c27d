//! Turn broadcaster.
//!
//! Rebuilt from scratch after every transition: given the new state, the
//! events that produced it and the session's GMs, it decides what to
//! announce, which choices to offer and who may answer.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use turnkeeper_core::clock::Clock;
use turnkeeper_core::error::DomainError;
use uuid::Uuid;

use crate::domain::commands::PromptTicket;
use crate::domain::events::{TurnEvent, started_round};
use crate::domain::state::{InitiativeKind, InitiativeState, UNKNOWN_PARTICIPANT};

/// What the channel is told after a transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Announcement {
    /// The roster is empty.
    NoParticipants,
    /// Round-robin not started, or popcorn without a current actor.
    AwaitingGm {
        /// Which scheme is waiting.
        kind: InitiativeKind,
    },
    /// The transition opened a new round.
    RoundStarted {
        /// The round that just began.
        round_number: u32,
        /// Who acts first in it.
        participant_name: String,
    },
    /// Whose turn it is.
    Turn {
        /// Which scheme is running.
        kind: InitiativeKind,
        /// Who acts.
        participant_name: String,
        /// The current round.
        round_number: u32,
        /// Whether everyone has acted this round.
        round_end: bool,
    },
}

impl fmt::Display for Announcement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoParticipants => write!(f, "No participants in initiative."),
            Self::AwaitingGm {
                kind: InitiativeKind::RoundRobin,
            } => write!(f, "GM: Press Start to begin initiative."),
            Self::AwaitingGm {
                kind: InitiativeKind::Popcorn,
            } => write!(f, "GM: Pick who goes first."),
            Self::RoundStarted {
                round_number,
                participant_name,
            } => write!(
                f,
                "**Round {round_number}!**\n🔔 It's now **{participant_name}**'s turn!"
            ),
            Self::Turn {
                kind: InitiativeKind::RoundRobin,
                participant_name,
                round_number,
                ..
            } => write!(
                f,
                "🔔 It's now **{participant_name}**'s turn! (Round {round_number})"
            ),
            Self::Turn {
                kind: InitiativeKind::Popcorn,
                participant_name,
                round_number,
                round_end,
            } => {
                write!(f, "🔔 It's now **{participant_name}**'s turn!")?;
                if *round_end {
                    write!(
                        f,
                        "\nEveryone has acted. Pick anyone to open round {}.",
                        round_number.saturating_add(1)
                    )?;
                }
                Ok(())
            }
        }
    }
}

/// The control offered with an announcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptKind {
    /// Round-robin start button (GM only).
    Start,
    /// Round-robin end-turn button.
    EndTurn,
    /// Popcorn opening pick (GM only).
    FirstPick,
    /// Popcorn "who goes next" selection.
    Nominate,
}

/// One selectable participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Choice {
    /// Value sent back when chosen.
    pub participant_id: String,
    /// Display label.
    pub label: String,
}

/// An interactive prompt. It stops being answerable at `expires_at`, as
/// soon as the state moves past `state_version`, or once its encounter is
/// cleared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prompt {
    /// Which control to render.
    pub kind: PromptKind,
    /// Selectable participants; empty for button prompts.
    pub choices: Vec<Choice>,
    /// The encounter this prompt was rendered for.
    pub encounter_id: Uuid,
    /// The state version this prompt was rendered from.
    pub state_version: i64,
    /// When the prompt was issued.
    pub issued_at: DateTime<Utc>,
    /// When the prompt stops being answerable.
    pub expires_at: DateTime<Utc>,
}

impl Prompt {
    /// Returns the ticket a caller presents when answering this prompt.
    #[must_use]
    pub fn ticket(&self) -> PromptTicket {
        PromptTicket {
            encounter_id: self.encounter_id,
            state_version: self.state_version,
            issued_at: self.issued_at,
        }
    }
}

/// Everything the presentation layer needs after a transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TurnBroadcast {
    /// Structured announcement.
    pub announcement: Announcement,
    /// Rendered announcement text.
    pub message: String,
    /// Users allowed to answer the prompt.
    pub authorized_actors: BTreeSet<String>,
    /// The control to offer, if any.
    pub prompt: Option<Prompt>,
}

impl TurnBroadcast {
    /// Returns whether `user_id` may answer the prompt.
    #[must_use]
    pub fn is_authorized(&self, user_id: &str) -> bool {
        self.authorized_actors.contains(user_id)
    }
}

/// Inputs for stamping prompts.
#[derive(Clone, Copy)]
pub struct PromptContext<'a> {
    /// Encounter the state belongs to.
    pub encounter_id: Uuid,
    /// Version of the state being broadcast.
    pub state_version: i64,
    /// Time source for `issued_at`.
    pub clock: &'a dyn Clock,
    /// Idle period before a prompt expires.
    pub ttl: TimeDelta,
}

fn announce(state: &InitiativeState, events: &[TurnEvent]) -> Announcement {
    if state.participants().is_empty() {
        return Announcement::NoParticipants;
    }
    if !state.has_turn_holder() {
        return Announcement::AwaitingGm { kind: state.kind() };
    }

    let participant_name = state.current_id().map_or_else(
        || UNKNOWN_PARTICIPANT.to_owned(),
        |id| state.participant_name(id),
    );
    if let Some(round_number) = started_round(events) {
        return Announcement::RoundStarted {
            round_number,
            participant_name,
        };
    }
    Announcement::Turn {
        kind: state.kind(),
        participant_name,
        round_number: state.round_number(),
        round_end: state.is_round_end(),
    }
}

fn choices(state: &InitiativeState) -> Option<(PromptKind, Vec<Choice>)> {
    if state.participants().is_empty() {
        return None;
    }
    match state {
        InitiativeState::RoundRobin(rr) if !rr.is_started() => Some((PromptKind::Start, Vec::new())),
        InitiativeState::RoundRobin(_) => Some((PromptKind::EndTurn, Vec::new())),
        InitiativeState::Popcorn(pc) => {
            let kind = if pc.current().is_none() {
                PromptKind::FirstPick
            } else {
                PromptKind::Nominate
            };
            let options: Vec<Choice> = pc
                .legal_nominees()
                .into_iter()
                .map(|id| Choice {
                    label: state.participant_name(&id),
                    participant_id: id,
                })
                .collect();
            (!options.is_empty()).then_some((kind, options))
        }
    }
}

/// Returns the users allowed to act next: every GM plus the owner of the
/// current participant, if there is one.
#[must_use]
pub fn authorized_actors(state: &InitiativeState, gm_ids: &BTreeSet<String>) -> BTreeSet<String> {
    let mut actors = gm_ids.clone();
    if let Some(owner) = state
        .current_participant()
        .and_then(|p| p.owner_id.as_ref())
    {
        actors.insert(owner.clone());
    }
    actors
}

/// Describes what to show and offer for `state`.
#[must_use]
pub fn broadcast(
    state: &InitiativeState,
    events: &[TurnEvent],
    gm_ids: &BTreeSet<String>,
    ctx: &PromptContext<'_>,
) -> TurnBroadcast {
    let announcement = announce(state, events);
    let authorized_actors = match announcement {
        Announcement::NoParticipants | Announcement::AwaitingGm { .. } => gm_ids.clone(),
        _ => authorized_actors(state, gm_ids),
    };
    let issued_at = ctx.clock.now();
    let prompt = choices(state).map(|(kind, choices)| Prompt {
        kind,
        choices,
        encounter_id: ctx.encounter_id,
        state_version: ctx.state_version,
        issued_at,
        expires_at: issued_at + ctx.ttl,
    });

    TurnBroadcast {
        message: announcement.to_string(),
        announcement,
        authorized_actors,
        prompt,
    }
}

/// Rejects answers to expired or out-of-date prompts. Callers that do not
/// track prompts pass `None` and are always accepted.
///
/// # Errors
///
/// Returns `DomainError::PromptExpired` once the idle period has passed and
/// `DomainError::StalePrompt` when the state moved on since the prompt was
/// rendered, including when the prompt belongs to a cleared encounter.
pub fn check_ticket(
    ticket: Option<&PromptTicket>,
    encounter_id: Uuid,
    current_version: i64,
    now: DateTime<Utc>,
    ttl: TimeDelta,
) -> Result<(), DomainError> {
    let Some(ticket) = ticket else {
        return Ok(());
    };
    if now > ticket.issued_at + ttl {
        return Err(DomainError::PromptExpired);
    }
    if ticket.encounter_id != encounter_id || ticket.state_version != current_version {
        return Err(DomainError::StalePrompt {
            prompt_version: ticket.state_version,
            current: current_version,
        });
    }
    Ok(())
}
