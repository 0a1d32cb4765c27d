//! Command handlers for the Initiative context.
//!
//! Each handler re-reads the channel's record, applies a pure transition,
//! writes the whole record back under optimistic concurrency and rebuilds
//! the broadcast from the result. Nothing is written when a transition is
//! rejected.

use std::collections::HashSet;

use chrono::TimeDelta;
use tracing::{debug, info, instrument};
use turnkeeper_core::clock::Clock;
use turnkeeper_core::command::Command;
use turnkeeper_core::directory::ParticipantDirectory;
use turnkeeper_core::error::DomainError;
use turnkeeper_core::key::ChannelKey;
use turnkeeper_core::permissions::PermissionOracle;
use turnkeeper_core::repository::StateRepository;
use uuid::Uuid;

use crate::application::broadcaster::{PromptContext, TurnBroadcast, broadcast, check_ticket};
use crate::domain::actions::{Actor, TurnAction, apply};
use crate::domain::commands::{
    AddParticipant, AdvancePopcorn, AdvanceRoundRobin, ClearInitiative, FirstPickPopcorn,
    PromptTicket, RemoveParticipant, SetupInitiative, StartRoundRobin,
};
use crate::domain::events::TurnEvent;
use crate::domain::participant::Participant;
use crate::domain::state::{Encounter, InitiativeState};

/// The ports a handler talks to.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    /// Time source for prompt stamping and expiry.
    pub clock: &'a dyn Clock,
    /// Authoritative state storage.
    pub repo: &'a dyn StateRepository,
    /// GM lookups.
    pub permissions: &'a dyn PermissionOracle,
    /// Character/NPC lookups.
    pub directory: &'a dyn ParticipantDirectory,
    /// Idle period before a prompt expires.
    pub prompt_ttl: TimeDelta,
}

/// Result of a successfully handled command.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// The encounter the command acted on.
    pub encounter_id: Uuid,
    /// The state after the transition.
    pub state: InitiativeState,
    /// The stored version of that state.
    pub version: i64,
    /// What happened.
    pub events: Vec<TurnEvent>,
    /// What to announce and who may answer.
    pub broadcast: TurnBroadcast,
}

/// Loads the channel's encounter and its stored version.
///
/// # Errors
///
/// Returns `DomainError::InitiativeNotFound` when the channel has no record,
/// and `DomainError::Infrastructure` when the record cannot be read.
pub async fn load_state(
    key: &ChannelKey,
    repo: &dyn StateRepository,
) -> Result<(Encounter, i64), DomainError> {
    let record = repo
        .load(key)
        .await?
        .ok_or_else(|| DomainError::InitiativeNotFound(key.clone()))?;
    let encounter = Encounter::from_payload(&record.payload)?;
    Ok((encounter, record.version))
}

async fn resolve_actor(
    key: &ChannelKey,
    user_id: &str,
    permissions: &dyn PermissionOracle,
) -> Result<Actor, DomainError> {
    let is_gm = permissions.is_gm(&key.session_id, user_id).await?;
    Ok(Actor {
        user_id: user_id.to_owned(),
        is_gm,
    })
}

async fn resolve_participant(
    key: &ChannelKey,
    participant_id: &str,
    directory: &dyn ParticipantDirectory,
) -> Result<Participant, DomainError> {
    directory
        .lookup(&key.session_id, participant_id)
        .await?
        .map(Participant::from)
        .ok_or_else(|| DomainError::ParticipantNotFound(participant_id.to_owned()))
}

async fn publish(
    key: &ChannelKey,
    encounter: Encounter,
    version: i64,
    events: Vec<TurnEvent>,
    collab: &Collaborators<'_>,
) -> Result<TurnOutcome, DomainError> {
    let gm_ids = collab.permissions.list_gm_ids(&key.session_id).await?;
    let ctx = PromptContext {
        encounter_id: encounter.id,
        state_version: version,
        clock: collab.clock,
        ttl: collab.prompt_ttl,
    };
    let broadcast = broadcast(&encounter.state, &events, &gm_ids, &ctx);
    Ok(TurnOutcome {
        encounter_id: encounter.id,
        state: encounter.state,
        version,
        events,
        broadcast,
    })
}

/// Load, check the prompt, authorize, transition, save, broadcast.
async fn run_action<C: Command>(
    command: &C,
    action: TurnAction,
    ticket: Option<&PromptTicket>,
    collab: &Collaborators<'_>,
) -> Result<TurnOutcome, DomainError> {
    run_action_as(command, action, ticket, None, collab).await
}

/// As [`run_action`], reusing `actor` when the caller has already resolved
/// it.
async fn run_action_as<C: Command>(
    command: &C,
    action: TurnAction,
    ticket: Option<&PromptTicket>,
    actor: Option<Actor>,
    collab: &Collaborators<'_>,
) -> Result<TurnOutcome, DomainError> {
    let key = command.channel_key();
    let (encounter, version) = load_state(key, collab.repo).await?;
    check_ticket(
        ticket,
        encounter.id,
        version,
        collab.clock.now(),
        collab.prompt_ttl,
    )?;

    let actor = match actor {
        Some(actor) => actor,
        None => resolve_actor(key, command.actor_id(), collab.permissions).await?,
    };
    let transition = apply(&encounter.state, &action, &actor)?;

    let next = encounter.with_state(transition.state);
    let new_version = collab.repo.save(key, version, next.to_payload()?).await?;
    info!(
        command_type = command.command_type(),
        encounter_id = %next.id,
        version = new_version,
        events = transition.events.len(),
        "initiative updated"
    );
    for event in &transition.events {
        debug!(event_type = event.event_type(), "turn event");
    }

    publish(key, next, new_version, transition.events, collab).await
}

/// Handles the `SetupInitiative` command: seeds a new record for the channel.
///
/// # Errors
///
/// Returns `DomainError::NotAuthorized` for non-GMs, `DomainError::Validation`
/// when the channel already has an initiative or an id is repeated, and
/// `DomainError::ParticipantNotFound` for ids the directory does not know.
#[instrument(skip_all, fields(key = %command.key, user_id = %command.user_id, correlation_id = %command.correlation_id))]
pub async fn handle_setup_initiative(
    command: &SetupInitiative,
    collab: &Collaborators<'_>,
) -> Result<TurnOutcome, DomainError> {
    let actor = resolve_actor(&command.key, &command.user_id, collab.permissions).await?;
    if !actor.is_gm {
        return Err(DomainError::not_authorized(&actor.user_id, "set up initiative"));
    }
    if collab.repo.load(&command.key).await?.is_some() {
        return Err(DomainError::Validation(format!(
            "initiative is already running in {}",
            command.key
        )));
    }

    let mut seen = HashSet::new();
    let mut participants = Vec::with_capacity(command.participant_ids.len());
    for id in &command.participant_ids {
        if !seen.insert(id.as_str()) {
            return Err(DomainError::Validation(format!(
                "{id} is listed more than once"
            )));
        }
        participants.push(resolve_participant(&command.key, id, collab.directory).await?);
    }

    let encounter = Encounter::begin(InitiativeState::new(command.kind, participants));
    let version = collab
        .repo
        .save(&command.key, 0, encounter.to_payload()?)
        .await?;
    info!(
        kind = command.kind.as_str(),
        encounter_id = %encounter.id,
        participants = encounter.state.participants().len(),
        "initiative created"
    );

    publish(
        &command.key,
        encounter,
        version,
        vec![TurnEvent::InitiativeCreated],
        collab,
    )
    .await
}

/// Handles the `ClearInitiative` command: deletes the channel's record.
///
/// # Errors
///
/// Returns `DomainError::NotAuthorized` for non-GMs and
/// `DomainError::InitiativeNotFound` when nothing is running.
#[instrument(skip_all, fields(key = %command.key, user_id = %command.user_id, correlation_id = %command.correlation_id))]
pub async fn handle_clear_initiative(
    command: &ClearInitiative,
    collab: &Collaborators<'_>,
) -> Result<(), DomainError> {
    let actor = resolve_actor(&command.key, &command.user_id, collab.permissions).await?;
    if !actor.is_gm {
        return Err(DomainError::not_authorized(&actor.user_id, "clear initiative"));
    }
    if !collab.repo.delete(&command.key).await? {
        return Err(DomainError::InitiativeNotFound(command.key.clone()));
    }
    info!("initiative cleared");
    Ok(())
}

/// Handles the `AddParticipant` command.
///
/// # Errors
///
/// Returns `DomainError::NotAuthorized` for non-GMs,
/// `DomainError::ParticipantNotFound` for unknown directory ids and
/// `DomainError::Validation` for duplicates.
#[instrument(skip_all, fields(key = %command.key, user_id = %command.user_id, correlation_id = %command.correlation_id))]
pub async fn handle_add_participant(
    command: &AddParticipant,
    collab: &Collaborators<'_>,
) -> Result<TurnOutcome, DomainError> {
    let actor = resolve_actor(&command.key, &command.user_id, collab.permissions).await?;
    if !actor.is_gm {
        return Err(DomainError::not_authorized(&actor.user_id, "add participants"));
    }
    let participant =
        resolve_participant(&command.key, &command.participant_id, collab.directory).await?;
    debug!(participant_id = %participant.id, "resolved participant");

    run_action_as(
        command,
        TurnAction::AddParticipant(participant),
        None,
        Some(actor),
        collab,
    )
    .await
}

/// Handles the `RemoveParticipant` command.
///
/// # Errors
///
/// Returns `DomainError::NotAuthorized` for non-GMs and
/// `DomainError::ParticipantNotFound` when the id is not in the roster.
#[instrument(skip_all, fields(key = %command.key, user_id = %command.user_id, correlation_id = %command.correlation_id))]
pub async fn handle_remove_participant(
    command: &RemoveParticipant,
    collab: &Collaborators<'_>,
) -> Result<TurnOutcome, DomainError> {
    run_action(
        command,
        TurnAction::RemoveParticipant {
            participant_id: command.participant_id.clone(),
        },
        None,
        collab,
    )
    .await
}

/// Handles the `StartRoundRobin` command.
///
/// # Errors
///
/// Returns `DomainError::NotAuthorized` for non-GMs and
/// `DomainError::Validation` for popcorn encounters or a second start.
#[instrument(skip_all, fields(key = %command.key, user_id = %command.user_id, correlation_id = %command.correlation_id))]
pub async fn handle_start_round_robin(
    command: &StartRoundRobin,
    collab: &Collaborators<'_>,
) -> Result<TurnOutcome, DomainError> {
    run_action(command, TurnAction::Start, None, collab).await
}

/// Handles the `AdvanceRoundRobin` command.
///
/// # Errors
///
/// Returns `DomainError::PromptExpired` or `DomainError::StalePrompt` for
/// old prompts, `DomainError::NotAuthorized` for users who do not hold the
/// turn, and `DomainError::NotYetStarted` or `DomainError::NoParticipants`
/// when there is no turn to end.
#[instrument(skip_all, fields(key = %command.key, user_id = %command.user_id, correlation_id = %command.correlation_id))]
pub async fn handle_advance_round_robin(
    command: &AdvanceRoundRobin,
    collab: &Collaborators<'_>,
) -> Result<TurnOutcome, DomainError> {
    run_action(command, TurnAction::Advance, command.prompt.as_ref(), collab).await
}

/// Handles the `FirstPickPopcorn` command.
///
/// # Errors
///
/// Returns `DomainError::NotAuthorized` for non-GMs,
/// `DomainError::InvalidNominee` for ids outside the roster and
/// `DomainError::Validation` once a pick has been made.
#[instrument(skip_all, fields(key = %command.key, user_id = %command.user_id, correlation_id = %command.correlation_id))]
pub async fn handle_first_pick_popcorn(
    command: &FirstPickPopcorn,
    collab: &Collaborators<'_>,
) -> Result<TurnOutcome, DomainError> {
    run_action(
        command,
        TurnAction::FirstPick {
            participant_id: command.participant_id.clone(),
        },
        command.prompt.as_ref(),
        collab,
    )
    .await
}

/// Handles the `AdvancePopcorn` command.
///
/// # Errors
///
/// Returns `DomainError::NotAuthorized` for users who do not hold the turn
/// and `DomainError::InvalidNominee` (carrying the legal choices) for
/// nominees that may not act next.
#[instrument(skip_all, fields(key = %command.key, user_id = %command.user_id, correlation_id = %command.correlation_id))]
pub async fn handle_advance_popcorn(
    command: &AdvancePopcorn,
    collab: &Collaborators<'_>,
) -> Result<TurnOutcome, DomainError> {
    run_action(
        command,
        TurnAction::Nominate {
            nominee_id: command.nominee_id.clone(),
        },
        command.prompt.as_ref(),
        collab,
    )
    .await
}
