//! Query handlers for the Initiative context.
//!
//! Reads the channel's record and renders a fresh broadcast for it, so a
//! client that lost its prompt can recover the current one.

use serde::Serialize;
use tracing::instrument;
use turnkeeper_core::error::DomainError;
use turnkeeper_core::key::ChannelKey;
use uuid::Uuid;

use crate::application::broadcaster::{PromptContext, TurnBroadcast, broadcast};
use crate::application::command_handlers::{Collaborators, load_state};
use crate::domain::state::InitiativeRecord;

/// Read-only view of a channel's initiative.
#[derive(Debug, Serialize)]
pub struct InitiativeView {
    /// Owning game session.
    pub session_id: String,
    /// Chat channel.
    pub channel_id: String,
    /// The running encounter.
    pub encounter_id: Uuid,
    /// Stored version, used as the prompt's state version.
    pub version: i64,
    /// The stored state.
    #[serde(flatten)]
    pub record: InitiativeRecord,
    /// Announcement and prompt for the current state.
    pub broadcast: TurnBroadcast,
    /// Whether the viewer may answer the prompt.
    pub viewer_may_act: bool,
}

/// Retrieves the initiative running in a channel.
///
/// # Errors
///
/// Returns `DomainError::InitiativeNotFound` when nothing is running, and
/// `DomainError::Infrastructure` if the record cannot be read.
#[instrument(skip_all, fields(key = %key, viewer_id = %viewer_id))]
pub async fn get_initiative(
    key: &ChannelKey,
    viewer_id: &str,
    collab: &Collaborators<'_>,
) -> Result<InitiativeView, DomainError> {
    let (encounter, version) = load_state(key, collab.repo).await?;
    let gm_ids = collab.permissions.list_gm_ids(&key.session_id).await?;
    let ctx = PromptContext {
        encounter_id: encounter.id,
        state_version: version,
        clock: collab.clock,
        ttl: collab.prompt_ttl,
    };
    let broadcast = broadcast(&encounter.state, &[], &gm_ids, &ctx);

    Ok(InitiativeView {
        session_id: key.session_id.clone(),
        channel_id: key.channel_id.clone(),
        encounter_id: encounter.id,
        version,
        record: encounter.state.to_storage(),
        viewer_may_act: broadcast.is_authorized(viewer_id),
        broadcast,
    })
}
