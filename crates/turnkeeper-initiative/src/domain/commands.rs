//! Commands for the Initiative context.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use turnkeeper_core::command::Command;
use turnkeeper_core::key::ChannelKey;
use uuid::Uuid;

use super::state::InitiativeKind;

/// Identifies the prompt a user answered, so stale or expired prompts can be
/// rejected without touching state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptTicket {
    /// The encounter the prompt belongs to.
    pub encounter_id: Uuid,
    /// The state version the prompt was rendered from.
    pub state_version: i64,
    /// When the prompt was issued.
    pub issued_at: DateTime<Utc>,
}

macro_rules! impl_command {
    ($command:ty, $name:literal) => {
        impl Command for $command {
            fn command_type(&self) -> &'static str {
                $name
            }

            fn correlation_id(&self) -> Uuid {
                self.correlation_id
            }

            fn channel_key(&self) -> &ChannelKey {
                &self.key
            }

            fn actor_id(&self) -> &str {
                &self.user_id
            }
        }
    };
}

/// Command to set up initiative in a channel.
#[derive(Debug, Clone)]
pub struct SetupInitiative {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The target channel.
    pub key: ChannelKey,
    /// The user issuing the command.
    pub user_id: String,
    /// Which scheme to run.
    pub kind: InitiativeKind,
    /// Participants to seed, resolved through the directory.
    pub participant_ids: Vec<String>,
}

impl_command!(SetupInitiative, "initiative.setup");

/// Command to end initiative in a channel.
#[derive(Debug, Clone)]
pub struct ClearInitiative {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The target channel.
    pub key: ChannelKey,
    /// The user issuing the command.
    pub user_id: String,
}

impl_command!(ClearInitiative, "initiative.clear");

/// Command to add a participant to the roster.
#[derive(Debug, Clone)]
pub struct AddParticipant {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The target channel.
    pub key: ChannelKey,
    /// The user issuing the command.
    pub user_id: String,
    /// Directory id of the participant to add.
    pub participant_id: String,
}

impl_command!(AddParticipant, "initiative.add_participant");

/// Command to remove a participant from the roster.
#[derive(Debug, Clone)]
pub struct RemoveParticipant {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The target channel.
    pub key: ChannelKey,
    /// The user issuing the command.
    pub user_id: String,
    /// The participant to remove.
    pub participant_id: String,
}

impl_command!(RemoveParticipant, "initiative.remove_participant");

/// Command to start round-robin initiative.
#[derive(Debug, Clone)]
pub struct StartRoundRobin {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The target channel.
    pub key: ChannelKey,
    /// The user issuing the command.
    pub user_id: String,
}

impl_command!(StartRoundRobin, "initiative.start_round_robin");

/// Command to end the current round-robin turn.
#[derive(Debug, Clone)]
pub struct AdvanceRoundRobin {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The target channel.
    pub key: ChannelKey,
    /// The user issuing the command.
    pub user_id: String,
    /// The prompt being answered, if the caller tracks one.
    pub prompt: Option<PromptTicket>,
}

impl_command!(AdvanceRoundRobin, "initiative.advance_round_robin");

/// Command for the GM's opening popcorn pick.
#[derive(Debug, Clone)]
pub struct FirstPickPopcorn {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The target channel.
    pub key: ChannelKey,
    /// The user issuing the command.
    pub user_id: String,
    /// Who acts first.
    pub participant_id: String,
    /// The prompt being answered, if the caller tracks one.
    pub prompt: Option<PromptTicket>,
}

impl_command!(FirstPickPopcorn, "initiative.first_pick_popcorn");

/// Command for a popcorn nomination.
#[derive(Debug, Clone)]
pub struct AdvancePopcorn {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The target channel.
    pub key: ChannelKey,
    /// The user issuing the command.
    pub user_id: String,
    /// Who acts next.
    pub nominee_id: String,
    /// The prompt being answered, if the caller tracks one.
    pub prompt: Option<PromptTicket>,
}

impl_command!(AdvancePopcorn, "initiative.advance_popcorn");
