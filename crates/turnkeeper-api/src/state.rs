//! Shared application state.

use std::sync::Arc;

use chrono::TimeDelta;
use sqlx::PgPool;
use turnkeeper_core::clock::{Clock, SystemClock};
use turnkeeper_core::directory::ParticipantDirectory;
use turnkeeper_core::permissions::PermissionOracle;
use turnkeeper_core::repository::StateRepository;
use turnkeeper_initiative::application::command_handlers::Collaborators;
use turnkeeper_state_store::pg_participant_directory::PgParticipantDirectory;
use turnkeeper_state_store::pg_permission_oracle::PgPermissionOracle;
use turnkeeper_state_store::pg_state_repository::PgStateRepository;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Time source for prompt stamping and expiry.
    pub clock: Arc<dyn Clock>,
    /// Initiative record storage.
    pub state_repository: Arc<dyn StateRepository>,
    /// GM lookups.
    pub permissions: Arc<dyn PermissionOracle>,
    /// Character/NPC lookups.
    pub directory: Arc<dyn ParticipantDirectory>,
    /// Idle period before a prompt expires.
    pub prompt_ttl: TimeDelta,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        state_repository: Arc<dyn StateRepository>,
        permissions: Arc<dyn PermissionOracle>,
        directory: Arc<dyn ParticipantDirectory>,
        prompt_ttl: TimeDelta,
    ) -> Self {
        Self {
            clock,
            state_repository,
            permissions,
            directory,
            prompt_ttl,
        }
    }

    /// Wires the PostgreSQL adapters and the system clock.
    #[must_use]
    pub fn from_pool(pool: &PgPool, prompt_ttl: TimeDelta) -> Self {
        Self::new(
            Arc::new(SystemClock),
            Arc::new(PgStateRepository::new(pool.clone())),
            Arc::new(PgPermissionOracle::new(pool.clone())),
            Arc::new(PgParticipantDirectory::new(pool.clone())),
            prompt_ttl,
        )
    }

    /// Borrows the ports for one command.
    #[must_use]
    pub fn collaborators(&self) -> Collaborators<'_> {
        Collaborators {
            clock: self.clock.as_ref(),
            repo: self.state_repository.as_ref(),
            permissions: self.permissions.as_ref(),
            directory: self.directory.as_ref(),
            prompt_ttl: self.prompt_ttl,
        }
    }
}
