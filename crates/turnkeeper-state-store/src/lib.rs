//! PostgreSQL adapters for the Turnkeeper ports.

pub mod pg_participant_directory;
pub mod pg_permission_oracle;
pub mod pg_state_repository;

/// Embedded schema migrations from the workspace `migrations/` directory.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

pub(crate) fn infrastructure(err: &sqlx::Error) -> turnkeeper_core::error::DomainError {
    turnkeeper_core::error::DomainError::Infrastructure(err.to_string())
}
