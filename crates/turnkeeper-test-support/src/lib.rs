//! Shared test mocks and utilities for the Turnkeeper initiative tracker.

mod clock;
mod directory;
mod permissions;
mod repository;

pub use clock::{FixedClock, fixed_now};
pub use directory::InMemoryParticipantDirectory;
pub use permissions::{FailingPermissionOracle, StaticPermissionOracle};
pub use repository::{FailingStateRepository, InMemoryStateRepository};
