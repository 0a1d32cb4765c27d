//! Turnkeeper — Initiative bounded context.
//!
//! Responsible for per-channel turn order: round-robin and popcorn
//! initiative, participant rosters, and the prompts offered after every
//! transition.

pub mod application;
pub mod domain;
