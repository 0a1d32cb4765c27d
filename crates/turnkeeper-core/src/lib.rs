//! Turnkeeper Core — shared domain abstractions.
//!
//! This crate defines the error type, the deterministic clock, the command
//! trait and the ports (state store, permission oracle, participant
//! directory) that the initiative context consumes. It contains no
//! infrastructure code.

pub mod clock;
pub mod command;
pub mod directory;
pub mod error;
pub mod key;
pub mod permissions;
pub mod repository;
