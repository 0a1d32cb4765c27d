//! Domain model for the Initiative context.

pub mod actions;
pub mod commands;
pub mod events;
pub mod participant;
pub mod popcorn;
pub mod round_robin;
pub mod state;
