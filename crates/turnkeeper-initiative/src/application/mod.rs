//! Application services for the Initiative context.

pub mod broadcaster;
pub mod command_handlers;
pub mod query_handlers;
