//! Turnkeeper HTTP API: configuration, telemetry, routing and error mapping.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod telemetry;
