//! Environment configuration.

use std::net::SocketAddr;

use chrono::TimeDelta;

use crate::error::AppError;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_PROMPT_TTL_SECS: u32 = 180;

/// Server settings read at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// PostgreSQL connection string.
    pub database_url: String,
    /// Interface to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Upper bound on pooled connections.
    pub db_max_connections: u32,
    /// Idle period before an initiative prompt expires.
    pub prompt_ttl: TimeDelta,
}

impl AppConfig {
    /// Reads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` when `DATABASE_URL` is missing or a numeric
    /// variable does not parse.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads configuration through `lookup`, which maps a variable name to
    /// its value.
    ///
    /// # Errors
    ///
    /// Same as [`AppConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let database_url = lookup("DATABASE_URL").ok_or_else(|| {
            AppError::Config("DATABASE_URL environment variable must be set".to_owned())
        })?;
        let host = lookup("HOST").unwrap_or_else(|| DEFAULT_HOST.to_owned());
        let port = parse_or(&lookup, "PORT", DEFAULT_PORT)?;
        let db_max_connections = parse_or(&lookup, "DB_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)?;
        let ttl_secs = parse_or(&lookup, "PROMPT_TTL_SECS", DEFAULT_PROMPT_TTL_SECS)?;
        if ttl_secs == 0 {
            return Err(AppError::Config(
                "PROMPT_TTL_SECS must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            database_url,
            host,
            port,
            db_max_connections,
            prompt_ttl: TimeDelta::seconds(i64::from(ttl_secs)),
        })
    }

    /// Returns the socket address to listen on.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `HOST:PORT` is not a valid address.
    pub fn bind_addr(&self) -> Result<SocketAddr, AppError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Result<T, AppError>
where
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(raw) => raw
            .parse()
            .map_err(|e| AppError::Config(format!("{name} must be a valid number: {e}"))),
        None => Ok(default),
    }
}
