//! Turnkeeper — API error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};
use turnkeeper_core::error::DomainError;

/// Startup errors for the API server.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Database connection, pool or migration error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Network binding or I/O error.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),

    /// Trace exporter setup failed.
    #[error("telemetry error: {0}")]
    Telemetry(String),
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        Self::Database(err.into())
    }
}

/// JSON body returned for error responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub error: &'static str,
    /// Human-readable error message.
    pub message: String,
    /// Participant ids that may be picked instead, for rejected nominations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legal: Option<Vec<String>>,
}

/// HTTP-layer wrapper around `DomainError` that implements `IntoResponse`.
#[derive(Debug)]
pub struct ApiError(pub DomainError);

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self.0 {
            DomainError::NotAuthorized { .. } => (StatusCode::FORBIDDEN, "not_authorized"),
            DomainError::InvalidNominee { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "invalid_nominee")
            }
            DomainError::NoParticipants => (StatusCode::CONFLICT, "no_participants"),
            DomainError::NotYetStarted => (StatusCode::CONFLICT, "not_yet_started"),
            DomainError::ConcurrencyConflict { .. } => {
                (StatusCode::CONFLICT, "concurrency_conflict")
            }
            DomainError::StalePrompt { .. } => (StatusCode::CONFLICT, "stale_prompt"),
            DomainError::PromptExpired => (StatusCode::GONE, "prompt_expired"),
            DomainError::InitiativeNotFound(_) => (StatusCode::NOT_FOUND, "initiative_not_found"),
            DomainError::ParticipantNotFound(_) => {
                (StatusCode::NOT_FOUND, "participant_not_found")
            }
            DomainError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            DomainError::Infrastructure(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "infrastructure_error")
            }
        };

        if status.is_server_error() {
            error!(error = %self.0, "request failed");
        } else if status == StatusCode::CONFLICT {
            warn!(error = %self.0, "request rejected");
        }

        let legal = match &self.0 {
            DomainError::InvalidNominee { legal, .. } => Some(legal.clone()),
            _ => None,
        };
        let body = ErrorBody {
            error: error_code,
            message: self.0.to_string(),
            legal,
        };

        (status, Json(body)).into_response()
    }
}
