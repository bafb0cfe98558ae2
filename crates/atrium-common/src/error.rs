//! Centralized error types for Atrium.
//!
//! Uses `thiserror` for ergonomic error definitions and provides HTTP-friendly
//! error variants that can be directly converted to API responses.
//!
//! Admission outcomes (`RoomFull`, `AlreadyInRoom`) are business results, not
//! faults — callers must branch on them explicitly. `NotConnected` signals a
//! caller bug (publishing before a connection is open), never a user problem.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Core application error type used across all Atrium services.
#[derive(Debug, thiserror::Error)]
pub enum AtriumError {
    // === Room admission ===
    #[error("Room '{room_id}' not found")]
    RoomNotFound { room_id: String },

    #[error("Room is full ({current}/{max})")]
    RoomFull { current: usize, max: usize },

    #[error("Already in room")]
    AlreadyInRoom,

    // === Transport ===
    #[error("Connection failed: {message}")]
    Connection { message: String },

    #[error("Not connected to a room channel")]
    NotConnected,

    // === Validation errors ===
    #[error("Validation failed: {message}")]
    Validation { message: String },

    // === Infrastructure errors ===
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// JSON error response body sent to clients.
#[derive(Serialize)]
struct ErrorResponse {
    code: u16,
    error: String,
    message: String,
}

impl AtriumError {
    /// Map error to HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::RoomNotFound { .. } => StatusCode::NOT_FOUND,
            Self::RoomFull { .. } | Self::AlreadyInRoom => StatusCode::CONFLICT,
            Self::Connection { .. } => StatusCode::GATEWAY_TIMEOUT,
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::NotConnected | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Error code string for programmatic handling by clients.
    pub fn error_code(&self) -> &str {
        match self {
            Self::RoomNotFound { .. } => "ROOM_NOT_FOUND",
            Self::RoomFull { .. } => "ROOM_FULL",
            Self::AlreadyInRoom => "ALREADY_IN_ROOM",
            Self::Connection { .. } => "CONNECTION_FAILED",
            Self::NotConnected => "NOT_CONNECTED",
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for AtriumError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Don't leak internal details to clients
        let message = match &self {
            AtriumError::Internal(e) => {
                tracing::error!("Internal error: {e}");
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorResponse {
            code: status.as_u16(),
            error: self.error_code().to_string(),
            message,
        };

        (status, axum::Json(body)).into_response()
    }
}

/// Convenience type alias for Results using AtriumError.
pub type AtriumResult<T> = Result<T, AtriumError>;
