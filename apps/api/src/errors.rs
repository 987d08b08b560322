use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::discord::DiscordError;
use crate::wallet::WalletError;

/// Postgres unique_violation.
const PG_UNIQUE_VIOLATION: &str = "23505";
/// Raised by `deduct_accumulated_sats` when the balance is too low.
pub const PG_INSUFFICIENT_SATS: &str = "PW402";
/// Raised by `deduct_accumulated_sats` when the expected balance is stale.
pub const PG_BALANCE_CHANGED: &str = "PW409";

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unprocessable entity: {0}")]
    UnprocessableEntity(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Discord error: {0}")]
    Discord(#[from] DiscordError),

    #[error("Wallet error: {0}")]
    Wallet(#[from] WalletError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Maps a unique-constraint violation to `Conflict(message)`; any other
    /// database error passes through unchanged.
    pub fn conflict_on_unique(err: sqlx::Error, message: impl Into<String>) -> AppError {
        if pg_error_code(&err).as_deref() == Some(PG_UNIQUE_VIOLATION) {
            AppError::Conflict(message.into())
        } else {
            AppError::Database(err)
        }
    }
}

/// Returns the SQLSTATE of a database error, if there is one.
pub fn pg_error_code(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().map(|c| c.into_owned()),
        _ => None,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::UnprocessableEntity(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "UNPROCESSABLE_ENTITY",
                msg.clone(),
            ),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Authentication required".to_string(),
            ),
            AppError::Forbidden => (
                StatusCode::FORBIDDEN,
                "FORBIDDEN",
                "Access denied".to_string(),
            ),
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Discord(e) => {
                tracing::error!("Discord error: {e}");
                (
                    StatusCode::BAD_GATEWAY,
                    "DISCORD_ERROR",
                    "Discord request failed".to_string(),
                )
            }
            AppError::Wallet(e) => {
                tracing::error!("Wallet error: {e}");
                (
                    StatusCode::BAD_GATEWAY,
                    "WALLET_ERROR",
                    "Lightning wallet request failed".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
