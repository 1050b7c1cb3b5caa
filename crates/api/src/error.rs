use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kublade_core::error::CoreError;
use kublade_core::queue::QueueError;

use crate::response::{ApiResponse, Failure, Payload, StatusTag};

/// Message returned for every 500 unless a [`Failure`] is attached.
pub const SERVER_ERROR: &str = "Server Error";

/// Everything a handler can fail with, rendered as an error envelope.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Logged in full; the client sees only [`SERVER_ERROR`].
    #[error("Internal error: {0}")]
    InternalError(String),

    /// A caught failure whose detail is returned to the (authenticated) caller.
    #[error("Failure: {}", .0.message)]
    Failure(Failure),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Capture `err` with location and backtrace as an [`AppError::Failure`].
    #[track_caller]
    pub fn failure<E: std::error::Error + ?Sized>(err: &E) -> Self {
        AppError::Failure(Failure::capture(err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => {
                    (StatusCode::NOT_FOUND, format!("{entity} with id {id} not found"))
                }
                CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
                CoreError::Conflict(msg) => (StatusCode::CONFLICT, msg),
                CoreError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
                CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    (StatusCode::INTERNAL_SERVER_ERROR, SERVER_ERROR.to_string())
                }
            },

            AppError::Queue(err) => {
                tracing::error!(error = %err, "Queue error");
                (StatusCode::INTERNAL_SERVER_ERROR, SERVER_ERROR.to_string())
            }

            AppError::Database(err) => classify_sqlx_error(&err),

            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),

            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, SERVER_ERROR.to_string())
            }

            AppError::Failure(failure) => {
                tracing::error!(
                    error = %failure.message,
                    file = %failure.file,
                    line = failure.line,
                    "Request failed"
                );
                return ApiResponse::generate(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    StatusTag::Error,
                    SERVER_ERROR,
                    Payload::Failure(failure),
                );
            }
        };

        ApiResponse::error(status, message)
    }
}

/// Classify a sqlx error into an HTTP status and message.
///
/// - `RowNotFound` is 404.
/// - A unique violation on a `uq_` constraint is 409.
/// - Anything else is logged and answered with [`SERVER_ERROR`].
fn classify_sqlx_error(err: &sqlx::Error) -> (StatusCode, String) {
    match err {
        sqlx::Error::RowNotFound => (StatusCode::NOT_FOUND, "Resource not found".to_string()),
        sqlx::Error::Database(db_err) => {
            // PostgreSQL unique_violation
            if db_err.code().as_deref() == Some("23505") {
                let constraint = db_err.constraint().unwrap_or("unknown");
                if constraint.starts_with("uq_") {
                    return (
                        StatusCode::CONFLICT,
                        format!("Duplicate value violates unique constraint: {constraint}"),
                    );
                }
            }
            tracing::error!(error = %db_err, "Database error");
            (StatusCode::INTERNAL_SERVER_ERROR, SERVER_ERROR.to_string())
        }
        other => {
            tracing::error!(error = %other, "Database error");
            (StatusCode::INTERNAL_SERVER_ERROR, SERVER_ERROR.to_string())
        }
    }
}
