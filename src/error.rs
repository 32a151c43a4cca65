//! Errors returned by page handlers.

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};

use crate::db::queries::TransitionError;
use crate::services::queue::QueueError;
use crate::services::storage::StorageError;
use crate::views::pages;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<TransitionError> for AppError {
    fn from(e: TransitionError) -> Self {
        match e {
            TransitionError::NotFound(_) => AppError::NotFound("Job"),
            TransitionError::Database(db) => AppError::Database(db),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Database(_) | AppError::Queue(_) | AppError::Storage(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let (title, message) = match &self {
            AppError::NotFound(what) => ("Not found", format!("{what} not found. It may have been deleted.")),
            AppError::BadRequest(reason) => ("Bad request", reason.clone()),
            _ => {
                tracing::error!(error = %self, "Request failed");
                // Don't expose internal error details in production
                let detail = if std::env::var("ENVIRONMENT").unwrap_or_default() == "production" {
                    "An internal error occurred".to_string()
                } else {
                    self.to_string()
                };
                ("Something went wrong", detail)
            }
        };

        (status, Html(pages::error_page(title, &message))).into_response()
    }
}
