use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

use crate::{passwords::PasswordError, repository::RepoError, session::SessionError, views};

/// AppError
///
/// Failures that escape a handler. User-facing outcomes (bad form input, wrong
/// password, duplicate email) are handled inside the handlers and never reach
/// this type.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("not found")]
    NotFound,

    #[error("forbidden")]
    Forbidden,

    #[error("repository failure: {0}")]
    Repository(#[source] RepoError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Password(#[from] PasswordError),
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound => AppError::NotFound,
            other => AppError::Repository(other),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Repository(_) | AppError::Session(_) | AppError::Password(_) => {
                tracing::error!(error = %self, "request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let title = status.canonical_reason().unwrap_or("Error");
        (status, Html(views::error_page(status.as_u16(), title))).into_response()
    }
}

/// Result type alias for handlers.
pub type AppResult<T> = Result<T, AppError>;
