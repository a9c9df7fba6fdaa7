use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

/// Everything the chat and notification core can refuse.
///
/// `Forbidden` never carries detail: a caller acting outside its own
/// conversation or notification only learns that access was denied.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("authentication failed")]
    Auth,

    #[error("{0}")]
    InvalidInput(&'static str),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("access denied")]
    Forbidden,

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Auth => StatusCode::UNAUTHORIZED,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable tag sent alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Auth => "unauthorized",
            AppError::InvalidInput(_) => "invalid_input",
            AppError::NotFound(_) => "not_found",
            AppError::Forbidden => "forbidden",
            AppError::Storage(_) => "server_error",
        }
    }

    /// The text shown to the client. Storage details stay in the logs.
    pub fn client_message(&self) -> String {
        match self {
            AppError::Storage(e) => {
                tracing::error!(error = %e, "storage error");
                "server error".to_owned()
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (
            self.status(),
            Json(json!({ "error": self.client_message(), "code": self.code() })),
        )
            .into_response()
    }
}
