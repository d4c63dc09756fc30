use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Poll not found")]
    NotFound,

    #[error("Invalid option index")]
    OptionOutOfRange,

    #[error("Storage call timed out")]
    Timeout,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

#[derive(Error, Debug)]
pub enum PollError {
    #[error("Invalid admin key")]
    Auth,

    #[error("{0}")]
    Validation(String),

    #[error("Poll not found")]
    NotFound,

    #[error("Storage error: {0}")]
    Storage(StoreError),
}

impl From<StoreError> for PollError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => PollError::NotFound,
            StoreError::OptionOutOfRange => PollError::Validation("Invalid option index".into()),
            other => PollError::Storage(other),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("Invalid {key} value: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Boundary error; the only type handlers return.
#[derive(Error, Debug)]
#[error(transparent)]
pub struct AppError(#[from] pub PollError);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            PollError::Auth => StatusCode::UNAUTHORIZED,
            PollError::Validation(_) => StatusCode::BAD_REQUEST,
            PollError::NotFound => StatusCode::NOT_FOUND,
            PollError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = match &self.0 {
            PollError::Storage(e) => {
                error!("Storage failure: {e}");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
