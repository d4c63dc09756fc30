// handlers.rs
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::HeaderMap,
    Json,
};
use serde_json::{json, Value};

use crate::error::{AppError, PollError};
use crate::models::{integral_index, CreatePollRequest, CreatePollResponse, PollView, VoteRequest};
use crate::poll::PollService;

pub const ADMIN_KEY_HEADER: &str = "x-admin-key";

pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "MicroPolls API is running!",
        "status": "online"
    }))
}

/// Create a poll (admin only)
pub async fn create_poll(
    State(service): State<PollService>,
    headers: HeaderMap,
    payload: Result<Json<CreatePollRequest>, JsonRejection>,
) -> Result<Json<CreatePollResponse>, AppError> {
    let key = headers
        .get(ADMIN_KEY_HEADER)
        .and_then(|v| v.to_str().ok());

    // The key is checked before the body so a bad key is always a 401.
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            service.authorize(key)?;
            return Err(malformed(rejection));
        }
    };

    let poll = service
        .create_poll(key, request.question, request.options)
        .await?;

    Ok(Json(CreatePollResponse { id: poll.id }))
}

pub async fn get_poll(
    State(service): State<PollService>,
    Path(id): Path<String>,
) -> Result<Json<PollView>, AppError> {
    let poll = service.get_poll(&id).await?;
    Ok(Json(poll.into()))
}

pub async fn vote(
    State(service): State<PollService>,
    Path(id): Path<String>,
    payload: Result<Json<VoteRequest>, JsonRejection>,
) -> Result<Json<PollView>, AppError> {
    let Json(request) = payload.map_err(malformed)?;
    let option_index = request
        .option_index
        .map(|n| {
            integral_index(&n)
                .ok_or_else(|| PollError::Validation("Option index must be an integer".into()))
        })
        .transpose()?;

    let poll = service.cast_vote(&id, option_index).await?;
    Ok(Json(poll.into()))
}

fn malformed(rejection: JsonRejection) -> AppError {
    AppError(PollError::Validation(rejection.body_text()))
}
