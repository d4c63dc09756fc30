// src/poll.rs
use std::future::Future;
use std::time::Duration;

use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{PollError, StoreError};
use crate::models::{NewPoll, Poll, MAX_OPTIONS, MIN_OPTIONS};
use crate::store::SharedStore;

/// Validation and authorization in front of the store. Holds no state of
/// its own beyond configuration, so it is cheap to clone per request.
#[derive(Clone)]
pub struct PollService {
    store: SharedStore,
    admin_key: String,
    timeout: Duration,
}

impl PollService {
    pub fn new(store: SharedStore, admin_key: impl Into<String>, timeout: Duration) -> Self {
        Self {
            store,
            admin_key: admin_key.into(),
            timeout,
        }
    }

    pub fn authorize(&self, provided: Option<&str>) -> Result<(), PollError> {
        match provided {
            Some(key) if keys_match(key.as_bytes(), self.admin_key.as_bytes()) => Ok(()),
            _ => {
                warn!("Rejected poll creation with invalid admin key");
                Err(PollError::Auth)
            }
        }
    }

    pub async fn create_poll(
        &self,
        provided_key: Option<&str>,
        question: Option<String>,
        options: Option<Vec<String>>,
    ) -> Result<Poll, PollError> {
        self.authorize(provided_key)?;
        let new_poll = validate_new_poll(question, options)?;

        let poll = self.with_timeout(self.store.create(new_poll)).await?;
        info!(poll_id = %poll.id, options = poll.options.len(), "Poll created");
        Ok(poll)
    }

    pub async fn get_poll(&self, id: &str) -> Result<Poll, PollError> {
        let id = parse_id(id)?;
        Ok(self.with_timeout(self.store.get(id)).await?)
    }

    pub async fn cast_vote(&self, id: &str, option_index: Option<i64>) -> Result<Poll, PollError> {
        let option_index =
            option_index.ok_or_else(|| PollError::Validation("Option index required".into()))?;

        let id = parse_id(id)?;

        // Bounds read and increment share one deadline.
        self.with_timeout(async {
            let poll = self.store.get(id).await?;

            let index = usize::try_from(option_index)
                .ok()
                .filter(|&i| i < poll.options.len())
                .ok_or_else(|| PollError::Validation("Invalid option index".into()))?;

            Ok::<_, PollError>(self.store.increment_vote(id, index).await?)
        })
        .await
    }

    async fn with_timeout<T, E: From<StoreError>>(
        &self,
        call: impl Future<Output = Result<T, E>>,
    ) -> Result<T, E> {
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| E::from(StoreError::Timeout))?
    }
}

/// Ids are UUIDs; anything that does not parse cannot name a poll.
fn parse_id(id: &str) -> Result<Uuid, PollError> {
    Uuid::parse_str(id).map_err(|_| PollError::NotFound)
}

pub fn validate_new_poll(
    question: Option<String>,
    options: Option<Vec<String>>,
) -> Result<NewPoll, PollError> {
    let invalid = || PollError::Validation(format!("Question and {MIN_OPTIONS}-{MAX_OPTIONS} options required"));

    let question = question
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty())
        .ok_or_else(invalid)?;

    let options = options.ok_or_else(invalid)?;
    if !(MIN_OPTIONS..=MAX_OPTIONS).contains(&options.len()) {
        return Err(invalid());
    }

    let options: Vec<String> = options.iter().map(|o| o.trim().to_string()).collect();
    if options.iter().any(|o| o.is_empty()) {
        return Err(PollError::Validation("Option text must not be empty".into()));
    }

    Ok(NewPoll { question, options })
}

/// Comparison whose running time depends only on the lengths.
fn keys_match(provided: &[u8], expected: &[u8]) -> bool {
    if provided.len() != expected.len() {
        return false;
    }
    provided
        .iter()
        .zip(expected)
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}
