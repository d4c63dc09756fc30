//! Poll persistence.
//!
//! `PollStore` is the seam between the service and whatever holds the
//! records. Two backends exist: `MemoryStore` for embedded use and tests,
//! and `PgStore` (see `db.rs`) for durable storage.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{NewPoll, Poll, PollOption};

pub type SharedStore = Arc<dyn PollStore>;

#[async_trait]
pub trait PollStore: Send + Sync {
    /// Persist a new poll with every counter at zero.
    async fn create(&self, poll: NewPoll) -> Result<Poll, StoreError>;

    async fn get(&self, id: Uuid) -> Result<Poll, StoreError>;

    /// Add exactly one vote to `options[index]` and return the record as it
    /// stands after the increment. An out-of-range index changes nothing.
    async fn increment_vote(&self, id: Uuid, index: usize) -> Result<Poll, StoreError>;

    /// Release backend resources on shutdown.
    async fn shutdown(&self) {}
}

/// Last-modified timestamp kept as epoch microseconds so the vote path
/// stays lock-free. Only ever moves forward.
struct UpdatedAt(AtomicI64);

impl UpdatedAt {
    fn new(at: DateTime<Utc>) -> Self {
        Self(AtomicI64::new(at.timestamp_micros()))
    }

    fn touch(&self, at: DateTime<Utc>) {
        self.0.fetch_max(at.timestamp_micros(), Ordering::AcqRel);
    }

    fn get(&self) -> DateTime<Utc> {
        let micros = self.0.load(Ordering::Acquire);
        DateTime::from_timestamp_micros(micros).unwrap_or_default()
    }
}

struct Entry {
    question: String,
    texts: Vec<String>,
    votes: Vec<AtomicU64>,
    created_at: DateTime<Utc>,
    updated_at: UpdatedAt,
}

impl Entry {
    fn snapshot(&self, id: Uuid) -> Poll {
        Poll {
            id,
            question: self.question.clone(),
            options: self
                .texts
                .iter()
                .zip(&self.votes)
                .map(|(text, votes)| PollOption {
                    text: text.clone(),
                    votes: votes.load(Ordering::Acquire),
                })
                .collect(),
            created_at: self.created_at,
            updated_at: self.updated_at.get(),
        }
    }
}

/// In-process store. Each option counter is its own atomic, so votes on
/// different options or different polls never wait on each other.
#[derive(Default)]
pub struct MemoryStore {
    polls: DashMap<Uuid, Arc<Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.polls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polls.is_empty()
    }

    fn entry(&self, id: Uuid) -> Result<Arc<Entry>, StoreError> {
        // Clone the Arc out so no shard lock is held while counting.
        self.polls
            .get(&id)
            .map(|e| Arc::clone(e.value()))
            .ok_or(StoreError::NotFound)
    }
}

#[async_trait]
impl PollStore for MemoryStore {
    async fn create(&self, poll: NewPoll) -> Result<Poll, StoreError> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let entry = Arc::new(Entry {
            question: poll.question,
            votes: poll.options.iter().map(|_| AtomicU64::new(0)).collect(),
            texts: poll.options,
            created_at: now,
            updated_at: UpdatedAt::new(now),
        });

        let snapshot = entry.snapshot(id);
        self.polls.insert(id, entry);
        Ok(snapshot)
    }

    async fn get(&self, id: Uuid) -> Result<Poll, StoreError> {
        Ok(self.entry(id)?.snapshot(id))
    }

    async fn increment_vote(&self, id: Uuid, index: usize) -> Result<Poll, StoreError> {
        let entry = self.entry(id)?;
        let counter = entry.votes.get(index).ok_or(StoreError::OptionOutOfRange)?;

        counter.fetch_add(1, Ordering::AcqRel);
        entry.updated_at.touch(Utc::now());

        Ok(entry.snapshot(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coffee_or_tea() -> NewPoll {
        NewPoll {
            question: "Coffee or tea?".to_string(),
            options: vec!["Coffee".to_string(), "Tea".to_string()],
        }
    }

    #[tokio::test]
    async fn create_starts_at_zero_and_reads_back() {
        let store = MemoryStore::new();
        let created = store.create(coffee_or_tea()).await.unwrap();

        assert!(created.options.iter().all(|o| o.votes == 0));
        assert_eq!(store.get(created.id).await.unwrap(), created);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn increment_touches_only_target_option() {
        let store = MemoryStore::new();
        let poll = store.create(coffee_or_tea()).await.unwrap();

        let updated = store.increment_vote(poll.id, 1).await.unwrap();
        assert_eq!(updated.options[0].votes, 0);
        assert_eq!(updated.options[1].votes, 1);
        assert!(updated.updated_at >= poll.updated_at);
        assert_eq!(updated.created_at, poll.created_at);
    }

    #[tokio::test]
    async fn out_of_range_index_changes_nothing() {
        let store = MemoryStore::new();
        let poll = store.create(coffee_or_tea()).await.unwrap();

        let err = store.increment_vote(poll.id, 2).await.unwrap_err();
        assert!(matches!(err, StoreError::OptionOutOfRange));
        assert_eq!(store.get(poll.id).await.unwrap().total_votes(), 0);
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.get(Uuid::new_v4()).await,
            Err(StoreError::NotFound)
        ));
        assert!(matches!(
            store.increment_vote(Uuid::new_v4(), 0).await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_increments_are_all_counted() {
        let store = Arc::new(MemoryStore::new());
        let poll = store.create(coffee_or_tea()).await.unwrap();

        let tasks: Vec<_> = (0..200)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.increment_vote(poll.id, i % 2).await })
            })
            .collect();

        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let poll = store.get(poll.id).await.unwrap();
        assert_eq!(poll.options[0].votes, 100);
        assert_eq!(poll.options[1].votes, 100);
    }
}
