// src/db.rs
//! Postgres-backed poll store.
//!
//! Layout: one `polls` row per poll, one `poll_options` row per option keyed
//! by `(poll_id, position)`. Votes are counted with an in-place
//! `votes = votes + 1`, so concurrent voters never overwrite each other.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::info;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{NewPoll, Poll, PollOption};
use crate::store::PollStore;

pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

#[derive(sqlx::FromRow)]
struct PollRow {
    id: Uuid,
    question: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct OptionRow {
    text: String,
    votes: i64,
}

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect and bring the schema up to date.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = create_pool(database_url, max_connections).await?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::Database(e.into()))?;

        info!("Connected to Postgres");
        Ok(Self { pool })
    }

    async fn load(tx: &mut Transaction<'_, Postgres>, id: Uuid) -> Result<Poll, StoreError> {
        let row = sqlx::query_as::<_, PollRow>(
            "SELECT id, question, created_at, updated_at FROM polls WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(StoreError::NotFound)?;

        let options = sqlx::query_as::<_, OptionRow>(
            "SELECT text, votes FROM poll_options WHERE poll_id = $1 ORDER BY position",
        )
        .bind(id)
        .fetch_all(&mut **tx)
        .await?;

        into_poll(row, options)
    }
}

fn into_poll(row: PollRow, options: Vec<OptionRow>) -> Result<Poll, StoreError> {
    let options = options
        .into_iter()
        .map(|o| {
            let votes = u64::try_from(o.votes)
                .map_err(|_| StoreError::Corrupt(format!("negative vote count on poll {}", row.id)))?;
            Ok(PollOption { text: o.text, votes })
        })
        .collect::<Result<Vec<_>, StoreError>>()?;

    Ok(Poll {
        id: row.id,
        question: row.question,
        options,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

#[async_trait]
impl PollStore for PgStore {
    async fn create(&self, poll: NewPoll) -> Result<Poll, StoreError> {
        let id = Uuid::new_v4();
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO polls (id, question) VALUES ($1, $2)")
            .bind(id)
            .bind(&poll.question)
            .execute(&mut *tx)
            .await?;

        for (position, text) in poll.options.iter().enumerate() {
            sqlx::query(
                "INSERT INTO poll_options (poll_id, position, text, votes) VALUES ($1, $2, $3, 0)",
            )
            .bind(id)
            .bind(position as i32)
            .bind(text)
            .execute(&mut *tx)
            .await?;
        }

        let created = Self::load(&mut tx, id).await?;
        tx.commit().await?;
        Ok(created)
    }

    async fn get(&self, id: Uuid) -> Result<Poll, StoreError> {
        let mut tx = self.pool.begin().await?;
        let poll = Self::load(&mut tx, id).await?;
        tx.commit().await?;
        Ok(poll)
    }

    async fn increment_vote(&self, id: Uuid, index: usize) -> Result<Poll, StoreError> {
        let position = i32::try_from(index).map_err(|_| StoreError::OptionOutOfRange)?;
        let mut tx = self.pool.begin().await?;

        let counted = sqlx::query_scalar::<_, i64>(
            "UPDATE poll_options SET votes = votes + 1 \
             WHERE poll_id = $1 AND position = $2 RETURNING votes",
        )
        .bind(id)
        .bind(position)
        .fetch_optional(&mut *tx)
        .await?;

        if counted.is_none() {
            let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM polls WHERE id = $1)")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;
            tx.rollback().await?;
            return Err(if exists {
                StoreError::OptionOutOfRange
            } else {
                StoreError::NotFound
            });
        }

        sqlx::query("UPDATE polls SET updated_at = now() WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let poll = Self::load(&mut tx, id).await?;
        tx.commit().await?;
        Ok(poll)
    }

    async fn shutdown(&self) {
        self.pool.close().await;
        info!("Postgres pool closed");
    }
}
