//! MicroPolls backend: publish a poll, collect anonymous votes, read live tallies.
//!
//! Requests flow handler -> [`poll::PollService`] -> [`store::PollStore`].
//! The service owns validation and the admin-key check; the store owns
//! the records and makes each vote a single atomic increment.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod poll;
pub mod routes;
pub mod store;
