// models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Number;
use uuid::Uuid;

pub const MIN_OPTIONS: usize = 2;
pub const MAX_OPTIONS: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollOption {
    pub text: String,
    pub votes: u64,
}

/// A question with a fixed, ordered set of options. Only the vote counters
/// change after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Poll {
    pub id: Uuid,
    pub question: String,
    pub options: Vec<PollOption>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Poll {
    pub fn total_votes(&self) -> u64 {
        self.options.iter().map(|o| o.votes).sum()
    }

    /// Share of the total for each option, in percent with one decimal.
    pub fn percentages(&self) -> Vec<f64> {
        let total = self.total_votes();
        self.options
            .iter()
            .map(|o| percentage(o.votes, total))
            .collect()
    }
}

pub fn percentage(votes: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let raw = votes as f64 / total as f64 * 100.0;
    (raw * 10.0).round() / 10.0
}

/// Validated input for a new poll.
#[derive(Debug, Clone)]
pub struct NewPoll {
    pub question: String,
    pub options: Vec<String>,
}

// Wire types

#[derive(Debug, Deserialize)]
pub struct CreatePollRequest {
    pub question: Option<String>,
    pub options: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct CreatePollResponse {
    pub id: Uuid,
}

/// Any JSON number is accepted on the wire; whether it names an option is
/// decided by [`integral_index`] and the service.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub option_index: Option<Number>,
}

/// Integer value of a JSON number, so `1` and `1.0` both name option 1.
/// Fractional numbers have none. Integral floats too large for `i64`
/// saturate and are later rejected as out of range.
pub fn integral_index(n: &Number) -> Option<i64> {
    if let Some(i) = n.as_i64() {
        return Some(i);
    }
    if n.is_u64() {
        return Some(i64::MAX);
    }
    n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)
}

#[derive(Debug, Serialize)]
pub struct OptionView {
    pub text: String,
    pub votes: u64,
    pub percentage: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollView {
    pub id: Uuid,
    pub question: String,
    pub options: Vec<OptionView>,
    pub total_votes: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Poll> for PollView {
    fn from(poll: Poll) -> Self {
        let total_votes = poll.total_votes();
        let percentages = poll.percentages();
        let options = poll
            .options
            .into_iter()
            .zip(percentages)
            .map(|(o, percentage)| OptionView {
                text: o.text,
                votes: o.votes,
                percentage,
            })
            .collect();

        Self {
            id: poll.id,
            question: poll.question,
            options,
            total_votes,
            created_at: poll.created_at,
            updated_at: poll.updated_at,
        }
    }
}
