// Queue History - append-only summary rows for concluded entries
// Written once in the concluding transaction; never mutated. The estimator
// reads the Completed rows to infer service velocity.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HistoryStatus {
    Completed,
    Cancelled,
    NoShow,
}

impl std::fmt::Display for HistoryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HistoryStatus::Completed => write!(f, "COMPLETED"),
            HistoryStatus::Cancelled => write!(f, "CANCELLED"),
            HistoryStatus::NoShow => write!(f, "NO_SHOW"),
        }
    }
}

impl std::str::FromStr for HistoryStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "COMPLETED" => Ok(HistoryStatus::Completed),
            "CANCELLED" => Ok(HistoryStatus::Cancelled),
            "NO_SHOW" => Ok(HistoryStatus::NoShow),
            other => Err(format!("Unknown history status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: String,
    pub queue_id: String,
    pub person_id: String,
    pub entry_id: String,

    pub joined_at: i64, // epoch ms
    /// Set only for Completed rows
    pub served_at: Option<i64>,
    pub wait_minutes: i64,
    pub status: HistoryStatus,
    pub recorded_at: i64,
}

impl HistoryRecord {
    /// Build the summary row for an entry that just concluded
    pub fn conclude(
        id: impl Into<String>,
        entry: &crate::domain::QueueEntry,
        status: HistoryStatus,
        now_millis: i64,
    ) -> Self {
        Self {
            id: id.into(),
            queue_id: entry.queue_id.clone(),
            person_id: entry.person_id.clone(),
            entry_id: entry.id.clone(),
            joined_at: entry.joined_at,
            served_at: match status {
                HistoryStatus::Completed => entry.served_at,
                _ => None,
            },
            wait_minutes: entry.wait_minutes(now_millis),
            status,
            recorded_at: now_millis,
        }
    }
}
