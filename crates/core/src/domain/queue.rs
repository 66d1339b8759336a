// Queue Aggregate - capacity, status and counters for one waitlist

use crate::domain::entry::QueueEntry;
use crate::domain::error::{DomainError, Result};
use serde::{Deserialize, Serialize};

/// Queue ID (UUID v4)
pub type QueueId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueueStatus {
    Active,
    Paused,
    Closed,
}

impl std::fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueueStatus::Active => write!(f, "ACTIVE"),
            QueueStatus::Paused => write!(f, "PAUSED"),
            QueueStatus::Closed => write!(f, "CLOSED"),
        }
    }
}

impl std::str::FromStr for QueueStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(QueueStatus::Active),
            "PAUSED" => Ok(QueueStatus::Paused),
            "CLOSED" => Ok(QueueStatus::Closed),
            other => Err(format!("Unknown queue status: {}", other)),
        }
    }
}

/// Queue Entity
///
/// `current_size` is a derived invariant: it must equal the count of entries
/// in Waiting or Notified at all times after a mutation completes. Mutations
/// go through the aggregate methods below, under the per-queue guard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Queue {
    pub id: QueueId,
    pub owner_id: String,
    pub name: String,
    pub description: Option<String>,

    /// Opaque unique code bound 1:1 to the queue at creation, immutable
    pub join_code: String,

    pub status: QueueStatus,
    pub max_capacity: i64,
    pub max_party_size: i64,
    pub est_service_minutes: i64,

    pub current_size: i64,
    pub total_served_today: i64,

    pub created_at: i64, // epoch ms
    pub updated_at: i64,

    /// Soft-delete flag
    pub is_active: bool,
}

/// Owner-editable fields. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueueEdit {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<QueueStatus>,
    pub max_capacity: Option<i64>,
    pub max_party_size: Option<i64>,
    pub est_service_minutes: Option<i64>,
}

impl Queue {
    pub const DEFAULT_CAPACITY: i64 = 100;
    pub const DEFAULT_MAX_PARTY: i64 = 1;
    pub const DEFAULT_SERVICE_MINUTES: i64 = 5;

    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: impl Into<String>,
        owner_id: impl Into<String>,
        name: impl Into<String>,
        description: Option<String>,
        join_code: impl Into<String>,
        max_capacity: i64,
        max_party_size: i64,
        est_service_minutes: i64,
        created_at: i64,
    ) -> Self {
        Self {
            id: id.into(),
            owner_id: owner_id.into(),
            name: name.into(),
            description,
            join_code: join_code.into(),
            status: QueueStatus::Active,
            max_capacity,
            max_party_size,
            est_service_minutes,
            current_size: 0,
            total_served_today: 0,
            created_at,
            updated_at: created_at,
            is_active: true,
        }
    }

    /// Gate checks for a join attempt. Evaluated under the per-queue guard,
    /// in the same transaction as the insert, so the capacity read cannot
    /// go stale.
    pub fn check_join(&self, party_size: i64) -> Result<()> {
        if !self.is_active || self.status != QueueStatus::Active {
            let why = if self.is_active {
                self.status.to_string()
            } else {
                "DELETED".to_string()
            };
            return Err(DomainError::QueueInactive(self.id.clone(), why));
        }
        if party_size < 1 || party_size > self.max_party_size {
            return Err(DomainError::InvalidPartySize {
                given: party_size,
                max: self.max_party_size,
            });
        }
        if self.current_size >= self.max_capacity {
            return Err(DomainError::QueueAtCapacity {
                queue_id: self.id.clone(),
                capacity: self.max_capacity,
            });
        }
        Ok(())
    }

    /// Next position number: max position among active entries + 1, or 1.
    /// Positions are never reused, so a leaver's slot stays retired.
    pub fn next_position(&self, active_entries: &[QueueEntry]) -> i64 {
        active_entries
            .iter()
            .filter(|e| e.status.is_active())
            .map(|e| e.position_number)
            .max()
            .unwrap_or(0)
            + 1
    }

    /// An entry became active (join)
    pub fn entry_joined(&mut self, now_millis: i64) {
        self.current_size += 1;
        self.updated_at = now_millis;
    }

    /// An active entry was served
    pub fn entry_served(&mut self, now_millis: i64) {
        self.current_size -= 1;
        self.total_served_today += 1;
        self.updated_at = now_millis;
    }

    /// An active entry left without being served (cancel / no-show)
    pub fn entry_departed(&mut self, now_millis: i64) {
        self.current_size -= 1;
        self.updated_at = now_millis;
    }

    /// Apply owner edits. Never retroactively evicts over-capacity entries
    /// already waiting.
    pub fn apply_edit(&mut self, edit: QueueEdit, now_millis: i64) -> Result<()> {
        if let Some(name) = edit.name {
            if name.trim().is_empty() {
                return Err(DomainError::ValidationError(
                    "Queue name must not be empty".to_string(),
                ));
            }
            self.name = name;
        }
        if let Some(description) = edit.description {
            self.description = Some(description);
        }
        if let Some(status) = edit.status {
            self.status = status;
        }
        if let Some(capacity) = edit.max_capacity {
            if capacity < 1 {
                return Err(DomainError::ValidationError(
                    "Capacity must be at least 1".to_string(),
                ));
            }
            self.max_capacity = capacity;
        }
        if let Some(max_party) = edit.max_party_size {
            if max_party < 1 {
                return Err(DomainError::ValidationError(
                    "Max party size must be at least 1".to_string(),
                ));
            }
            self.max_party_size = max_party;
        }
        if let Some(minutes) = edit.est_service_minutes {
            if minutes < 1 {
                return Err(DomainError::ValidationError(
                    "Estimated service minutes must be at least 1".to_string(),
                ));
            }
            self.est_service_minutes = minutes;
        }
        self.updated_at = now_millis;
        Ok(())
    }

    /// Close and soft-delete. Idempotent.
    pub fn close(&mut self, now_millis: i64) {
        if self.status == QueueStatus::Closed && !self.is_active {
            return;
        }
        self.status = QueueStatus::Closed;
        self.is_active = false;
        self.updated_at = now_millis;
    }
}
