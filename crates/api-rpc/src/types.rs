//! RPC Request/Response Types
//!
//! Defines the JSON-RPC method parameters and results.

use serde::{Deserialize, Serialize};
use waitline_core::application::queue_service::Joiner;
use waitline_core::domain::{NotificationPreference, Queue, QueueEntry, QueueStatus};

/// queue.create.v1 - Create a queue with a fresh join code
#[derive(Debug, Deserialize)]
pub struct CreateQueueRpcRequest {
    pub owner_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub max_capacity: Option<i64>,
    #[serde(default)]
    pub max_party_size: Option<i64>,
    #[serde(default)]
    pub est_service_minutes: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateQueueResponse {
    pub queue_id: String,
    pub join_code: String,
}

/// queue.lookup.v1 - Resolve a queue by join code
#[derive(Debug, Deserialize)]
pub struct LookupRequest {
    pub code: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueueView {
    pub queue_id: String,
    pub name: String,
    pub description: Option<String>,
    pub status: QueueStatus,
    pub current_size: i64,
    pub max_capacity: i64,
    pub max_party_size: i64,
    pub total_served_today: i64,
}

impl From<Queue> for QueueView {
    fn from(q: Queue) -> Self {
        Self {
            queue_id: q.id,
            name: q.name,
            description: q.description,
            status: q.status,
            current_size: q.current_size,
            max_capacity: q.max_capacity,
            max_party_size: q.max_party_size,
            total_served_today: q.total_served_today,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LookupResponse {
    #[serde(flatten)]
    pub queue: QueueView,
    pub estimated_wait_minutes: i64,
}

/// queue.join.v1 - Join a queue
#[derive(Debug, Deserialize)]
pub struct JoinRpcRequest {
    pub queue_id: String,
    #[serde(default = "default_party_size")]
    pub party_size: i64,
    pub notification_preference: NotificationPreference,
    pub joiner: Joiner,
}

fn default_party_size() -> i64 {
    1
}

#[derive(Debug, Clone, Serialize)]
pub struct JoinResponse {
    pub entry_id: String,
    pub position_number: i64,
    pub estimated_wait_minutes: i64,
}

impl From<QueueEntry> for JoinResponse {
    fn from(e: QueueEntry) -> Self {
        Self {
            entry_id: e.id,
            position_number: e.position_number,
            estimated_wait_minutes: e.estimated_wait_minutes,
        }
    }
}

/// queue.position.v1 - Live position for an entry
#[derive(Debug, Deserialize)]
pub struct PositionRequest {
    pub entry_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PositionResponse {
    pub entry_id: String,
    pub status: String,
    pub current_rank: Option<i64>,
    pub people_ahead: Option<i64>,
    pub estimated_wait_minutes: Option<i64>,
}

/// queue.call_next.v1 - Call the front of the line
#[derive(Debug, Deserialize)]
pub struct CallNextRequest {
    pub queue_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CallNextResponse {
    pub entry_id: String,
    pub person_id: String,
    pub position_number: i64,
}

/// queue.serve.v1 / queue.no_show.v1 / queue.arrived.v1
#[derive(Debug, Deserialize)]
pub struct EntryActionRequest {
    pub queue_id: String,
    pub entry_id: String,
}

/// queue.leave.v1
#[derive(Debug, Deserialize)]
pub struct LeaveRequest {
    pub entry_id: String,
}

/// queue.edit.v1 - Owner edits
#[derive(Debug, Deserialize)]
pub struct EditRpcRequest {
    pub queue_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<QueueStatus>,
    #[serde(default)]
    pub max_capacity: Option<i64>,
    #[serde(default)]
    pub max_party_size: Option<i64>,
    #[serde(default)]
    pub est_service_minutes: Option<i64>,
}

/// queue.close.v1
#[derive(Debug, Deserialize)]
pub struct CloseRequest {
    pub queue_id: String,
}

/// Generic acknowledgement
#[derive(Debug, Clone, Serialize)]
pub struct AckResponse {
    pub ok: bool,
}

impl AckResponse {
    pub fn ok() -> Self {
        Self { ok: true }
    }
}

/// queue.search.v1
#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub term: String,
}

/// queue.by_owner.v1
#[derive(Debug, Deserialize)]
pub struct OwnerQueuesRequest {
    pub owner_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueueListResponse {
    pub queues: Vec<QueueView>,
}

/// queue.subscribe.v1 - per-queue events; omit queue_id for the global feed
#[derive(Debug, Default, Deserialize)]
pub struct SubscribeRequest {
    #[serde(default)]
    pub queue_id: Option<String>,
}
