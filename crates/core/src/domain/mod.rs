// Domain Layer - Entities and invariants

pub mod entry;
pub mod error;
pub mod history;
pub mod notification;
pub mod person;
pub mod queue;

// Re-exports
pub use entry::{EntryId, EntryStatus, NotificationPreference, QueueEntry};
pub use error::DomainError;
pub use history::{HistoryRecord, HistoryStatus};
pub use notification::{
    NotificationChannel, NotificationKind, NotificationRecord, NotificationStatus,
};
pub use person::{Person, PersonId};
pub use queue::{Queue, QueueEdit, QueueId, QueueStatus};
