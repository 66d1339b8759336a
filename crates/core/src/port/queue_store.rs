// Queue Store Port (Interface)
//
// Reads are concurrent and lock-free. Mutations happen through a QueueUnit,
// one transaction per accepted operation, opened while the caller holds the
// per-queue guard.

use crate::domain::{
    EntryId, HistoryRecord, NotificationRecord, NotificationStatus, Person, PersonId, Queue,
    QueueEntry, QueueId,
};
use crate::error::Result;
use async_trait::async_trait;

/// Lock-free read operations against the persistent store
#[async_trait]
pub trait QueueStore: Send + Sync {
    async fn find_queue(&self, id: &QueueId) -> Result<Option<Queue>>;

    /// Resolve a queue by its opaque join code. Matches only the code
    /// column; ids are never accepted through this path.
    async fn find_queue_by_code(&self, code: &str) -> Result<Option<Queue>>;

    async fn find_entry(&self, id: &EntryId) -> Result<Option<QueueEntry>>;

    async fn find_person(&self, id: &PersonId) -> Result<Option<Person>>;

    /// Active (Waiting/Notified) entries of a queue, ascending by position
    async fn active_entries(&self, queue_id: &QueueId) -> Result<Vec<QueueEntry>>;

    /// Waiting entries of a queue, ascending by position
    async fn waiting_entries(&self, queue_id: &QueueId) -> Result<Vec<QueueEntry>>;

    /// Most recent Completed history rows, newest first
    async fn recent_completions(&self, queue_id: &QueueId, limit: i64)
        -> Result<Vec<HistoryRecord>>;

    /// Overwrite the cached wait estimate of one entry (idempotent)
    async fn update_entry_estimate(&self, entry_id: &EntryId, minutes: i64) -> Result<()>;

    async fn insert_notification(&self, record: &NotificationRecord) -> Result<()>;

    async fn update_notification_status(
        &self,
        id: &str,
        status: NotificationStatus,
        sent_at: Option<i64>,
    ) -> Result<()>;

    /// Open (Active, not soft-deleted) queues, for the global listing
    async fn list_open_queues(&self) -> Result<Vec<Queue>>;

    /// All queues belonging to an owner, including paused/closed
    async fn list_queues_by_owner(&self, owner_id: &PersonId) -> Result<Vec<Queue>>;

    /// Open queues whose name contains the term (case-insensitive)
    async fn search_queues(&self, term: &str) -> Result<Vec<Queue>>;

    /// Delete all guest persons with no remaining active entries.
    /// Returns the number purged. Used by the background sweeper.
    async fn purge_idle_guests(&self) -> Result<u64>;
}

/// Transaction handle
#[async_trait]
pub trait Transaction: Send {
    async fn commit(self: Box<Self>) -> Result<()>;

    async fn rollback(self: Box<Self>) -> Result<()>;
}

/// Mutations executed as one atomic unit. Either the entry/queue state
/// change and its counter update both land, or neither does.
#[async_trait]
pub trait QueueUnit: Transaction {
    async fn load_queue(&mut self, id: &QueueId) -> Result<Option<Queue>>;

    /// Active entries of a queue, ascending by position (within transaction)
    async fn active_entries(&mut self, queue_id: &QueueId) -> Result<Vec<QueueEntry>>;

    async fn find_entry(&mut self, id: &EntryId) -> Result<Option<QueueEntry>>;

    async fn find_person(&mut self, id: &PersonId) -> Result<Option<Person>>;

    async fn find_person_by_email(&mut self, email: &str) -> Result<Option<Person>>;

    async fn insert_person(&mut self, person: &Person) -> Result<()>;

    async fn insert_queue(&mut self, queue: &Queue) -> Result<()>;

    /// Persist queue fields and counters
    async fn update_queue(&mut self, queue: &Queue) -> Result<()>;

    async fn insert_entry(&mut self, entry: &QueueEntry) -> Result<()>;

    async fn update_entry(&mut self, entry: &QueueEntry) -> Result<()>;

    async fn insert_history(&mut self, record: &HistoryRecord) -> Result<()>;

    /// Remove a guest person iff they hold no active entries. The check and
    /// delete are a single statement, so a concurrent join reusing the same
    /// identity cannot be left dangling. Returns true if a row was removed.
    async fn delete_guest_if_idle(&mut self, person_id: &PersonId) -> Result<bool>;
}

/// Entry point for transactional mutation units
#[async_trait]
pub trait TransactionalQueueStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn QueueUnit>>;
}
