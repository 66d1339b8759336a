// Queue Service - use cases for operating a waitlist
//
// Every mutation acquires the per-queue guard from the router, runs one
// store transaction, then hands off to the broadcaster/notifier/estimator
// as decoupled side effects. Reads never take the guard.

mod advance;
mod join;

pub use join::{JoinRequest, Joiner};

use crate::application::broadcaster::Broadcaster;
use crate::application::estimator::WaitEstimator;
use crate::application::notify::NotificationService;
use crate::application::router::QueueRouter;
use crate::domain::{
    DomainError, EntryId, PersonId, Queue, QueueEdit, QueueEntry, QueueId,
};
use crate::error::Result;
use crate::port::{
    CodeProvider, IdProvider, QueueStore, QueueUnit, TimeProvider, TransactionalQueueStore,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateQueueRequest {
    pub owner_id: PersonId,
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

/// What a prospective joiner sees after resolving a join code
#[derive(Debug, Clone, Serialize)]
pub struct QueueSummary {
    pub queue: Queue,
    pub estimated_wait_minutes: i64,
}

/// Live position of one entry, rank derived on read
#[derive(Debug, Clone, Serialize)]
pub struct PositionView {
    pub entry: QueueEntry,
    pub current_rank: Option<i64>,
    pub people_ahead: Option<i64>,
    pub estimated_wait_minutes: Option<i64>,
}

pub struct QueueService {
    store: Arc<dyn QueueStore>,
    tx_store: Arc<dyn TransactionalQueueStore>,
    router: Arc<QueueRouter>,
    estimator: Arc<WaitEstimator>,
    broadcaster: Arc<Broadcaster>,
    notifications: Arc<NotificationService>,
    id_provider: Arc<dyn IdProvider>,
    code_provider: Arc<dyn CodeProvider>,
    time_provider: Arc<dyn TimeProvider>,
}

impl QueueService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn QueueStore>,
        tx_store: Arc<dyn TransactionalQueueStore>,
        router: Arc<QueueRouter>,
        estimator: Arc<WaitEstimator>,
        broadcaster: Arc<Broadcaster>,
        notifications: Arc<NotificationService>,
        id_provider: Arc<dyn IdProvider>,
        code_provider: Arc<dyn CodeProvider>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            store,
            tx_store,
            router,
            estimator,
            broadcaster,
            notifications,
            id_provider,
            code_provider,
            time_provider,
        }
    }

    /// Create a queue with a fresh join code
    pub async fn create_queue(&self, req: CreateQueueRequest) -> Result<Queue> {
        if req.name.trim().is_empty() {
            return Err(DomainError::ValidationError(
                "Queue name must not be empty".to_string(),
            )
            .into());
        }

        let mut unit = self.tx_store.begin().await?;

        let owner = unit
            .find_person(&req.owner_id)
            .await?
            .ok_or_else(|| DomainError::PersonNotFound(req.owner_id.clone()))?;
        if owner.is_guest {
            return Err(DomainError::ValidationError(
                "Guest identities cannot own queues".to_string(),
            )
            .into());
        }

        let now = self.time_provider.now_millis();
        let queue = Queue::new(
            self.id_provider.generate_id(),
            owner.id,
            req.name.trim(),
            req.description,
            self.code_provider.generate_code(),
            req.max_capacity.unwrap_or(Queue::DEFAULT_CAPACITY).max(1),
            req.max_party_size.unwrap_or(Queue::DEFAULT_MAX_PARTY).max(1),
            req.est_service_minutes
                .unwrap_or(Queue::DEFAULT_SERVICE_MINUTES)
                .max(1),
            now,
        );

        unit.insert_queue(&queue).await?;
        unit.commit().await?;

        info!(queue_id = %queue.id, name = %queue.name, "Queue created");
        self.broadcaster.publish(&queue.id);
        Ok(queue)
    }

    /// Resolve a queue by join code. Only the code column is consulted, so
    /// identifiers cannot be enumerated through this path.
    pub async fn lookup(&self, code: &str) -> Result<QueueSummary> {
        let queue = self
            .store
            .find_queue_by_code(code)
            .await?
            .filter(|q| q.is_active)
            .ok_or_else(|| DomainError::QueueNotFound(code.to_string()))?;

        let estimated_wait_minutes = self
            .estimator
            .predict(&queue.id, queue.current_size)
            .await
            .unwrap_or(queue.current_size * queue.est_service_minutes);

        Ok(QueueSummary {
            queue,
            estimated_wait_minutes,
        })
    }

    /// Live position for one entry. Rank is derived by counting active
    /// entries at or ahead of its position, so it advances as people ahead
    /// leave, without ever renumbering.
    pub async fn position(&self, entry_id: &EntryId) -> Result<PositionView> {
        let entry = self
            .store
            .find_entry(entry_id)
            .await?
            .ok_or_else(|| DomainError::EntryNotFound(entry_id.clone()))?;

        if entry.status.is_terminal() {
            return Ok(PositionView {
                entry,
                current_rank: None,
                people_ahead: None,
                estimated_wait_minutes: None,
            });
        }

        let active = self.store.active_entries(&entry.queue_id).await?;
        let rank = active
            .iter()
            .filter(|e| e.position_number <= entry.position_number)
            .count() as i64;
        let people_ahead = rank - 1;

        let estimated_wait_minutes = self
            .estimator
            .predict(&entry.queue_id, people_ahead)
            .await
            .ok();

        Ok(PositionView {
            entry,
            current_rank: Some(rank),
            people_ahead: Some(people_ahead),
            estimated_wait_minutes,
        })
    }

    /// Operator edit of name/capacity/status and friends. Never evicts
    /// entries already waiting.
    pub async fn edit(&self, queue_id: &QueueId, edit: QueueEdit) -> Result<Queue> {
        let _guard = self.router.guard(queue_id).await?;
        let mut unit = self.tx_store.begin().await?;

        let mut queue = unit
            .load_queue(queue_id)
            .await?
            .ok_or_else(|| DomainError::QueueNotFound(queue_id.clone()))?;

        queue.apply_edit(edit, self.time_provider.now_millis())?;
        unit.update_queue(&queue).await?;
        unit.commit().await?;

        self.broadcaster.publish(queue_id);
        Ok(queue)
    }

    /// Close and soft-delete a queue. Idempotent.
    pub async fn close(&self, queue_id: &QueueId) -> Result<()> {
        let _guard = self.router.guard(queue_id).await?;
        let mut unit = self.tx_store.begin().await?;

        let mut queue = unit
            .load_queue(queue_id)
            .await?
            .ok_or_else(|| DomainError::QueueNotFound(queue_id.clone()))?;

        queue.close(self.time_provider.now_millis());
        unit.update_queue(&queue).await?;
        unit.commit().await?;

        info!(queue_id = %queue_id, "Queue closed");
        self.broadcaster.publish(queue_id);
        Ok(())
    }

    /// Record that a called person confirmed presence. Annotation only.
    pub async fn mark_arrived(&self, queue_id: &QueueId, entry_id: &EntryId) -> Result<()> {
        let _guard = self.router.guard(queue_id).await?;
        let mut unit = self.tx_store.begin().await?;

        let mut entry = unit
            .find_entry(entry_id)
            .await?
            .ok_or_else(|| DomainError::EntryNotFound(entry_id.clone()))?;
        if entry.queue_id != *queue_id {
            return Err(DomainError::WrongQueue {
                entry_id: entry_id.clone(),
                queue_id: queue_id.clone(),
            }
            .into());
        }

        entry.mark_arrived(self.time_provider.now_millis())?;
        unit.update_entry(&entry).await?;
        unit.commit().await?;

        self.broadcaster.publish(queue_id);
        Ok(())
    }

    pub async fn list_open(&self) -> Result<Vec<Queue>> {
        self.store.list_open_queues().await
    }

    pub async fn search(&self, term: &str) -> Result<Vec<Queue>> {
        self.store.search_queues(term).await
    }

    pub async fn queues_by_owner(&self, owner_id: &PersonId) -> Result<Vec<Queue>> {
        self.store.list_queues_by_owner(owner_id).await
    }

    pub(crate) async fn begin(&self) -> Result<Box<dyn QueueUnit>> {
        self.tx_store.begin().await
    }
}
