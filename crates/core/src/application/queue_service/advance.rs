// Advancing the line: call-next, serve, no-show, leave
//
// Each operation mutates under the per-queue guard, then spawns the
// notifier/estimator follow-ups outside it so their latency or failure
// never gates the transition.

use super::QueueService;
use crate::domain::{
    DomainError, EntryId, EntryStatus, HistoryRecord, HistoryStatus, PersonId, QueueEntry,
    QueueId,
};
use crate::error::Result;
use crate::port::QueueUnit;
use std::sync::Arc;
use tracing::{debug, info};

/// Side effects to run after a committed transition
struct FollowUps {
    /// Send the "it's your turn" message to this entry
    called: Option<QueueEntry>,
    /// Send position updates to the nearest Waiting entries
    top_of_line: bool,
}

impl QueueService {
    /// Call the Waiting entry with the smallest position to the front.
    /// FIFO, no reordering, no priorities.
    pub async fn call_next(&self, queue_id: &QueueId) -> Result<QueueEntry> {
        let _guard = self.router.guard(queue_id).await?;
        let mut unit = self.begin().await?;

        let mut queue = unit
            .load_queue(queue_id)
            .await?
            .ok_or_else(|| DomainError::QueueNotFound(queue_id.clone()))?;

        let active = unit.active_entries(queue_id).await?;
        let mut entry = active
            .into_iter()
            .filter(|e| e.status == EntryStatus::Waiting)
            .min_by_key(|e| e.position_number)
            .ok_or_else(|| DomainError::NoOneWaiting(queue_id.clone()))?;

        let now = self.time_provider.now_millis();
        entry.notify(now)?;
        unit.update_entry(&entry).await?;

        // Still counted as active; only the timestamp moves
        queue.updated_at = now;
        unit.update_queue(&queue).await?;
        unit.commit().await?;

        info!(
            queue_id = %queue_id,
            entry_id = %entry.id,
            position = entry.position_number,
            "Called next in line"
        );
        self.broadcaster.publish(queue_id);
        self.spawn_follow_ups(
            queue_id.clone(),
            FollowUps {
                called: Some(entry.clone()),
                top_of_line: true,
            },
        );
        Ok(entry)
    }

    /// Conclude an entry as served, keeping counters and history in step.
    pub async fn mark_served(&self, queue_id: &QueueId, entry_id: &EntryId) -> Result<()> {
        let _guard = self.router.guard(queue_id).await?;
        let mut unit = self.begin().await?;

        let mut queue = unit
            .load_queue(queue_id)
            .await?
            .ok_or_else(|| DomainError::QueueNotFound(queue_id.clone()))?;
        let mut entry = self.entry_in_queue(&mut unit, queue_id, entry_id).await?;

        let now = self.time_provider.now_millis();
        entry.serve(now)?;
        unit.update_entry(&entry).await?;

        queue.entry_served(now);
        unit.update_queue(&queue).await?;

        let history = HistoryRecord::conclude(
            self.id_provider.generate_id(),
            &entry,
            HistoryStatus::Completed,
            now,
        );
        unit.insert_history(&history).await?;

        self.purge_guest_if_idle(&mut unit, &entry.person_id).await?;
        unit.commit().await?;

        info!(
            queue_id = %queue_id,
            entry_id = %entry_id,
            served_today = queue.total_served_today,
            "Entry served"
        );
        self.broadcaster.publish(queue_id);
        self.spawn_follow_ups(
            queue_id.clone(),
            FollowUps {
                called: None,
                top_of_line: true,
            },
        );
        Ok(())
    }

    /// Conclude a Notified entry that never showed up.
    pub async fn mark_no_show(&self, queue_id: &QueueId, entry_id: &EntryId) -> Result<()> {
        let _guard = self.router.guard(queue_id).await?;
        let mut unit = self.begin().await?;

        let mut queue = unit
            .load_queue(queue_id)
            .await?
            .ok_or_else(|| DomainError::QueueNotFound(queue_id.clone()))?;
        let mut entry = self.entry_in_queue(&mut unit, queue_id, entry_id).await?;

        let now = self.time_provider.now_millis();
        entry.no_show()?;
        unit.update_entry(&entry).await?;

        queue.entry_departed(now);
        unit.update_queue(&queue).await?;

        let history = HistoryRecord::conclude(
            self.id_provider.generate_id(),
            &entry,
            HistoryStatus::NoShow,
            now,
        );
        unit.insert_history(&history).await?;

        self.purge_guest_if_idle(&mut unit, &entry.person_id).await?;
        unit.commit().await?;

        info!(queue_id = %queue_id, entry_id = %entry_id, "Entry marked no-show");
        self.broadcaster.publish(queue_id);
        self.spawn_follow_ups(
            queue_id.clone(),
            FollowUps {
                called: None,
                top_of_line: false,
            },
        );
        Ok(())
    }

    /// A person leaves the line (Waiting or Notified).
    pub async fn leave(&self, entry_id: &EntryId) -> Result<()> {
        // Locate the queue first; the guard is keyed on it
        let existing = self
            .store
            .find_entry(entry_id)
            .await?
            .ok_or_else(|| DomainError::EntryNotFound(entry_id.clone()))?;
        let queue_id = existing.queue_id.clone();

        let _guard = self.router.guard(&queue_id).await?;
        let mut unit = self.begin().await?;

        let mut queue = unit
            .load_queue(&queue_id)
            .await?
            .ok_or_else(|| DomainError::QueueNotFound(queue_id.clone()))?;
        // Re-read under the guard; the earlier snapshot may be stale
        let mut entry = unit
            .find_entry(entry_id)
            .await?
            .ok_or_else(|| DomainError::EntryNotFound(entry_id.clone()))?;

        entry.cancel()?;
        unit.update_entry(&entry).await?;

        let now = self.time_provider.now_millis();
        queue.entry_departed(now);
        unit.update_queue(&queue).await?;

        let history = HistoryRecord::conclude(
            self.id_provider.generate_id(),
            &entry,
            HistoryStatus::Cancelled,
            now,
        );
        unit.insert_history(&history).await?;

        self.purge_guest_if_idle(&mut unit, &entry.person_id).await?;
        unit.commit().await?;

        info!(queue_id = %queue_id, entry_id = %entry_id, "Entry left the queue");
        self.broadcaster.publish(&queue_id);
        self.spawn_follow_ups(
            queue_id,
            FollowUps {
                called: None,
                top_of_line: false,
            },
        );
        Ok(())
    }

    async fn entry_in_queue(
        &self,
        unit: &mut Box<dyn QueueUnit>,
        queue_id: &QueueId,
        entry_id: &EntryId,
    ) -> Result<QueueEntry> {
        let entry = unit
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
        Ok(entry)
    }

    /// Opportunistic guest cleanup inside the concluding transaction. The
    /// not-exists delete is a single statement, so a concurrent join that
    /// reuses the identity keeps the row alive.
    async fn purge_guest_if_idle(
        &self,
        unit: &mut Box<dyn QueueUnit>,
        person_id: &PersonId,
    ) -> Result<()> {
        if let Some(person) = unit.find_person(person_id).await? {
            if person.is_guest && unit.delete_guest_if_idle(&person.id).await? {
                debug!(person_id = %person_id, "Idle guest record removed");
            }
        }
        Ok(())
    }

    /// Notifier dispatch and estimate refresh run detached: droppable on
    /// shutdown, idempotent to retry, and never block the next mutation.
    fn spawn_follow_ups(&self, queue_id: QueueId, follow: FollowUps) {
        let notifications = Arc::clone(&self.notifications);
        let estimator = Arc::clone(&self.estimator);

        tokio::spawn(async move {
            if let Some(entry) = follow.called {
                notifications.notify_called(&entry).await;
            }
            if follow.top_of_line {
                notifications.notify_top_of_line(&queue_id).await;
            }
            estimator.refresh_all_best_effort(&queue_id).await;
        });
    }
}
