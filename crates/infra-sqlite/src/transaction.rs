// SQLite Transaction Implementation - one unit per accepted mutation

use crate::queue_store::{entry_from_row, map_sqlx_error, person_from_row, queue_from_row};
use async_trait::async_trait;
use sqlx::{Sqlite, Transaction as SqlxTransaction};
use waitline_core::domain::{
    EntryId, HistoryRecord, Person, PersonId, Queue, QueueEntry, QueueId,
};
use waitline_core::error::Result;
use waitline_core::port::{QueueUnit, Transaction};

pub struct SqliteQueueUnit {
    tx: SqlxTransaction<'static, Sqlite>,
}

impl SqliteQueueUnit {
    pub fn new(tx: SqlxTransaction<'static, Sqlite>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl Transaction for SqliteQueueUnit {
    async fn commit(mut self: Box<Self>) -> Result<()> {
        self.tx.commit().await.map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn rollback(mut self: Box<Self>) -> Result<()> {
        self.tx.rollback().await.map_err(map_sqlx_error)?;
        Ok(())
    }
}

#[async_trait]
impl QueueUnit for SqliteQueueUnit {
    async fn load_queue(&mut self, id: &QueueId) -> Result<Option<Queue>> {
        let row = sqlx::query("SELECT * FROM queues WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;
        row.as_ref().map(queue_from_row).transpose()
    }

    async fn active_entries(&mut self, queue_id: &QueueId) -> Result<Vec<QueueEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM entries
            WHERE queue_id = ? AND status IN ('WAITING', 'NOTIFIED')
            ORDER BY position_number ASC
            "#,
        )
        .bind(queue_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;
        rows.iter().map(entry_from_row).collect()
    }

    async fn find_entry(&mut self, id: &EntryId) -> Result<Option<QueueEntry>> {
        let row = sqlx::query("SELECT * FROM entries WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;
        row.as_ref().map(entry_from_row).transpose()
    }

    async fn find_person(&mut self, id: &PersonId) -> Result<Option<Person>> {
        let row = sqlx::query("SELECT * FROM persons WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;
        row.as_ref().map(person_from_row).transpose()
    }

    async fn find_person_by_email(&mut self, email: &str) -> Result<Option<Person>> {
        let row = sqlx::query("SELECT * FROM persons WHERE email = ?")
            .bind(email)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;
        row.as_ref().map(person_from_row).transpose()
    }

    async fn insert_person(&mut self, person: &Person) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO persons (
                id, email, phone, first_name, last_name, is_guest, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&person.id)
        .bind(&person.email)
        .bind(&person.phone)
        .bind(&person.first_name)
        .bind(&person.last_name)
        .bind(person.is_guest)
        .bind(person.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn insert_queue(&mut self, queue: &Queue) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO queues (
                id, owner_id, name, description, join_code,
                status, max_capacity, max_party_size, est_service_minutes,
                current_size, total_served_today, created_at, updated_at, is_active
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&queue.id)
        .bind(&queue.owner_id)
        .bind(&queue.name)
        .bind(&queue.description)
        .bind(&queue.join_code)
        .bind(queue.status.to_string())
        .bind(queue.max_capacity)
        .bind(queue.max_party_size)
        .bind(queue.est_service_minutes)
        .bind(queue.current_size)
        .bind(queue.total_served_today)
        .bind(queue.created_at)
        .bind(queue.updated_at)
        .bind(queue.is_active)
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn update_queue(&mut self, queue: &Queue) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE queues SET
                name = ?, description = ?, status = ?,
                max_capacity = ?, max_party_size = ?, est_service_minutes = ?,
                current_size = ?, total_served_today = ?, updated_at = ?, is_active = ?
            WHERE id = ?
            "#,
        )
        .bind(&queue.name)
        .bind(&queue.description)
        .bind(queue.status.to_string())
        .bind(queue.max_capacity)
        .bind(queue.max_party_size)
        .bind(queue.est_service_minutes)
        .bind(queue.current_size)
        .bind(queue.total_served_today)
        .bind(queue.updated_at)
        .bind(queue.is_active)
        .bind(&queue.id)
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn insert_entry(&mut self, entry: &QueueEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO entries (
                id, queue_id, person_id, position_number, party_size,
                status, joined_at, notified_at, served_at, arrived_at,
                estimated_wait_minutes, notification_preference, notes
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.queue_id)
        .bind(&entry.person_id)
        .bind(entry.position_number)
        .bind(entry.party_size)
        .bind(entry.status.to_string())
        .bind(entry.joined_at)
        .bind(entry.notified_at)
        .bind(entry.served_at)
        .bind(entry.arrived_at)
        .bind(entry.estimated_wait_minutes)
        .bind(entry.notification_preference.to_string())
        .bind(&entry.notes)
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn update_entry(&mut self, entry: &QueueEntry) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE entries SET
                status = ?, notified_at = ?, served_at = ?, arrived_at = ?,
                estimated_wait_minutes = ?, notes = ?
            WHERE id = ?
            "#,
        )
        .bind(entry.status.to_string())
        .bind(entry.notified_at)
        .bind(entry.served_at)
        .bind(entry.arrived_at)
        .bind(entry.estimated_wait_minutes)
        .bind(&entry.notes)
        .bind(&entry.id)
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn insert_history(&mut self, record: &HistoryRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO history (
                id, queue_id, person_id, entry_id,
                joined_at, served_at, wait_minutes, status, recorded_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(&record.queue_id)
        .bind(&record.person_id)
        .bind(&record.entry_id)
        .bind(record.joined_at)
        .bind(record.served_at)
        .bind(record.wait_minutes)
        .bind(record.status.to_string())
        .bind(record.recorded_at)
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn delete_guest_if_idle(&mut self, person_id: &PersonId) -> Result<bool> {
        // Check and delete in one statement so a concurrent join reusing the
        // identity cannot slip between them
        let result = sqlx::query(
            r#"
            DELETE FROM persons
            WHERE id = ? AND is_guest = 1
              AND NOT EXISTS (
                  SELECT 1 FROM entries
                  WHERE entries.person_id = persons.id
                    AND entries.status IN ('WAITING', 'NOTIFIED')
              )
            "#,
        )
        .bind(person_id)
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }
}
