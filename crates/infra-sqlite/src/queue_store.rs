// SQLite QueueStore Implementation

use crate::SqliteQueueUnit;
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use waitline_core::domain::{
    EntryId, HistoryRecord, NotificationRecord, NotificationStatus, Person, PersonId, Queue,
    QueueEntry, QueueId,
};
use waitline_core::error::{AppError, Result};
use waitline_core::port::{QueueStore, QueueUnit, TransactionalQueueStore};

// Helper to convert sqlx::Error to AppError with structured information
pub(crate) fn map_sqlx_error(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) => {
            let code = db_err.code().map(|c| c.as_ref().to_string());
            // SQLite result codes: https://www.sqlite.org/rescode.html
            let described = match code.as_deref() {
                Some("2067") | Some("1555") => "Unique constraint violation",
                Some("787") | Some("3850") => "Foreign key constraint violation",
                Some("5") => "Database locked (SQLITE_BUSY)",
                Some("13") => "Database full",
                _ => "Database error",
            };
            AppError::Database(format!(
                "{}: {} ({})",
                described,
                db_err.message(),
                code.unwrap_or_else(|| "?".to_string())
            ))
        }
        sqlx::Error::RowNotFound => AppError::Database("Row not found".to_string()),
        sqlx::Error::ColumnNotFound(col) => AppError::Database(format!("Column not found: {}", col)),
        _ => AppError::Database(err.to_string()),
    }
}

pub(crate) fn queue_from_row(row: &SqliteRow) -> Result<Queue> {
    let status: String = row.try_get("status").map_err(map_sqlx_error)?;
    Ok(Queue {
        id: row.try_get("id").map_err(map_sqlx_error)?,
        owner_id: row.try_get("owner_id").map_err(map_sqlx_error)?,
        name: row.try_get("name").map_err(map_sqlx_error)?,
        description: row.try_get("description").map_err(map_sqlx_error)?,
        join_code: row.try_get("join_code").map_err(map_sqlx_error)?,
        status: status.parse().map_err(AppError::Database)?,
        max_capacity: row.try_get("max_capacity").map_err(map_sqlx_error)?,
        max_party_size: row.try_get("max_party_size").map_err(map_sqlx_error)?,
        est_service_minutes: row.try_get("est_service_minutes").map_err(map_sqlx_error)?,
        current_size: row.try_get("current_size").map_err(map_sqlx_error)?,
        total_served_today: row.try_get("total_served_today").map_err(map_sqlx_error)?,
        created_at: row.try_get("created_at").map_err(map_sqlx_error)?,
        updated_at: row.try_get("updated_at").map_err(map_sqlx_error)?,
        is_active: row.try_get("is_active").map_err(map_sqlx_error)?,
    })
}

pub(crate) fn entry_from_row(row: &SqliteRow) -> Result<QueueEntry> {
    let status: String = row.try_get("status").map_err(map_sqlx_error)?;
    let preference: String = row
        .try_get("notification_preference")
        .map_err(map_sqlx_error)?;
    Ok(QueueEntry {
        id: row.try_get("id").map_err(map_sqlx_error)?,
        queue_id: row.try_get("queue_id").map_err(map_sqlx_error)?,
        person_id: row.try_get("person_id").map_err(map_sqlx_error)?,
        position_number: row.try_get("position_number").map_err(map_sqlx_error)?,
        party_size: row.try_get("party_size").map_err(map_sqlx_error)?,
        status: status.parse().map_err(AppError::Database)?,
        joined_at: row.try_get("joined_at").map_err(map_sqlx_error)?,
        notified_at: row.try_get("notified_at").map_err(map_sqlx_error)?,
        served_at: row.try_get("served_at").map_err(map_sqlx_error)?,
        arrived_at: row.try_get("arrived_at").map_err(map_sqlx_error)?,
        estimated_wait_minutes: row
            .try_get("estimated_wait_minutes")
            .map_err(map_sqlx_error)?,
        notification_preference: preference.parse().map_err(AppError::Database)?,
        notes: row.try_get("notes").map_err(map_sqlx_error)?,
    })
}

pub(crate) fn person_from_row(row: &SqliteRow) -> Result<Person> {
    Ok(Person {
        id: row.try_get("id").map_err(map_sqlx_error)?,
        email: row.try_get("email").map_err(map_sqlx_error)?,
        phone: row.try_get("phone").map_err(map_sqlx_error)?,
        first_name: row.try_get("first_name").map_err(map_sqlx_error)?,
        last_name: row.try_get("last_name").map_err(map_sqlx_error)?,
        is_guest: row.try_get("is_guest").map_err(map_sqlx_error)?,
        created_at: row.try_get("created_at").map_err(map_sqlx_error)?,
    })
}

pub(crate) fn history_from_row(row: &SqliteRow) -> Result<HistoryRecord> {
    let status: String = row.try_get("status").map_err(map_sqlx_error)?;
    Ok(HistoryRecord {
        id: row.try_get("id").map_err(map_sqlx_error)?,
        queue_id: row.try_get("queue_id").map_err(map_sqlx_error)?,
        person_id: row.try_get("person_id").map_err(map_sqlx_error)?,
        entry_id: row.try_get("entry_id").map_err(map_sqlx_error)?,
        joined_at: row.try_get("joined_at").map_err(map_sqlx_error)?,
        served_at: row.try_get("served_at").map_err(map_sqlx_error)?,
        wait_minutes: row.try_get("wait_minutes").map_err(map_sqlx_error)?,
        status: status.parse().map_err(AppError::Database)?,
        recorded_at: row.try_get("recorded_at").map_err(map_sqlx_error)?,
    })
}

pub struct SqliteQueueStore {
    pool: SqlitePool,
}

impl SqliteQueueStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QueueStore for SqliteQueueStore {
    async fn find_queue(&self, id: &QueueId) -> Result<Option<Queue>> {
        let row = sqlx::query("SELECT * FROM queues WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        row.as_ref().map(queue_from_row).transpose()
    }

    async fn find_queue_by_code(&self, code: &str) -> Result<Option<Queue>> {
        let row = sqlx::query("SELECT * FROM queues WHERE join_code = ?")
            .bind(code)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        row.as_ref().map(queue_from_row).transpose()
    }

    async fn find_entry(&self, id: &EntryId) -> Result<Option<QueueEntry>> {
        let row = sqlx::query("SELECT * FROM entries WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        row.as_ref().map(entry_from_row).transpose()
    }

    async fn find_person(&self, id: &PersonId) -> Result<Option<Person>> {
        let row = sqlx::query("SELECT * FROM persons WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        row.as_ref().map(person_from_row).transpose()
    }

    async fn active_entries(&self, queue_id: &QueueId) -> Result<Vec<QueueEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM entries
            WHERE queue_id = ? AND status IN ('WAITING', 'NOTIFIED')
            ORDER BY position_number ASC
            "#,
        )
        .bind(queue_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        rows.iter().map(entry_from_row).collect()
    }

    async fn waiting_entries(&self, queue_id: &QueueId) -> Result<Vec<QueueEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM entries
            WHERE queue_id = ? AND status = 'WAITING'
            ORDER BY position_number ASC
            "#,
        )
        .bind(queue_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        rows.iter().map(entry_from_row).collect()
    }

    async fn recent_completions(
        &self,
        queue_id: &QueueId,
        limit: i64,
    ) -> Result<Vec<HistoryRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM history
            WHERE queue_id = ? AND status = 'COMPLETED' AND served_at IS NOT NULL
            ORDER BY served_at DESC
            LIMIT ?
            "#,
        )
        .bind(queue_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        rows.iter().map(history_from_row).collect()
    }

    async fn update_entry_estimate(&self, entry_id: &EntryId, minutes: i64) -> Result<()> {
        sqlx::query("UPDATE entries SET estimated_wait_minutes = ? WHERE id = ?")
            .bind(minutes)
            .bind(entry_id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn insert_notification(&self, record: &NotificationRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO notifications (
                id, entry_id, person_id, kind, channel,
                message, status, created_at, sent_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(&record.entry_id)
        .bind(&record.person_id)
        .bind(record.kind.to_string())
        .bind(record.channel.map(|c| c.to_string()))
        .bind(&record.message)
        .bind(record.status.to_string())
        .bind(record.created_at)
        .bind(record.sent_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn update_notification_status(
        &self,
        id: &str,
        status: NotificationStatus,
        sent_at: Option<i64>,
    ) -> Result<()> {
        sqlx::query("UPDATE notifications SET status = ?, sent_at = ? WHERE id = ?")
            .bind(status.to_string())
            .bind(sent_at)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn list_open_queues(&self) -> Result<Vec<Queue>> {
        let rows = sqlx::query(
            "SELECT * FROM queues WHERE is_active = 1 AND status = 'ACTIVE' ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        rows.iter().map(queue_from_row).collect()
    }

    async fn list_queues_by_owner(&self, owner_id: &PersonId) -> Result<Vec<Queue>> {
        let rows = sqlx::query("SELECT * FROM queues WHERE owner_id = ? ORDER BY created_at DESC")
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        rows.iter().map(queue_from_row).collect()
    }

    async fn search_queues(&self, term: &str) -> Result<Vec<Queue>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM queues
            WHERE is_active = 1 AND status = 'ACTIVE'
              AND LOWER(name) LIKE '%' || LOWER(?) || '%'
            ORDER BY name ASC
            "#,
        )
        .bind(term)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        rows.iter().map(queue_from_row).collect()
    }

    async fn purge_idle_guests(&self) -> Result<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM persons
            WHERE is_guest = 1
              AND NOT EXISTS (
                  SELECT 1 FROM entries
                  WHERE entries.person_id = persons.id
                    AND entries.status IN ('WAITING', 'NOTIFIED')
              )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl TransactionalQueueStore for SqliteQueueStore {
    async fn begin(&self) -> Result<Box<dyn QueueUnit>> {
        let tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        Ok(Box::new(SqliteQueueUnit::new(tx)))
    }
}
