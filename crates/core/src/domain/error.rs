// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Queue not found: {0}")]
    QueueNotFound(String),

    #[error("Queue {0} is not accepting joins ({1})")]
    QueueInactive(String, String),

    #[error("Queue {queue_id} is at capacity ({capacity})")]
    QueueAtCapacity { queue_id: String, capacity: i64 },

    #[error("Invalid party size {given} (max {max})")]
    InvalidPartySize { given: i64, max: i64 },

    #[error("Queue owners cannot join their own queue")]
    OwnerCannotJoinOwnQueue,

    #[error("No one is waiting in queue {0}")]
    NoOneWaiting(String),

    #[error("Entry not found: {0}")]
    EntryNotFound(String),

    #[error("Entry {entry_id} does not belong to queue {queue_id}")]
    WrongQueue { entry_id: String, queue_id: String },

    #[error("Entry {entry_id} is already in terminal state {status}")]
    AlreadyTerminal { entry_id: String, status: String },

    #[error("Invalid entry state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Person not found: {0}")]
    PersonNotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
