// Port Layer - Interfaces for external dependencies

pub mod code_provider;
pub mod id_provider; // For deterministic testing
pub mod notifier;
pub mod queue_store;
pub mod time_provider;

// Re-exports
pub use code_provider::CodeProvider;
pub use id_provider::IdProvider;
pub use notifier::Notifier;
pub use queue_store::{QueueStore, QueueUnit, Transaction, TransactionalQueueStore};
pub use time_provider::TimeProvider;
