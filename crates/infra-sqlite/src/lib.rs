// Waitline SQLite Infrastructure

mod connection;
mod migration;
mod queue_store;
mod transaction;

pub use connection::create_pool;
pub use migration::run_migrations;
pub use queue_store::SqliteQueueStore;
pub use transaction::SqliteQueueUnit;
