// Waitline Infrastructure - SQLite Adapter
// Implements: QueueStore on a durable SQLite database

mod connection;
mod error;
mod migration;
mod queue_store;

pub use connection::create_pool;
pub use migration::run_migrations;
pub use queue_store::SqliteQueueStore;

// Note: sqlx::Error conversion is handled by a helper function (error.rs)
// due to Rust's orphan rules (cannot implement From<sqlx::Error> for AppError here)
