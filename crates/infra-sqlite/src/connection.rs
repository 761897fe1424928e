// SQLite Connection Pool Setup

use crate::error::map_sqlx_error;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;
use waitline_core::error::{AppError, Result};

/// Create SQLite connection pool with WAL mode
///
/// Accepts a plain file path, a `sqlite:` URL, or `:memory:`. An in-memory
/// database lives in a single connection that is never recycled, since every
/// new connection would see an empty database.
pub async fn create_pool(database_url: &str) -> Result<SqlitePool> {
    let in_memory = is_memory_url(database_url);

    let options = SqliteConnectOptions::from_str(database_url)
        .map_err(|e| AppError::Config(format!("invalid database url {}: {}", database_url, e)))?
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5))
        .create_if_missing(true);
    let options = if in_memory {
        options
    } else {
        options.journal_mode(SqliteJournalMode::Wal)
    };

    let pool_options = if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(10)
    };

    pool_options
        .connect_with(options)
        .await
        .map_err(map_sqlx_error)
}

fn is_memory_url(url: &str) -> bool {
    url == ":memory:" || url.starts_with("sqlite::memory:") || url.contains("mode=memory")
}
