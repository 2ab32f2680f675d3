//! SQLite implementations of storage interfaces.

mod ledger_store;
mod roster_store;
mod rows;

pub use ledger_store::SqliteLedgerStore;
pub use roster_store::SqliteRosterStore;

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::config::StorageConfig;
use crate::storage::Result;

/// Open a pool for the configured database file, creating it if needed.
pub async fn connect(config: &StorageConfig) -> Result<SqlitePool> {
    // Every connection to :memory: is its own database; pin those to one.
    let (url, max_connections) = if config.path == ":memory:" {
        ("sqlite::memory:".to_string(), 1)
    } else {
        if let Some(parent) = std::path::Path::new(&config.path).parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| crate::storage::StorageError::Unavailable(e.to_string()))?;
        }
        (
            format!("sqlite:{}?mode=rwc", config.path),
            config.max_connections.max(1),
        )
    };

    let mut options = SqlitePoolOptions::new().max_connections(max_connections);
    if max_connections == 1 {
        // Closing the last connection would drop the in-memory database.
        options = options.idle_timeout(None).max_lifetime(None);
    }
    Ok(options.connect(&url).await?)
}

/// Start a write transaction.
///
/// BEGIN IMMEDIATE acquires the write lock upfront, so the dedup checks and
/// conditional updates inside the transaction see no concurrent writer, and
/// DEFERRED transactions never deadlock racing to upgrade their locks.
///
/// Dropping the transaction without [`finish`] rolls it back before the
/// connection is reused, so a cancelled caller leaves nothing half-applied.
async fn begin_immediate(pool: &SqlitePool) -> Result<Transaction<'static, Sqlite>> {
    Ok(pool.begin_with("BEGIN IMMEDIATE").await?)
}

/// Commit on success, roll back on error.
async fn finish<T>(tx: Transaction<'static, Sqlite>, result: Result<T>) -> Result<T> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(e) => {
            let _ = tx.rollback().await;
            Err(e)
        }
    }
}
