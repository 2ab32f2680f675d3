//! Storage implementations.

use std::sync::Arc;

use tracing::info;

use crate::config::{StorageConfig, StorageType};
use crate::interfaces::{LedgerStore, RosterStore};

pub use crate::interfaces::{Result, StorageError};

pub mod helpers;
pub mod mock;
pub mod schema;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use mock::{MockLedgerStore, MockRosterStore};

#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteLedgerStore, SqliteRosterStore};

/// Initialize storage based on configuration.
///
/// Returns tuple of (LedgerStore, RosterStore) implementations based on
/// the configured storage type. Both SQLite stores share one pool.
pub async fn init_storage(
    config: &StorageConfig,
) -> Result<(Arc<dyn LedgerStore>, Arc<dyn RosterStore>)> {
    info!(storage_type = ?config.storage_type, path = %config.path, "Initializing storage");

    match config.storage_type {
        #[cfg(feature = "sqlite")]
        StorageType::Sqlite => {
            let pool = sqlite::connect(config).await?;

            let ledger = Arc::new(SqliteLedgerStore::new(pool.clone()));
            ledger.init().await?;

            let roster = Arc::new(SqliteRosterStore::new(pool));
            roster.init().await?;

            Ok((ledger, roster))
        }
        #[cfg(not(feature = "sqlite"))]
        StorageType::Sqlite => Err(StorageError::Unavailable(
            "SQLite storage requested but 'sqlite' feature is not enabled".to_string(),
        )),
        StorageType::Memory => Ok((
            Arc::new(MockLedgerStore::new()),
            Arc::new(MockRosterStore::new()),
        )),
    }
}
