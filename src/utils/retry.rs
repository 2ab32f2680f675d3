//! Retry utilities: backoff builders and retryable error classification.
//!
//! Uses `backon` for exponential backoff with jitter. SQLite reports a busy
//! or locked database when another connection holds the write lock; those
//! calls are safe to repeat because a failed transaction rolls back whole.

use std::future::Future;
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use tracing::warn;

use crate::interfaces::{Result, StorageError};

/// Backoff for store calls that lost a write-lock race.
///
/// - Min delay: 10ms
/// - Max delay: 1s
/// - Max attempts: 5
/// - Jitter enabled
pub fn store_backoff() -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(10))
        .with_max_delay(Duration::from_secs(1))
        .with_max_times(5)
        .with_jitter()
}

/// Determines if a storage error is transient contention.
///
/// Retryable:
/// - SQLite `SQLITE_BUSY` (5) and `SQLITE_LOCKED` (6), including extended codes
///
/// Everything else (missing rows, corrupt rows, constraint violations) fails
/// the same way on every attempt.
pub fn is_retryable(err: &StorageError) -> bool {
    match err {
        #[cfg(feature = "sqlite")]
        StorageError::Database(sqlx::Error::Database(db)) => db
            .code()
            .and_then(|code| code.parse::<i32>().ok())
            .map(|code| matches!(code & 0xff, 5 | 6))
            .unwrap_or(false),
        _ => false,
    }
}

/// Run a store call, retrying transient contention with [`store_backoff`].
pub async fn with_store_retry<T, F, Fut>(operation: &'static str, call: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    call.retry(store_backoff())
        .when(is_retryable)
        .notify(|err: &StorageError, delay: Duration| {
            warn!(operation, error = %err, delay = ?delay, "Store busy, retrying");
        })
        .await
}
