//! Shared storage helper functions.
//!
//! Timestamp and money encoding shared by the storage backends.

use std::collections::HashSet;

use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::model::money;

use super::{Result, StorageError};

/// Encode a timestamp as fixed-width RFC3339 (microseconds, `Z`).
///
/// The fixed width keeps lexicographic order equal to chronological order,
/// which the windowed lookups rely on.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Decode a stored RFC3339 timestamp.
pub fn parse_timestamp(table: &'static str, raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::Corrupt {
            table,
            detail: format!("bad timestamp {raw:?}: {e}"),
        })
}

/// Encode an amount as integer cents.
pub fn cents(amount: Decimal) -> Result<i64> {
    money::to_cents(amount).ok_or(StorageError::Overflow(amount))
}

/// Parse a stored enum value, reporting the table on failure.
pub fn parse_enum<T>(
    table: &'static str,
    raw: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<T> {
    parse(raw).ok_or_else(|| StorageError::Corrupt {
        table,
        detail: format!("unknown value {raw:?}"),
    })
}

/// Drop repeated ids, keeping first-seen order.
pub fn distinct_ids(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}
