//! Scoped counter storage
//!
//! The increment is one `INSERT .. ON CONFLICT DO UPDATE .. RETURNING`
//! statement, so concurrent writers on the same scope serialize inside
//! SQLite and each receives its own value.

use diesel::prelude::*;
use diesel::sql_types::Text;

use super::diesel_schema::scoped_counters;
use super::models::{CounterValue, ScopedCounter};
use crate::allocator::CounterStore;
use crate::error::StorageError;

const INCREMENT_OR_CREATE: &str = r#"
INSERT INTO scoped_counters (entity_kind, context_id, value)
VALUES (?, ?, 1)
ON CONFLICT(entity_kind, context_id) DO UPDATE SET value = value + 1
RETURNING value
"#;

impl CounterStore for SqliteConnection {
    fn current(&mut self, counter_tag: &str, context_id: &str) -> Result<u64, StorageError> {
        let value: Option<i64> = scoped_counters::table
            .filter(scoped_counters::entity_kind.eq(counter_tag))
            .filter(scoped_counters::context_id.eq(context_id))
            .select(scoped_counters::value)
            .first(self)
            .optional()
            .map_err(|e| StorageError::Database(format!("Counter query failed: {}", e)))?;

        stored_value(value.unwrap_or(0), counter_tag, context_id)
    }

    fn increment(&mut self, counter_tag: &str, context_id: &str) -> Result<u64, StorageError> {
        let row: CounterValue = diesel::sql_query(INCREMENT_OR_CREATE)
            .bind::<Text, _>(counter_tag)
            .bind::<Text, _>(context_id)
            .get_result(self)
            .map_err(|e| StorageError::Database(format!("Counter increment failed: {}", e)))?;

        stored_value(row.value, counter_tag, context_id)
    }
}

/// A negative counter means the row was written outside the allocator
fn stored_value(value: i64, counter_tag: &str, context_id: &str) -> Result<u64, StorageError> {
    u64::try_from(value).map_err(|_| {
        StorageError::Internal(format!(
            "Counter {} in {} holds negative value {}",
            counter_tag, context_id, value
        ))
    })
}

/// List all counters recorded for a context (diagnostics)
pub fn list_counters(
    conn: &mut SqliteConnection,
    context_id: &str,
) -> Result<Vec<ScopedCounter>, StorageError> {
    scoped_counters::table
        .filter(scoped_counters::context_id.eq(context_id))
        .order(scoped_counters::entity_kind.asc())
        .select(ScopedCounter::as_select())
        .load(conn)
        .map_err(|e| StorageError::Database(format!("Counter query failed: {}", e)))
}

/// Number of counter rows
pub fn counter_count(conn: &mut SqliteConnection) -> Result<i64, StorageError> {
    scoped_counters::table
        .count()
        .get_result(conn)
        .map_err(|e| StorageError::Database(format!("Count query failed: {}", e)))
}
