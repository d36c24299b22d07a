//! Record CRUD operations using Diesel with scope isolation
//!
//! Every lookup filters by kind and scope, so a record is only visible
//! through the parent it was created under.

use diesel::prelude::*;
use serde::Deserialize;

use super::diesel_schema::records;
use super::models::{NewRecord, Record, RecordChanges};
use crate::error::StorageError;
use crate::kind::EntityKind;

// ============================================================================
// Query Types
// ============================================================================

/// Query parameters for listing records
#[derive(Debug, Clone, Deserialize)]
pub struct RecordQuery {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    100
}

impl Default for RecordQuery {
    fn default() -> Self {
        Self {
            search: None,
            limit: default_limit(),
            offset: 0,
        }
    }
}

// ============================================================================
// Read Operations
// ============================================================================

/// Get a record by canonical id within a scope
pub fn get_record(
    conn: &mut SqliteConnection,
    kind: EntityKind,
    scope_id: &str,
    id: &str,
) -> Result<Option<Record>, StorageError> {
    records::table
        .filter(records::kind.eq(kind.slug()))
        .filter(records::scope_id.eq(scope_id))
        .filter(records::id.eq(id))
        .select(Record::as_select())
        .first(conn)
        .optional()
        .map_err(|e| StorageError::Database(format!("Query failed: {}", e)))
}

/// Find a record by its human code within a scope
pub fn find_by_code(
    conn: &mut SqliteConnection,
    kind: EntityKind,
    scope_id: &str,
    code: &str,
) -> Result<Option<Record>, StorageError> {
    records::table
        .filter(records::kind.eq(kind.slug()))
        .filter(records::scope_id.eq(scope_id))
        .filter(records::code.eq(code))
        .select(Record::as_select())
        .first(conn)
        .optional()
        .map_err(|e| StorageError::Database(format!("Query failed: {}", e)))
}

/// Whether a record of `kind` with this id exists in any scope
pub fn record_exists(
    conn: &mut SqliteConnection,
    kind: EntityKind,
    id: &str,
) -> Result<bool, StorageError> {
    let count: i64 = records::table
        .filter(records::kind.eq(kind.slug()))
        .filter(records::id.eq(id))
        .count()
        .get_result(conn)
        .map_err(|e| StorageError::Database(format!("Query failed: {}", e)))?;
    Ok(count > 0)
}

/// List records of a kind within a scope, oldest first
pub fn list_records(
    conn: &mut SqliteConnection,
    kind: EntityKind,
    scope_id: &str,
    query: &RecordQuery,
) -> Result<Vec<Record>, StorageError> {
    let search_pattern = query.search.as_deref().map(contains_pattern);

    let mut base_query = records::table
        .filter(records::kind.eq(kind.slug()))
        .filter(records::scope_id.eq(scope_id))
        .select(Record::as_select())
        .into_boxed();

    if let Some(ref pattern) = search_pattern {
        base_query = base_query.filter(
            records::name
                .like(pattern)
                .escape('\\')
                .or(records::description.like(pattern).escape('\\'))
                .or(records::code.like(pattern).escape('\\')),
        );
    }

    base_query
        .order((records::created_at.asc(), records::code.asc()))
        .limit(query.limit)
        .offset(query.offset)
        .load(conn)
        .map_err(|e| StorageError::Database(format!("Query failed: {}", e)))
}

/// LIKE pattern matching `term` literally anywhere in the column
fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Number of records directly under a parent record
pub fn count_children(conn: &mut SqliteConnection, parent_id: &str) -> Result<i64, StorageError> {
    records::table
        .filter(records::scope_id.eq(parent_id))
        .count()
        .get_result(conn)
        .map_err(|e| StorageError::Database(format!("Count query failed: {}", e)))
}

/// Total number of records
pub fn record_count(conn: &mut SqliteConnection) -> Result<i64, StorageError> {
    records::table
        .count()
        .get_result(conn)
        .map_err(|e| StorageError::Database(format!("Count query failed: {}", e)))
}

// ============================================================================
// Write Operations
// ============================================================================

/// Insert a fully stamped record (code and version already assigned)
pub fn insert_record(conn: &mut SqliteConnection, new_record: &NewRecord) -> Result<(), StorageError> {
    diesel::insert_into(records::table)
        .values(new_record)
        .execute(conn)
        .map_err(|e| match e {
            diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                _,
            ) => StorageError::Conflict(format!(
                "{} code {} already exists in scope {}",
                new_record.kind, new_record.code, new_record.scope_id
            )),
            other => StorageError::Database(format!("Insert failed: {}", other)),
        })?;
    Ok(())
}

/// Apply changes, guarded by the version the caller read.
///
/// Returns `false` when the stored version no longer matches
/// `expected_version` (a concurrent update won).
pub fn update_record(
    conn: &mut SqliteConnection,
    id: &str,
    expected_version: &str,
    changes: &RecordChanges,
) -> Result<bool, StorageError> {
    let updated = diesel::update(
        records::table
            .filter(records::id.eq(id))
            .filter(records::version.eq(expected_version)),
    )
    .set(changes)
    .execute(conn)
    .map_err(|e| StorageError::Database(format!("Update failed: {}", e)))?;

    Ok(updated > 0)
}

/// Delete a record; the counter row is left untouched
pub fn delete_record(
    conn: &mut SqliteConnection,
    kind: EntityKind,
    scope_id: &str,
    id: &str,
) -> Result<bool, StorageError> {
    let deleted = diesel::delete(
        records::table
            .filter(records::kind.eq(kind.slug()))
            .filter(records::scope_id.eq(scope_id))
            .filter(records::id.eq(id)),
    )
    .execute(conn)
    .map_err(|e| StorageError::Database(format!("Delete failed: {}", e)))?;

    Ok(deleted > 0)
}
