//! Diesel model definitions for database tables
//!
//! - Queryable structs: for SELECT queries (reading data)
//! - Insertable / AsChangeset structs: for writes

use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use super::diesel_schema::*;

// ============================================================================
// Timestamp Helpers (SQLite stores timestamps as TEXT)
// ============================================================================

/// Get current UTC timestamp as ISO 8601 string for SQLite TEXT columns
pub fn current_timestamp() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

// ============================================================================
// Record Models
// ============================================================================

/// Versioned record row (any entity kind)
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = records)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Record {
    pub id: String,
    pub kind: String,
    pub scope_id: String,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub attributes_json: Option<String>,
    pub version: String,
    pub created_at: String,
    pub updated_at: Option<String>,
}

/// New record for INSERT
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = records)]
pub struct NewRecord<'a> {
    pub id: &'a str,
    pub kind: &'a str,
    pub scope_id: &'a str,
    pub code: &'a str,
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub attributes_json: Option<&'a str>,
    pub version: &'a str,
    pub created_at: &'a str,
}

/// Changes applied by an update; `None` fields are left untouched
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = records)]
pub struct RecordChanges<'a> {
    pub name: Option<&'a str>,
    pub description: Option<&'a str>,
    pub attributes_json: Option<&'a str>,
    pub version: &'a str,
    pub updated_at: &'a str,
}

// ============================================================================
// Counter Models
// ============================================================================

/// Scoped counter row
#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = scoped_counters)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ScopedCounter {
    pub entity_kind: String,
    pub context_id: String,
    pub value: i64,
}

/// Value returned by the increment-or-create statement
#[derive(Debug, QueryableByName)]
pub struct CounterValue {
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    pub value: i64,
}
