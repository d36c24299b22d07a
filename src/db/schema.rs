//! Database schema definitions

use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use tracing::info;

use super::diesel_schema::schema_version;
use crate::error::StorageError;

/// Current schema version for migrations
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema
pub fn init_schema(conn: &mut SqliteConnection) -> Result<(), StorageError> {
    let current_version = get_schema_version(conn)?;

    if current_version == 0 {
        info!("Creating new database schema v{}", SCHEMA_VERSION);
        create_tables(conn)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else if current_version < SCHEMA_VERSION {
        info!("Migrating schema from v{} to v{}", current_version, SCHEMA_VERSION);
        migrate_schema(conn, current_version)?;
    } else {
        info!("Database schema is up to date (v{})", current_version);
    }

    Ok(())
}

/// Get current schema version (0 if not initialized)
fn get_schema_version(conn: &mut SqliteConnection) -> Result<i32, StorageError> {
    conn.batch_execute("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)")
        .map_err(|e| StorageError::Internal(format!("Failed to create schema_version table: {}", e)))?;

    let version: Option<i32> = schema_version::table
        .select(schema_version::version)
        .first(conn)
        .optional()
        .map_err(|e| StorageError::Internal(format!("Failed to read schema_version: {}", e)))?;

    Ok(version.unwrap_or(0))
}

/// Set schema version
fn set_schema_version(conn: &mut SqliteConnection, version: i32) -> Result<(), StorageError> {
    diesel::delete(schema_version::table)
        .execute(conn)
        .map_err(|e| StorageError::Internal(format!("Failed to clear schema_version: {}", e)))?;
    diesel::insert_into(schema_version::table)
        .values(schema_version::version.eq(version))
        .execute(conn)
        .map_err(|e| StorageError::Internal(format!("Failed to set schema_version: {}", e)))?;
    Ok(())
}

/// Create all tables
fn create_tables(conn: &mut SqliteConnection) -> Result<(), StorageError> {
    conn.batch_execute(RECORDS_SCHEMA)
        .map_err(|e| StorageError::Internal(format!("Failed to create records table: {}", e)))?;

    conn.batch_execute(COUNTERS_SCHEMA)
        .map_err(|e| StorageError::Internal(format!("Failed to create counters table: {}", e)))?;

    conn.batch_execute(INDEXES_SCHEMA)
        .map_err(|e| StorageError::Internal(format!("Failed to create indexes: {}", e)))?;

    Ok(())
}

/// Migrate schema from older version
fn migrate_schema(conn: &mut SqliteConnection, _from_version: i32) -> Result<(), StorageError> {
    set_schema_version(conn, SCHEMA_VERSION)
}

/// Versioned records of every entity kind
const RECORDS_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS records (
    id TEXT PRIMARY KEY NOT NULL,
    kind TEXT NOT NULL,

    -- Canonical id of the parent record, or 'global'
    scope_id TEXT NOT NULL,
    code TEXT NOT NULL,

    name TEXT NOT NULL,
    description TEXT,

    -- Kind-specific business fields
    attributes_json TEXT,

    -- MM.mm
    version TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT
);
"#;

/// Last issued sequence value per (entity_kind, context_id)
const COUNTERS_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS scoped_counters (
    entity_kind TEXT NOT NULL,
    context_id TEXT NOT NULL,
    value INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (entity_kind, context_id)
);
"#;

/// Index definitions for fast queries
const INDEXES_SCHEMA: &str = r#"
CREATE UNIQUE INDEX IF NOT EXISTS idx_records_code ON records(kind, scope_id, code);
CREATE INDEX IF NOT EXISTS idx_records_scope ON records(scope_id);
CREATE INDEX IF NOT EXISTS idx_records_kind_created ON records(kind, created_at);
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_schema_is_idempotent() {
        let mut conn = SqliteConnection::establish(":memory:").unwrap();
        init_schema(&mut conn).unwrap();
        init_schema(&mut conn).unwrap();
        assert_eq!(get_schema_version(&mut conn).unwrap(), SCHEMA_VERSION);
    }
}
