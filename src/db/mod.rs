//! SQLite database module for versioned records
//!
//! ## Tables
//!
//! - `records` - Every entity kind (organization, project, actor, ...) with
//!   its scope, code and `MM.mm` version
//! - `scoped_counters` - Last issued code value per (entity kind, context)
//! - `schema_version` - Migration bookkeeping
//!
//! Connections come from an r2d2 pool. Each connection waits on a locked
//! database (`busy_timeout`) instead of failing, which is what lets
//! concurrent allocations in one scope queue behind each other.

pub mod counters;
pub mod diesel_schema;
pub mod models;
pub mod records;
pub mod schema;

use std::path::Path;
use std::time::Duration;

use diesel::connection::SimpleConnection;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool, PooledConnection};
use diesel::SqliteConnection;
use tracing::{debug, info};

use crate::error::StorageError;

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;
pub type DbConn = PooledConnection<ConnectionManager<SqliteConnection>>;

/// Pool tuning
#[derive(Debug, Clone)]
pub struct DbOptions {
    pub pool_max_size: u32,
    pub busy_timeout: Duration,
}

impl Default for DbOptions {
    fn default() -> Self {
        Self {
            pool_max_size: 8,
            busy_timeout: Duration::from_millis(5000),
        }
    }
}

/// Per-connection pragmas
#[derive(Debug, Clone, Copy)]
struct ConnectionPragmas {
    busy_timeout_ms: u64,
}

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for ConnectionPragmas {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), diesel::r2d2::Error> {
        conn.batch_execute(&format!(
            "PRAGMA busy_timeout = {}; PRAGMA synchronous = NORMAL;",
            self.busy_timeout_ms
        ))
        .map_err(diesel::r2d2::Error::QueryError)
    }
}

/// Pooled SQLite database for records and counters
pub struct RecordDb {
    pool: DbPool,
}

impl RecordDb {
    /// Open or create the record database
    pub fn open(db_path: &Path, options: &DbOptions) -> Result<Self, StorageError> {
        info!("Opening SQLite database at {:?}", db_path);

        let db = Self::build(&db_path.to_string_lossy(), options.pool_max_size, options)?;

        // WAL is persistent on the file, one connection is enough
        db.with_conn(|conn| {
            conn.batch_execute("PRAGMA journal_mode=WAL;")
                .map_err(|e| StorageError::Internal(format!("Failed to set PRAGMA: {}", e)))
        })?;

        db.init_schema()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    ///
    /// Limited to a single pooled connection: every SQLite connection to
    /// `:memory:` would otherwise see its own empty database.
    pub fn open_in_memory() -> Result<Self, StorageError> {
        debug!("Opening in-memory SQLite database");

        let db = Self::build(":memory:", 1, &DbOptions::default())?;
        db.init_schema()?;
        Ok(db)
    }

    fn build(url: &str, max_size: u32, options: &DbOptions) -> Result<Self, StorageError> {
        let manager = ConnectionManager::<SqliteConnection>::new(url);
        let mut builder = Pool::builder().max_size(max_size.max(1));
        if url == ":memory:" {
            // Recycling the only connection would drop the database with it
            builder = builder.idle_timeout(None).max_lifetime(None);
        }
        let pool = builder
            .connection_customizer(Box::new(ConnectionPragmas {
                busy_timeout_ms: options.busy_timeout.as_millis() as u64,
            }))
            .build(manager)
            .map_err(|e| StorageError::Database(format!("Failed to build pool: {}", e)))?;

        Ok(Self { pool })
    }

    /// Initialize database schema
    fn init_schema(&self) -> Result<(), StorageError> {
        self.with_conn(schema::init_schema)
    }

    /// Get a connection from the pool
    pub fn conn(&self) -> Result<DbConn, StorageError> {
        Ok(self.pool.get()?)
    }

    /// Run an operation on a pooled connection
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T, StorageError>,
    {
        let mut conn = self.conn()?;
        f(&mut *conn)
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<DbStats, StorageError> {
        self.with_conn(|conn| {
            Ok(DbStats {
                record_count: records::record_count(conn)? as u64,
                counter_count: counters::counter_count(conn)? as u64,
            })
        })
    }
}

/// Database statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct DbStats {
    pub record_count: u64,
    pub counter_count: u64,
}

// Re-exports
pub use models::{Record, ScopedCounter};
pub use records::RecordQuery;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::CounterStore;

    #[test]
    fn test_in_memory_db_shares_state_across_calls() {
        let db = RecordDb::open_in_memory().unwrap();
        db.with_conn(|conn| conn.increment("actor", "p1")).unwrap();
        let current = db.with_conn(|conn| conn.current("actor", "p1")).unwrap();
        assert_eq!(current, 1);

        let stats = db.stats().unwrap();
        assert_eq!(stats.counter_count, 1);
        assert_eq!(stats.record_count, 0);
    }

    #[test]
    fn test_open_file_db_persists() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("records.db");

        {
            let db = RecordDb::open(&path, &DbOptions::default()).unwrap();
            db.with_conn(|conn| conn.increment("RISK", "p1")).unwrap();
        }

        let db = RecordDb::open(&path, &DbOptions::default()).unwrap();
        assert_eq!(db.with_conn(|conn| conn.current("RISK", "p1")).unwrap(), 1);
    }
}
