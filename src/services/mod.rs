//! Service layer for reqdocs-storage
//!
//! Services encapsulate business logic between HTTP handlers and repositories.
//! Each service wraps database operations with:
//! - Input validation
//! - Code allocation and version stamping
//! - Event emission for audit/notifications
//! - Transaction boundaries
//!
//! ## Architecture
//!
//! ```text
//! HTTP Handlers (thin)
//!     ↓
//! Service Layer (business logic)
//!     ↓
//! Repository Layer (db/*.rs)
//!     ↓
//! SQLite Database
//! ```

pub mod response;
pub mod events;
pub mod record_service;

// Re-exports
pub use response::*;
pub use events::{EventBus, StorageEvent, EventListener};
pub use record_service::{CreateRecordInput, RecordService, UpdateRecordInput};

use crate::db::RecordDb;
use std::sync::Arc;

/// Service container for dependency injection
///
/// Holds all services with shared database connection.
/// Pass this to HttpServer for handler access.
pub struct Services {
    pub records: Arc<RecordService>,
    pub events: Arc<EventBus>,
    pub db: Arc<RecordDb>,
}

impl Services {
    /// Create all services with shared database
    pub fn new(db: Arc<RecordDb>) -> Self {
        Self::with_options(db, false)
    }

    /// Create services, optionally restarting corrupt stored versions on update
    pub fn with_options(db: Arc<RecordDb>, recover_malformed_versions: bool) -> Self {
        let events = Arc::new(EventBus::new());

        Self {
            records: Arc::new(
                RecordService::new(db.clone(), events.clone())
                    .with_version_recovery(recover_malformed_versions),
            ),
            events,
            db,
        }
    }
}
