//! Record service - business logic for versioned records of every kind
//!
//! Wraps the record repository with validation, code allocation, version
//! stamping and event emission. Creation and update each run inside one
//! `BEGIN IMMEDIATE` transaction, so the counter increment and the record
//! insert commit (or roll back) together.

use std::sync::Arc;

use diesel::SqliteConnection;
use serde::Deserialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::allocator;
use crate::code::{Code, ContextId};
use crate::db::models::{current_timestamp, NewRecord, RecordChanges};
use crate::db::{records, Record, RecordDb, RecordQuery};
use crate::error::StorageError;
use crate::kind::EntityKind;
use crate::reference::{self, Reference};
use crate::version::{self, Version};

use super::events::{EventBus, StorageEvent};

const MAX_NAME_LEN: usize = 500;
const MAX_DESCRIPTION_LEN: usize = 10_000;

/// Input for creating a record
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateRecordInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Kind-specific fields, stored as an opaque JSON object
    #[serde(default)]
    pub attributes: Option<serde_json::Value>,
}

/// Input for updating a record; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateRecordInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub attributes: Option<serde_json::Value>,
}

impl UpdateRecordInput {
    fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.attributes.is_none()
    }
}

/// Record service for business logic
pub struct RecordService {
    db: Arc<RecordDb>,
    events: Arc<EventBus>,
    recover_malformed_versions: bool,
}

impl RecordService {
    /// Create a new record service
    pub fn new(db: Arc<RecordDb>, events: Arc<EventBus>) -> Self {
        Self {
            db,
            events,
            recover_malformed_versions: false,
        }
    }

    /// Restart corrupt stored versions instead of failing the update
    pub fn with_version_recovery(mut self, enabled: bool) -> Self {
        self.recover_malformed_versions = enabled;
        self
    }

    // =========================================================================
    // Identity Operations
    // =========================================================================

    /// Preview the code the next created record would receive
    pub fn next_code(&self, kind: EntityKind, parent_id: Option<&str>) -> Result<Code, StorageError> {
        let scope = scope_for(kind, parent_id)?;
        self.db.with_conn(|conn| allocator::preview(conn, kind, &scope))
    }

    /// Resolve a raw id-or-code reference to a canonical id
    pub fn resolve(
        &self,
        kind: EntityKind,
        parent_id: Option<&str>,
        raw: &str,
    ) -> Result<String, StorageError> {
        if raw.is_empty() {
            return Err(StorageError::InvalidInput(format!("empty {} reference", kind)));
        }
        let scope = scope_for(kind, parent_id)?;
        match Reference::parse(kind, raw) {
            Reference::ById(id) => Ok(id),
            by_code => self
                .db
                .with_conn(|conn| reference::resolve(conn, kind, scope.as_str(), &by_code)),
        }
    }

    // =========================================================================
    // Read Operations
    // =========================================================================

    /// Get a record by canonical id
    pub fn get(
        &self,
        kind: EntityKind,
        parent_id: Option<&str>,
        id: &str,
    ) -> Result<Option<Record>, StorageError> {
        let scope = scope_for(kind, parent_id)?;
        self.db
            .with_conn(|conn| records::get_record(conn, kind, scope.as_str(), id))
    }

    /// List records of a kind under a parent
    pub fn list(
        &self,
        kind: EntityKind,
        parent_id: Option<&str>,
        query: &RecordQuery,
    ) -> Result<Vec<Record>, StorageError> {
        let scope = scope_for(kind, parent_id)?;
        self.db
            .with_conn(|conn| records::list_records(conn, kind, scope.as_str(), query))
    }

    // =========================================================================
    // Write Operations
    // =========================================================================

    /// Create a record: allocate its code, stamp the initial version, insert
    pub fn create(
        &self,
        kind: EntityKind,
        parent_id: Option<&str>,
        input: CreateRecordInput,
    ) -> Result<Record, StorageError> {
        validate_name(&input.name)?;
        validate_description(input.description.as_deref())?;
        let attributes_json = encode_attributes(input.attributes.as_ref())?;
        let scope = scope_for(kind, parent_id)?;

        let record = self.db.with_conn(|conn| {
            conn.immediate_transaction(|conn| {
                ensure_parent_exists(conn, kind, &scope)?;

                let code = allocator::allocate(conn, kind, &scope)?.to_string();
                let version = Version::initial(kind).to_string();
                let id = Uuid::new_v4().to_string();
                let now = current_timestamp();

                records::insert_record(
                    conn,
                    &NewRecord {
                        id: &id,
                        kind: kind.slug(),
                        scope_id: scope.as_str(),
                        code: &code,
                        name: input.name.trim(),
                        description: input.description.as_deref(),
                        attributes_json: attributes_json.as_deref(),
                        version: &version,
                        created_at: &now,
                    },
                )?;

                records::get_record(conn, kind, scope.as_str(), &id)?
                    .ok_or_else(|| StorageError::Internal("Failed to retrieve created record".into()))
            })
        })?;

        self.events.emit(StorageEvent::RecordCreated {
            kind,
            id: record.id.clone(),
            scope_id: record.scope_id.clone(),
            code: record.code.clone(),
        });

        Ok(record)
    }

    /// Update a record and advance its version exactly once
    pub fn update(
        &self,
        kind: EntityKind,
        parent_id: Option<&str>,
        id: &str,
        input: UpdateRecordInput,
    ) -> Result<Record, StorageError> {
        if input.is_empty() {
            return Err(StorageError::InvalidInput("nothing to update".into()));
        }
        if let Some(ref name) = input.name {
            validate_name(name)?;
        }
        validate_description(input.description.as_deref())?;
        let attributes_json = encode_attributes(input.attributes.as_ref())?;
        let scope = scope_for(kind, parent_id)?;

        let record = self.db.with_conn(|conn| {
            conn.immediate_transaction(|conn| {
                let current = records::get_record(conn, kind, scope.as_str(), id)?
                    .ok_or_else(|| StorageError::NotFound(format!("{} {}", kind, id)))?;

                let next = self.next_version(kind, &current)?.to_string();
                let now = current_timestamp();

                let changes = RecordChanges {
                    name: input.name.as_deref().map(str::trim),
                    description: input.description.as_deref(),
                    attributes_json: attributes_json.as_deref(),
                    version: &next,
                    updated_at: &now,
                };

                if !records::update_record(conn, id, &current.version, &changes)? {
                    return Err(StorageError::Conflict(format!(
                        "{} {} changed concurrently",
                        kind, id
                    )));
                }

                debug!(kind = %kind, id = %id, from = %current.version, to = %next, "Advanced version");

                records::get_record(conn, kind, scope.as_str(), id)?
                    .ok_or_else(|| StorageError::Internal("Failed to retrieve updated record".into()))
            })
        })?;

        self.events.emit(StorageEvent::RecordUpdated {
            kind,
            id: record.id.clone(),
            version: record.version.clone(),
        });

        Ok(record)
    }

    /// Delete a record that has no children. Its code is never reissued.
    pub fn delete(
        &self,
        kind: EntityKind,
        parent_id: Option<&str>,
        id: &str,
    ) -> Result<bool, StorageError> {
        let scope = scope_for(kind, parent_id)?;

        let deleted = self.db.with_conn(|conn| {
            conn.immediate_transaction(|conn| {
                let Some(current) = records::get_record(conn, kind, scope.as_str(), id)? else {
                    return Ok(None);
                };

                let children = records::count_children(conn, id)?;
                if children > 0 {
                    return Err(StorageError::Conflict(format!(
                        "{} {} still has {} dependent records",
                        kind, current.code, children
                    )));
                }

                records::delete_record(conn, kind, scope.as_str(), id)?;
                Ok(Some(current))
            })
        })?;

        match deleted {
            Some(record) => {
                self.events.emit(StorageEvent::RecordDeleted {
                    kind,
                    id: record.id,
                    code: record.code,
                });
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn next_version(&self, kind: EntityKind, current: &Record) -> Result<Version, StorageError> {
        match version::next(&current.version) {
            Ok(v) => Ok(v),
            Err(e @ StorageError::MalformedVersion(_)) if self.recover_malformed_versions => {
                let restarted = Version::initial(kind).next()?;
                warn!(
                    kind = %kind,
                    id = %current.id,
                    stored = %current.version,
                    restarted = %restarted,
                    error = %e,
                    "Restarting malformed stored version"
                );
                Ok(restarted)
            }
            Err(e) => Err(e),
        }
    }
}

/// Allocation scope for a kind given the caller's parent id
fn scope_for(kind: EntityKind, parent_id: Option<&str>) -> Result<ContextId, StorageError> {
    match (kind.parent(), parent_id) {
        (None, None) => Ok(ContextId::global()),
        (None, Some(_)) => Err(StorageError::InvalidScope(format!(
            "{} are globally scoped and take no parent",
            kind
        ))),
        (Some(parent), None) => Err(StorageError::InvalidScope(format!(
            "{} require a parent {}",
            kind, parent
        ))),
        (Some(_), Some(id)) => ContextId::parse(id),
    }
}

fn ensure_parent_exists(
    conn: &mut SqliteConnection,
    kind: EntityKind,
    scope: &ContextId,
) -> Result<(), StorageError> {
    if let Some(parent) = kind.parent() {
        if !records::record_exists(conn, parent, scope.as_str())? {
            return Err(StorageError::NotFound(format!("{} {}", parent, scope)));
        }
    }
    Ok(())
}

fn validate_name(name: &str) -> Result<(), StorageError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(StorageError::InvalidInput("name is required".into()));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(StorageError::InvalidInput(format!(
            "name must be <= {} characters",
            MAX_NAME_LEN
        )));
    }
    Ok(())
}

fn validate_description(description: Option<&str>) -> Result<(), StorageError> {
    match description {
        Some(d) if d.len() > MAX_DESCRIPTION_LEN => Err(StorageError::InvalidInput(format!(
            "description must be <= {} characters",
            MAX_DESCRIPTION_LEN
        ))),
        _ => Ok(()),
    }
}

fn encode_attributes(attributes: Option<&serde_json::Value>) -> Result<Option<String>, StorageError> {
    match attributes {
        None => Ok(None),
        Some(value) if value.is_object() => Ok(Some(serde_json::to_string(value)?)),
        Some(_) => Err(StorageError::InvalidInput("attributes must be a JSON object".into())),
    }
}
