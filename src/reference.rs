//! Dual-mode record references
//!
//! Callers may address a record by its canonical id or by its human code.
//! Both forms are resolved once, at the boundary, to the canonical id that
//! every downstream operation uses.
//!
//! A canonical id is passed through untouched and unverified; a dangling id
//! surfaces later, at whatever operation first dereferences it.

use std::fmt;

use diesel::SqliteConnection;
use tracing::debug;

use crate::db::records;
use crate::error::StorageError;
use crate::kind::EntityKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    ById(String),
    ByCode(String),
}

impl Reference {
    /// Classify a raw reference for a kind: values starting with the kind's
    /// `PREFIX-` are codes, anything else is taken as a canonical id.
    pub fn parse(kind: EntityKind, raw: &str) -> Self {
        if raw.starts_with(kind.code_lead().as_str()) {
            Reference::ByCode(raw.to_string())
        } else {
            Reference::ById(raw.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Reference::ById(s) | Reference::ByCode(s) => s,
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolve a reference to a canonical id.
///
/// `scope_id` is the canonical id of the parent the code is unique within
/// (the global scope for root kinds). Only `ByCode` touches storage.
pub fn resolve(
    conn: &mut SqliteConnection,
    kind: EntityKind,
    scope_id: &str,
    reference: &Reference,
) -> Result<String, StorageError> {
    match reference {
        Reference::ById(id) => Ok(id.clone()),
        Reference::ByCode(code) => {
            let record = records::find_by_code(conn, kind, scope_id, code)?.ok_or_else(|| {
                StorageError::NotFound(format!("{} with code {} in scope {}", kind, code, scope_id))
            })?;
            debug!(kind = %kind, code = %code, id = %record.id, "Resolved code reference");
            Ok(record.id)
        }
    }
}
