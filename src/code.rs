//! Human-readable record codes and allocation scopes
//!
//! A code is `PREFIX-` followed by the sequence value zero-padded to the
//! kind's width (`ACT-0001`, `PROJ-007`). Codes are unique inside their
//! scope only: two projects can both own an `ACT-0001`.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::error::StorageError;
use crate::kind::{EntityKind, GLOBAL_SCOPE};

/// Longest accepted context id
pub const MAX_CONTEXT_ID_LEN: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Code {
    kind: EntityKind,
    value: u64,
}

impl Code {
    pub fn new(kind: EntityKind, value: u64) -> Self {
        Self { kind, value }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    /// Parse a code of the given kind; `None` if it is not one
    pub fn parse(kind: EntityKind, s: &str) -> Option<Self> {
        let digits = s.strip_prefix(kind.code_lead().as_str())?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok().map(|value| Self::new(kind, value))
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = self.kind.descriptor();
        write!(f, "{}-{:0width$}", d.prefix, self.value, width = d.width)
    }
}

impl Serialize for Code {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Canonical id of the parent scope a counter is relative to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContextId(String);

impl ContextId {
    /// Scope shared by all records of a globally scoped kind
    pub fn global() -> Self {
        Self(GLOBAL_SCOPE.to_string())
    }

    /// Validate a canonical id for use as an allocation scope.
    ///
    /// Rejects empty or oversized values, characters outside
    /// `[A-Za-z0-9_-]`, and anything shaped like a human code of a known
    /// kind: those must be resolved to a canonical id first.
    pub fn parse(raw: &str) -> Result<Self, StorageError> {
        if raw.is_empty() {
            return Err(StorageError::InvalidScope("context id is empty".into()));
        }
        if raw.len() > MAX_CONTEXT_ID_LEN {
            return Err(StorageError::InvalidScope(format!(
                "context id exceeds {} characters",
                MAX_CONTEXT_ID_LEN
            )));
        }
        if !raw.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_') {
            return Err(StorageError::InvalidScope(format!(
                "context id {:?} contains invalid characters",
                raw
            )));
        }
        if let Some(kind) = EntityKind::ALL.iter().find(|k| Code::parse(**k, raw).is_some()) {
            return Err(StorageError::InvalidScope(format!(
                "context id {:?} is an unresolved {} code",
                raw, kind
            )));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_padding_per_kind() {
        assert_eq!(Code::new(EntityKind::Project, 1).to_string(), "PROJ-001");
        assert_eq!(Code::new(EntityKind::Actor, 1).to_string(), "ACT-0001");
        assert_eq!(Code::new(EntityKind::Risk, 42).to_string(), "RISK-0042");
        assert_eq!(Code::new(EntityKind::Expert, 7).to_string(), "EXP-007");
    }

    #[test]
    fn test_value_wider_than_pad() {
        assert_eq!(Code::new(EntityKind::Project, 1000).to_string(), "PROJ-1000");
    }

    #[test]
    fn test_parse() {
        assert_eq!(
            Code::parse(EntityKind::Project, "PROJ-007"),
            Some(Code::new(EntityKind::Project, 7))
        );
        assert_eq!(Code::parse(EntityKind::Project, "PROJ-"), None);
        assert_eq!(Code::parse(EntityKind::Project, "PROJ-7a"), None);
        assert_eq!(Code::parse(EntityKind::Actor, "PROJ-007"), None);
        // RISK- is not a prefix match for ROL-
        assert_eq!(Code::parse(EntityKind::Role, "RISK-0001"), None);
    }

    #[test]
    fn test_serializes_as_display() {
        let json = serde_json::to_string(&Code::new(EntityKind::Source, 3)).unwrap();
        assert_eq!(json, "\"FUE-003\"");
    }

    #[test]
    fn test_context_id_accepts_canonical_ids() {
        let id = uuid::Uuid::new_v4().to_string();
        assert_eq!(ContextId::parse(&id).unwrap().as_str(), id);
        assert_eq!(ContextId::global().as_str(), GLOBAL_SCOPE);
        assert!(ContextId::parse(GLOBAL_SCOPE).is_ok());
    }

    #[test]
    fn test_context_id_rejections() {
        let too_long = "a".repeat(MAX_CONTEXT_ID_LEN + 1);
        for bad in ["", "has space", "semi;colon", "PROJ-007", "ACT-0001", too_long.as_str()] {
            assert!(
                matches!(ContextId::parse(bad), Err(StorageError::InvalidScope(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }
}
