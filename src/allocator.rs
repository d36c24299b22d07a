//! Scoped code allocator
//!
//! Mints codes from one counter per `(kind, context)` pair. `preview` only
//! reads the counter; `allocate` consumes a value through the store's single
//! atomic increment-or-create. No read-then-write happens here: splitting the
//! increment into two round trips would let two creations in the same scope
//! draw the same number.
//!
//! Numbers are never reused. Deleting a record leaves its code retired.

use tracing::debug;

use crate::code::{Code, ContextId};
use crate::error::StorageError;
use crate::kind::EntityKind;

/// Storage primitives the allocator needs
pub trait CounterStore {
    /// Last issued value for the scope, 0 when no row exists
    fn current(&mut self, counter_tag: &str, context_id: &str) -> Result<u64, StorageError>;

    /// Atomically increment the scope's counter (creating it at 1) and
    /// return the new value
    fn increment(&mut self, counter_tag: &str, context_id: &str) -> Result<u64, StorageError>;
}

/// Code the next `allocate` in this scope would return, without consuming it.
///
/// Advisory only: a concurrent allocation can claim the value first.
pub fn preview<S: CounterStore + ?Sized>(
    store: &mut S,
    kind: EntityKind,
    context_id: &ContextId,
) -> Result<Code, StorageError> {
    let tag = kind.descriptor().counter_tag;
    let current = store.current(tag, context_id.as_str())?;
    Ok(Code::new(kind, current + 1))
}

/// Consume the next sequence value in this scope.
///
/// Must not be resubmitted after an ambiguous failure: the increment may
/// already have committed.
pub fn allocate<S: CounterStore + ?Sized>(
    store: &mut S,
    kind: EntityKind,
    context_id: &ContextId,
) -> Result<Code, StorageError> {
    let tag = kind.descriptor().counter_tag;
    let value = store.increment(tag, context_id.as_str())?;
    let code = Code::new(kind, value);
    debug!(kind = %kind, context_id = %context_id, code = %code, "Allocated code");
    Ok(code)
}

/// Validate a raw scope key and preview in one step
pub fn preview_in<S: CounterStore + ?Sized>(
    store: &mut S,
    kind: EntityKind,
    context_id: &str,
) -> Result<Code, StorageError> {
    preview(store, kind, &ContextId::parse(context_id)?)
}

/// Validate a raw scope key and allocate in one step
pub fn allocate_in<S: CounterStore + ?Sized>(
    store: &mut S,
    kind: EntityKind,
    context_id: &str,
) -> Result<Code, StorageError> {
    allocate(store, kind, &ContextId::parse(context_id)?)
}
