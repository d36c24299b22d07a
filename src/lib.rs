//! Reqdocs Storage - Versioned record storage for requirements documents
//!
//! Stores the artifacts of a requirements-elicitation process (organizations,
//! projects, actors, interviews, educciones, specifications, risks, ...) and
//! gives each one a human code and an `MM.mm` document version.
//!
//! ## Identity
//!
//! | Concept | Example | Scope |
//! |---------|---------|-------|
//! | Canonical id | `9b2f4c1e-...` | Globally unique, never reused |
//! | Code | `ACT-0007` | Unique per (kind, parent) |
//! | Version | `00.03` | Advanced once per successful update |
//!
//! Codes come from a counter per (kind, parent scope) that only moves
//! forward: a deleted record's code is never handed out again. Any API that
//! takes a record reference accepts either the id or the code.
//!
//! ## Storage Layout
//!
//! ```text
//! ~/.local/share/reqdocs-storage/
//! ├── records.db             # SQLite: records + scoped_counters
//! └── config.toml            # Configuration
//! ```

pub mod allocator;
pub mod code;
pub mod config;
pub mod db;
pub mod error;
pub mod http;
pub mod kind;
pub mod reference;
pub mod services;
pub mod version;

// Re-exports
pub use code::{Code, ContextId};
pub use config::Config;
pub use db::{DbOptions, Record, RecordDb, RecordQuery};
pub use error::StorageError;
pub use http::HttpServer;
pub use kind::{EntityKind, GLOBAL_SCOPE};
pub use reference::Reference;
pub use services::{RecordService, Services};
pub use version::Version;
