//! Metadata index: id → {name, content type, creation time}.
//!
//! Two backends are provided:
//!
//! - **RedbIndex**: persistent, ACID, with versioned additive migrations
//! - **MemoryIndex**: non-persistent, for tests and embedding
//!
//! Every lookup and mutation addresses exactly one row by id. The only
//! multi-row operation is [`IndexBackend::delete_older_than`], which the
//! retention sweeper uses and which reports only ids it has just removed.

mod backend;
mod memory;
mod migrations;
mod redb;

pub use backend::IndexBackend;
pub use memory::MemoryIndex;
pub use migrations::SCHEMA_VERSION;
pub use self::redb::RedbIndex;
