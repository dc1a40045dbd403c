//! capstore: a transient, capability-gated object store.
//!
//! Entries are opaque blobs addressed only by an unguessable id handed out
//! at creation. Holding the id is the credential; there is no listing, no
//! search and no multi-entry access. Entries expire after a time-to-live.
//!
//! ```no_run
//! use std::io::Write;
//! use std::sync::Arc;
//!
//! use capstore::config::IndexKind;
//! use capstore::storage::{AccessMode, Store, SystemClock};
//!
//! # fn main() -> capstore::Result<()> {
//! let store = Store::open("/tmp/capstore", IndexKind::Redb, Arc::new(SystemClock))?;
//! let gateway = store.gateway();
//!
//! let id = gateway.create(Some("notes.txt"), Some("text/plain"))?.to_string();
//! gateway
//!     .open(&id, AccessMode::WriteTruncate)?
//!     .write_all(b"hello")
//!     .map_err(|e| capstore::Error::io("write notes", e))?;
//!
//! assert_eq!(gateway.stat(&id)?.size_bytes, 5);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

pub mod config;
pub mod constants;
pub mod error;
pub mod paths;
pub mod storage;

pub use error::{Error, Result};
