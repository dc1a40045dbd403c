//! Transient, capability-gated object store.
//!
//! Holds opaque blobs (uploads, shared attachments, scratch exports) on
//! behalf of an application. Each entry is reachable only through its
//! unguessable id, which is handed out once at creation and works as a
//! bearer capability. Entries expire after a configured time-to-live.
//!
//! Layout under the base directory:
//!
//! ```text
//! <base>/index.redb     metadata index (id → name, content type, created at)
//! <base>/files/<id>     one backing file per entry
//! ```
//!
//! Security properties:
//! - No operation enumerates entries; every lookup is by one exact id
//! - Unknown and malformed ids are indistinguishable to callers
//! - Backing file paths are derived only from validated ids
//! - Backing files are created exclusively and owner-only on unix
//!
//! # Async Usage
//!
//! Index and file operations are blocking. From async contexts use the
//! `*_async` methods on [`Gateway`] (which wrap calls in `spawn_blocking`)
//! and [`Sweeper::run`] for periodic expiry.

mod async_ops;
mod clock;
mod files;
mod gateway;
mod id;
mod index;
mod request;
mod sweeper;
mod types;
mod validation;


use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

// Re-export public types
pub use clock::{Clock, ManualClock, SystemClock};
pub use files::FileStore;
pub use gateway::Gateway;
pub use id::EntryId;
pub use index::{IndexBackend, MemoryIndex, RedbIndex, SCHEMA_VERSION};
pub use request::{Changes, Field, Scope};
pub use sweeper::{CompactReport, SweepReport, Sweeper, SweeperHandle};
pub use types::{AccessMode, Entry, Resolved, Stat};
pub use validation::validate_id;

use crate::config::IndexKind;
use crate::error::{Error, Result};
use crate::paths::{get_files_dir, get_index_path};

/// An open store: index, file directory, gateway and sweeper.
///
/// # Thread Safety
///
/// The gateway and sweeper it hands out are `Clone` and share the same
/// index and file store.
pub struct Store {
    base_dir: PathBuf,
    gateway: Gateway,
    sweeper: Sweeper,
}

impl Store {
    /// Opens or creates a store under `base_dir`.
    ///
    /// Creates the directory layout, opens (and migrates) the index, then
    /// removes backing files that no index row refers to.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The base or files directory cannot be created
    /// - The index cannot be opened, or its schema is newer than supported
    /// - The startup compaction pass fails
    pub fn open<P: AsRef<Path>>(base_dir: P, kind: IndexKind, clock: Arc<dyn Clock>) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&base_dir).map_err(|e| {
            Error::io(format!("create store directory {}", base_dir.display()), e)
        })?;

        let files = Arc::new(FileStore::new(get_files_dir(&base_dir))?);
        let index: Arc<dyn IndexBackend> = match kind {
            IndexKind::Redb => Arc::new(RedbIndex::open(get_index_path(&base_dir))?),
            IndexKind::Memory => Arc::new(MemoryIndex::new()),
        };

        let store = Self::from_parts(base_dir, index, files, clock);
        let compacted = store.sweeper.compact()?;

        info!(
            base_dir = %store.base_dir.display(),
            index = ?kind,
            orphans_removed = compacted.orphans_removed,
            "Store opened"
        );

        Ok(store)
    }

    /// Opens a store with a non-persistent index.
    ///
    /// Backing files still live under `base_dir`. Any files left there by
    /// an earlier run are unreachable and get compacted away.
    ///
    /// # Errors
    ///
    /// Returns an error if the directories cannot be created.
    pub fn in_memory<P: AsRef<Path>>(base_dir: P, clock: Arc<dyn Clock>) -> Result<Self> {
        Self::open(base_dir, IndexKind::Memory, clock)
    }

    /// Assembles a store from already-open parts without touching disk.
    ///
    /// Use this to plug in a custom index backend.
    pub fn from_parts(
        base_dir: PathBuf,
        index: Arc<dyn IndexBackend>,
        files: Arc<FileStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            base_dir,
            gateway: Gateway::new(Arc::clone(&index), Arc::clone(&files), Arc::clone(&clock)),
            sweeper: Sweeper::new(index, files, clock),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Returns the capability gateway.
    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    /// Returns the retention sweeper.
    pub fn sweeper(&self) -> &Sweeper {
        &self.sweeper
    }

    /// Releases the store's handles.
    ///
    /// The index file stays locked while any gateway or sweeper clone is
    /// still alive.
    pub fn close(self) {
        info!(base_dir = %self.base_dir.display(), "Store closed");
    }
}
