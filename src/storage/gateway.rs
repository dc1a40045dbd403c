//! Capability gateway: the only externally reachable surface of the store.
//!
//! Every entry point takes exactly one id, as text, and acts on at most one
//! entry. No entry point accepts a wildcard or a predicate, and none returns
//! an id the caller did not already hold (other than `create`, which mints
//! one).
//!
//! Unknown and malformed ids are indistinguishable: both surface as
//! [`Error::NotFound`], or as "0 rows affected" for deletes and updates.

use std::fs::File;
use std::sync::Arc;

use mime_guess::mime::{self, Mime};
use tracing::{debug, error, warn};

use super::clock::Clock;
use super::files::FileStore;
use super::id::EntryId;
use super::index::IndexBackend;
use super::request::{Changes, Field, Scope};
use super::types::{AccessMode, Entry, Resolved, Stat};
use super::validation::validate_id;
use crate::constants::DEFAULT_CONTENT_TYPE;
use crate::error::{Error, Result};

/// Single-entry access to the store, keyed by capability id.
///
/// # Thread Safety
///
/// `Gateway` is `Clone` and can be shared across threads.
#[derive(Clone)]
pub struct Gateway {
    index: Arc<dyn IndexBackend>,
    files: Arc<FileStore>,
    clock: Arc<dyn Clock>,
}

impl Gateway {
    pub fn new(
        index: Arc<dyn IndexBackend>,
        files: Arc<FileStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            index,
            files,
            clock,
        }
    }

    /// Creates an empty entry and returns its freshly minted id.
    ///
    /// The index row is written first, then the backing file is allocated.
    /// If allocation fails the row is removed again before the error is
    /// returned, so a failed create leaves nothing behind.
    ///
    /// # Errors
    ///
    /// - [`Error::CreationFailed`] if the index insert or file allocation fails
    /// - [`Error::DuplicateId`] if the generated id already exists (an
    ///   integrity violation; never expected with random ids)
    ///
    /// # Example
    /// ```no_run
    /// # fn demo(gateway: &capstore::storage::Gateway) -> capstore::Result<()> {
    /// let id = gateway.create(Some("report.pdf"), Some("application/pdf"))?;
    /// println!("share {id}");
    /// # Ok(())
    /// # }
    /// ```
    pub fn create(&self, name: Option<&str>, content_type: Option<&str>) -> Result<EntryId> {
        self.create_with_id(EntryId::generate(), name, content_type)
    }

    pub(crate) fn create_with_id(
        &self,
        id: EntryId,
        name: Option<&str>,
        content_type: Option<&str>,
    ) -> Result<EntryId> {
        let entry = Entry {
            id,
            name: name.map(str::to_string),
            content_type: content_type.map(str::to_string),
            created_at: self.clock.now(),
        };

        match self.index.insert(&entry) {
            Ok(()) => {},
            Err(Error::DuplicateId { id }) => {
                error!(id = %id, "Generated entry id already present in index");
                return Err(Error::DuplicateId { id });
            },
            Err(e) => return Err(Error::creation_failed("index insert", e)),
        }

        if let Err(e) = self.files.allocate(&id) {
            if let Err(rollback) = self.index.delete_by_id(&id) {
                error!(
                    id = %id,
                    error = %rollback,
                    "Failed to roll back index row after allocation failure"
                );
            }
            return Err(Error::creation_failed("file allocation", e));
        }

        debug!(id = %id, name = ?entry.name, "Entry created");
        Ok(id)
    }

    /// Resolves an entry to its metadata and a read-only stream.
    ///
    /// `size_bytes` is read from the backing file at call time.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the id is unknown or malformed.
    pub fn resolve(&self, id: &str) -> Result<Resolved> {
        let entry = self.lookup(id)?;
        let file = self.repair_if_missing(&entry.id, self.files.open(&entry.id, AccessMode::Read))?;
        let size_bytes = self.repair_if_missing(&entry.id, self.files.size_of(&entry.id))?;

        Ok(Resolved {
            content_type: entry.content_type_or_default().to_string(),
            name: entry.name,
            size_bytes,
            file,
        })
    }

    /// Returns an entry's metadata and live size without opening it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the id is unknown or malformed.
    pub fn stat(&self, id: &str) -> Result<Stat> {
        let entry = self.lookup(id)?;
        let size_bytes = self.repair_if_missing(&entry.id, self.files.size_of(&entry.id))?;

        Ok(Stat {
            content_type: entry.content_type_or_default().to_string(),
            name: entry.name,
            size_bytes,
        })
    }

    /// Opens an entry's backing file in the given mode.
    ///
    /// This is how content gets written after `create`. No mode creates a
    /// file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the id is unknown or malformed.
    pub fn open(&self, id: &str, mode: AccessMode) -> Result<File> {
        let entry = self.lookup(id)?;
        self.repair_if_missing(&entry.id, self.files.open(&entry.id, mode))
    }

    /// Returns the entry's content type.
    ///
    /// Falls back to `application/octet-stream` when the type is unset, the
    /// id is unknown, or the id is malformed, so the answer never reveals
    /// whether an entry exists.
    ///
    /// # Errors
    ///
    /// Returns an error only if the index itself fails.
    pub fn content_type(&self, id: &str) -> Result<String> {
        let Ok(id) = validate_id(id) else {
            return Ok(DEFAULT_CONTENT_TYPE.to_string());
        };

        Ok(self
            .index
            .lookup(&id)?
            .and_then(|entry| entry.content_type)
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()))
    }

    /// Returns the entry's content type if it matches `filter`.
    ///
    /// `filter` is a MIME type that may use wildcards (`*/*`, `image/*`).
    /// Like [`content_type`](Self::content_type), this does not reveal
    /// whether the id exists.
    ///
    /// # Errors
    ///
    /// Returns an error only if the index itself fails.
    pub fn stream_types(&self, id: &str, filter: &str) -> Result<Option<Vec<String>>> {
        let content_type = self.content_type(id)?;
        Ok(mime_matches(&content_type, filter).then(|| vec![content_type]))
    }

    /// Sets the entry's content type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the id is unknown or malformed.
    pub fn update_content_type(&self, id: &str, content_type: &str) -> Result<()> {
        let changes = Changes::new().set(Field::ContentType, content_type);
        match self.update(&Scope::entry(id), &changes)? {
            0 => Err(Error::NotFound),
            _ => Ok(()),
        }
    }

    /// Applies an update request and returns the number of rows affected.
    ///
    /// The only accepted shape is a bare id with exactly one content-type
    /// change. The shape is checked before any row is read.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedOperation`] for any other shape.
    pub fn update(&self, scope: &Scope, changes: &Changes) -> Result<usize> {
        let content_type = changes.require_content_type()?;
        let id = scope.require_entry()?;

        let Ok(id) = validate_id(id) else {
            return Ok(0);
        };

        let updated = self.index.update_content_type(&id, content_type)?;
        if updated {
            debug!(id = %id, content_type, "Entry content type updated");
        }
        Ok(usize::from(updated))
    }

    /// Deletes one entry and returns the number of rows removed (0 or 1).
    ///
    /// The backing file goes first, then the index row. The row is removed
    /// even if the file was already missing or could not be removed; a file
    /// left behind is an orphan for the next compaction pass. Deleting an
    /// unknown, malformed or already deleted id returns 0.
    ///
    /// # Errors
    ///
    /// Returns an error only if the index fails.
    pub fn delete_one(&self, id: &str) -> Result<usize> {
        let Ok(id) = validate_id(id) else {
            return Ok(0);
        };

        if let Err(e) = self.files.delete(&id) {
            warn!(id = %id, error = %e, "Failed to delete backing file; removing index row anyway");
        }

        let removed = self.index.delete_by_id(&id)?;
        if removed {
            debug!(id = %id, "Entry deleted");
        }
        Ok(usize::from(removed))
    }

    /// Applies a delete request and returns the number of rows removed.
    ///
    /// A request without an id deletes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedOperation`] for a filtered request.
    pub fn delete(&self, scope: &Scope) -> Result<usize> {
        match scope {
            Scope::Collection => Ok(0),
            _ => self.delete_one(scope.require_entry()?),
        }
    }

    /// Applies a query request for one entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedOperation`] for a request without an id
    /// (listing) or with a filter, and [`Error::NotFound`] for an unknown id.
    pub fn query(&self, scope: &Scope) -> Result<Stat> {
        self.stat(scope.require_entry()?)
    }

    fn lookup(&self, id: &str) -> Result<Entry> {
        let id = validate_id(id)?;
        self.index.lookup(&id)?.ok_or(Error::NotFound)
    }

    /// Drops the index row when its backing file has vanished.
    fn repair_if_missing<T>(&self, id: &EntryId, result: Result<T>) -> Result<T> {
        if let Err(Error::NotFound) = result {
            warn!(id = %id, "Backing file missing; removing index row");
            self.index.delete_by_id(id)?;
        }
        result
    }
}

/// Returns true if `concrete` matches `filter`, which may use `*` for the
/// type or subtype.
fn mime_matches(concrete: &str, filter: &str) -> bool {
    let (Ok(concrete), Ok(filter)) = (concrete.parse::<Mime>(), filter.parse::<Mime>()) else {
        return false;
    };

    let type_matches = filter.type_() == mime::STAR || filter.type_() == concrete.type_();
    let subtype_matches = filter.subtype() == mime::STAR
        || (filter.subtype() == concrete.subtype() && filter.suffix() == concrete.suffix());

    type_matches && subtype_matches
}
