//! Backend trait for the metadata index.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::storage::id::EntryId;
use crate::storage::types::Entry;

/// Backend trait for the metadata index.
///
/// All backends must be thread-safe (`Send + Sync`). A single row's insert,
/// update or delete must be atomic with respect to concurrent readers.
///
/// Deletes are idempotent: removing a row that is already gone reports
/// `false`, never an error.
pub trait IndexBackend: Send + Sync + 'static {
    /// Inserts a new row.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateId`](crate::Error::DuplicateId) if a row with
    /// the same id exists, or a storage error.
    fn insert(&self, entry: &Entry) -> Result<()>;

    /// Looks up one row by id.
    ///
    /// # Errors
    ///
    /// Returns an error only if the underlying storage fails.
    fn lookup(&self, id: &EntryId) -> Result<Option<Entry>>;

    /// Sets the content type of one row. Returns `true` if a row was affected.
    ///
    /// # Errors
    ///
    /// Returns an error only if the underlying storage fails.
    fn update_content_type(&self, id: &EntryId, content_type: &str) -> Result<bool>;

    /// Deletes one row. Returns `true` if a row was removed.
    ///
    /// # Errors
    ///
    /// Returns an error only if the underlying storage fails.
    fn delete_by_id(&self, id: &EntryId) -> Result<bool>;

    /// Deletes every row created strictly before `cutoff` and returns their ids.
    ///
    /// Reserved for the retention sweeper.
    ///
    /// # Errors
    ///
    /// Returns an error if the scan or the delete fails; in that case no row
    /// is removed.
    fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<HashSet<EntryId>>;
}
