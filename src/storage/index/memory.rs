//! In-memory metadata index.
//!
//! Uses `DashMap` for concurrent access. Rows are lost when the process
//! exits, so backing files left behind are reclaimed as orphans by the next
//! compaction pass.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry as MapEntry;

use super::backend::IndexBackend;
use crate::error::{Error, Result};
use crate::storage::id::EntryId;
use crate::storage::types::{Entry, StoredEntry};

/// In-memory metadata index backed by `DashMap`.
///
/// Each shard lock covers a whole row, so single-row changes are atomic
/// with respect to concurrent readers.
#[derive(Default)]
pub struct MemoryIndex {
    rows: DashMap<EntryId, StoredEntry>,
}

impl MemoryIndex {
    /// Creates a new empty in-memory index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the index holds no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl IndexBackend for MemoryIndex {
    fn insert(&self, entry: &Entry) -> Result<()> {
        match self.rows.entry(entry.id) {
            MapEntry::Occupied(_) => Err(Error::DuplicateId { id: entry.id }),
            MapEntry::Vacant(slot) => {
                slot.insert(entry.to_stored());
                Ok(())
            },
        }
    }

    fn lookup(&self, id: &EntryId) -> Result<Option<Entry>> {
        Ok(self
            .rows
            .get(id)
            .map(|row| Entry::from_stored(*id, row.value().clone())))
    }

    fn update_content_type(&self, id: &EntryId, content_type: &str) -> Result<bool> {
        Ok(match self.rows.get_mut(id) {
            Some(mut row) => {
                row.content_type = Some(content_type.to_string());
                true
            },
            None => false,
        })
    }

    fn delete_by_id(&self, id: &EntryId) -> Result<bool> {
        Ok(self.rows.remove(id).is_some())
    }

    fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<HashSet<EntryId>> {
        let mut removed = HashSet::new();
        self.rows.retain(|id, row| {
            let expired = row.created_at < cutoff;
            if expired {
                removed.insert(*id);
            }
            !expired
        });
        Ok(removed)
    }
}
