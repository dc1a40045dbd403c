//! Redb-backed metadata index.
//!
//! Rows live in the `entries` table, keyed by canonical id text, with a JSON
//! [`StoredEntry`] as the value. Every write happens in its own redb write
//! transaction, so a single row's change is atomic with respect to readers.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use ::redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use chrono::{DateTime, Utc};

use super::backend::IndexBackend;
use super::migrations::migrate;
use crate::error::{Error, Result};
use crate::storage::id::{EntryId, ID_TEXT_LEN};
use crate::storage::types::{Entry, StoredEntry};
use crate::storage::validation::validate_id;

/// Table for entry metadata
pub(crate) const ENTRIES_TABLE: TableDefinition<'static, &'static str, &'static [u8]> =
    TableDefinition::new("entries");

/// Redb-backed metadata index.
///
/// # Thread Safety
///
/// `RedbIndex` is `Clone` and can be shared across threads. redb serializes
/// write transactions and gives readers a consistent snapshot.
#[derive(Clone)]
pub struct RedbIndex {
    db: Arc<Database>,
}

impl RedbIndex {
    /// Opens or creates the index database at `path` and brings its schema
    /// up to date.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The parent directory cannot be created
    /// - The database cannot be opened (permissions, already open, corrupt)
    /// - The schema is newer than this build supports
    /// - A migration step fails (the database is left unchanged)
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::io(format!("create index directory {}", parent.display()), e)
            })?;
        }

        let db = Database::create(path).map_err(Error::index("open index database"))?;
        migrate(&db)?;

        tracing::debug!(path = %path.display(), "Metadata index opened");

        Ok(Self { db: Arc::new(db) })
    }
}

impl IndexBackend for RedbIndex {
    fn insert(&self, entry: &Entry) -> Result<()> {
        let mut buf = [0u8; ID_TEXT_LEN];
        let key = entry.id.encode(&mut buf);
        let json = serde_json::to_vec(&entry.to_stored())?;

        let write_txn = self
            .db
            .begin_write()
            .map_err(Error::index("begin write transaction"))?;

        let inserted = {
            let mut table = write_txn
                .open_table(ENTRIES_TABLE)
                .map_err(Error::index("open entries table"))?;

            let exists = table
                .get(key)
                .map_err(Error::index("read entry"))?
                .is_some();

            if !exists {
                table
                    .insert(key, json.as_slice())
                    .map_err(Error::index("insert entry"))?;
            }
            !exists
        };

        if !inserted {
            write_txn
                .abort()
                .map_err(Error::index("abort insert transaction"))?;
            return Err(Error::DuplicateId { id: entry.id });
        }

        write_txn
            .commit()
            .map_err(Error::index("commit insert transaction"))
    }

    fn lookup(&self, id: &EntryId) -> Result<Option<Entry>> {
        let mut buf = [0u8; ID_TEXT_LEN];
        let key = id.encode(&mut buf);

        let read_txn = self
            .db
            .begin_read()
            .map_err(Error::index("begin read transaction"))?;

        let table = read_txn
            .open_table(ENTRIES_TABLE)
            .map_err(Error::index("open entries table"))?;

        let Some(guard) = table.get(key).map_err(Error::index("read entry"))? else {
            return Ok(None);
        };

        let stored: StoredEntry = serde_json::from_slice(guard.value())?;
        Ok(Some(Entry::from_stored(*id, stored)))
    }

    fn update_content_type(&self, id: &EntryId, content_type: &str) -> Result<bool> {
        let mut buf = [0u8; ID_TEXT_LEN];
        let key = id.encode(&mut buf);

        let write_txn = self
            .db
            .begin_write()
            .map_err(Error::index("begin write transaction"))?;

        let updated = {
            let mut table = write_txn
                .open_table(ENTRIES_TABLE)
                .map_err(Error::index("open entries table"))?;

            let current = table
                .get(key)
                .map_err(Error::index("read entry"))?
                .map(|guard| serde_json::from_slice::<StoredEntry>(guard.value()))
                .transpose()?;

            match current {
                Some(mut stored) => {
                    stored.content_type = Some(content_type.to_string());
                    let json = serde_json::to_vec(&stored)?;
                    table
                        .insert(key, json.as_slice())
                        .map_err(Error::index("update entry"))?;
                    true
                },
                None => false,
            }
        };

        write_txn
            .commit()
            .map_err(Error::index("commit update transaction"))?;

        Ok(updated)
    }

    fn delete_by_id(&self, id: &EntryId) -> Result<bool> {
        let mut buf = [0u8; ID_TEXT_LEN];
        let key = id.encode(&mut buf);

        let write_txn = self
            .db
            .begin_write()
            .map_err(Error::index("begin write transaction"))?;

        let removed = {
            let mut table = write_txn
                .open_table(ENTRIES_TABLE)
                .map_err(Error::index("open entries table"))?;

            table
                .remove(key)
                .map_err(Error::index("remove entry"))?
                .is_some()
        };

        write_txn
            .commit()
            .map_err(Error::index("commit delete transaction"))?;

        Ok(removed)
    }

    fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<HashSet<EntryId>> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(Error::index("begin write transaction"))?;

        let removed = {
            let mut table = write_txn
                .open_table(ENTRIES_TABLE)
                .map_err(Error::index("open entries table"))?;

            let mut expired = Vec::new();
            for item in table.iter().map_err(Error::index("iterate entries"))? {
                let (key, value) = item.map_err(Error::index("read entry"))?;
                let stored: StoredEntry = serde_json::from_slice(value.value())?;
                if stored.created_at >= cutoff {
                    continue;
                }

                match validate_id(key.value()) {
                    Ok(id) => expired.push(id),
                    Err(_) => {
                        tracing::warn!(key = key.value(), "Skipping index row with malformed key");
                    },
                }
            }

            let mut removed = HashSet::with_capacity(expired.len());
            for id in expired {
                let mut buf = [0u8; ID_TEXT_LEN];
                table
                    .remove(id.encode(&mut buf))
                    .map_err(Error::index("remove expired entry"))?;
                removed.insert(id);
            }
            removed
        };

        write_txn
            .commit()
            .map_err(Error::index("commit expiry transaction"))?;

        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    fn open_index() -> (RedbIndex, TempDir) {
        let tmp = TempDir::new().unwrap();
        let index = RedbIndex::open(tmp.path().join("index.redb")).unwrap();
        (index, tmp)
    }

    fn entry_at(created_at: DateTime<Utc>) -> Entry {
        Entry {
            id: EntryId::generate(),
            name: Some("file.bin".to_string()),
            content_type: None,
            created_at,
        }
    }

    #[test]
    fn test_insert_and_lookup() {
        let (index, _tmp) = open_index();
        let entry = entry_at(Utc::now());

        index.insert(&entry).unwrap();
        assert_eq!(index.lookup(&entry.id).unwrap(), Some(entry));
    }

    #[test]
    fn test_lookup_unknown_id() {
        let (index, _tmp) = open_index();
        assert!(index.lookup(&EntryId::generate()).unwrap().is_none());
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let (index, _tmp) = open_index();
        let entry = entry_at(Utc::now());
        index.insert(&entry).unwrap();

        let mut clash = entry_at(Utc::now());
        clash.id = entry.id;
        clash.name = Some("other".to_string());

        let err = index.insert(&clash).unwrap_err();
        assert!(matches!(err, Error::DuplicateId { id } if id == entry.id));
        assert_eq!(index.lookup(&entry.id).unwrap(), Some(entry));
    }

    #[test]
    fn test_update_content_type() {
        let (index, _tmp) = open_index();
        let entry = entry_at(Utc::now());
        index.insert(&entry).unwrap();

        assert!(index.update_content_type(&entry.id, "text/plain").unwrap());
        let updated = index.lookup(&entry.id).unwrap().unwrap();
        assert_eq!(updated.content_type.as_deref(), Some("text/plain"));
        assert_eq!(updated.name, entry.name);
        assert_eq!(updated.created_at, entry.created_at);

        assert!(
            !index
                .update_content_type(&EntryId::generate(), "text/plain")
                .unwrap()
        );
    }

    #[test]
    fn test_delete_is_idempotent() {
        let (index, _tmp) = open_index();
        let entry = entry_at(Utc::now());
        index.insert(&entry).unwrap();

        assert!(index.delete_by_id(&entry.id).unwrap());
        assert!(!index.delete_by_id(&entry.id).unwrap());
        assert!(index.lookup(&entry.id).unwrap().is_none());
    }

    #[test]
    fn test_delete_older_than() {
        let (index, _tmp) = open_index();
        let now = Utc::now();
        let old = entry_at(now - Duration::hours(3));
        let borderline = entry_at(now - Duration::hours(1));
        let fresh = entry_at(now);
        for entry in [&old, &borderline, &fresh] {
            index.insert(entry).unwrap();
        }

        let removed = index.delete_older_than(now - Duration::hours(1)).unwrap();

        assert_eq!(removed, HashSet::from([old.id]));
        assert!(index.lookup(&old.id).unwrap().is_none());
        assert!(index.lookup(&borderline.id).unwrap().is_some());
        assert!(index.lookup(&fresh.id).unwrap().is_some());
    }

    #[test]
    fn test_rows_survive_reopen() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("index.redb");
        let entry = entry_at(Utc::now());

        {
            let index = RedbIndex::open(&path).unwrap();
            index.insert(&entry).unwrap();
        }

        let index = RedbIndex::open(&path).unwrap();
        assert_eq!(index.lookup(&entry.id).unwrap(), Some(entry));
    }
}
