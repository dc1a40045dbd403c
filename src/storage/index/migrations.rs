//! Versioned schema migrations for the redb index.
//!
//! Migrations are additive: each step rewrites rows in place under their
//! existing keys. No step drops or recreates a table, so ids (and the files
//! keyed by them) survive every upgrade. All pending steps and the version
//! bump run in one write transaction; a failing step leaves the database as
//! it was.
//!
//! # Versions
//! - 1: `{ name, time }` with `time` in epoch milliseconds, no content type
//! - 2: `{ name, content_type, created_at }` ([`StoredEntry`])

use ::redb::{Database, ReadableTable, TableDefinition, WriteTransaction};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::redb::ENTRIES_TABLE;
use crate::error::{Error, Result};
use crate::storage::types::StoredEntry;

/// Schema version written by this build.
pub const SCHEMA_VERSION: u64 = 2;

/// Table holding schema bookkeeping
pub(crate) const SCHEMA_TABLE: TableDefinition<'static, &'static str, u64> =
    TableDefinition::new("schema");

pub(crate) const VERSION_KEY: &str = "version";

/// One upgrade step from `from` to `from + 1`.
struct Migration {
    from: u64,
    description: &'static str,
    apply: fn(&WriteTransaction) -> Result<usize>,
}

const MIGRATIONS: &[Migration] = &[Migration {
    from: 1,
    description: "add content_type and store created_at as a timestamp",
    apply: v1_to_v2,
}];

/// Brings the database schema up to [`SCHEMA_VERSION`].
///
/// A database without a version marker is treated as fresh if it has no
/// rows and as version 1 otherwise.
///
/// # Errors
///
/// Returns [`Error::SchemaTooNew`] if the database reports a newer version,
/// or an index/serialization error if a step fails.
pub(crate) fn migrate(db: &Database) -> Result<()> {
    let write_txn = db
        .begin_write()
        .map_err(Error::index("begin migration transaction"))?;

    let found = {
        let table = write_txn
            .open_table(SCHEMA_TABLE)
            .map_err(Error::index("open schema table"))?;
        table
            .get(VERSION_KEY)
            .map_err(Error::index("read schema version"))?
            .map(|guard| guard.value())
    };

    let version = match found {
        Some(version) => version,
        None => {
            let entries = write_txn
                .open_table(ENTRIES_TABLE)
                .map_err(Error::index("open entries table"))?;
            let empty = entries
                .iter()
                .map_err(Error::index("iterate entries"))?
                .next()
                .is_none();
            if empty { SCHEMA_VERSION } else { 1 }
        },
    };

    if version > SCHEMA_VERSION {
        write_txn
            .abort()
            .map_err(Error::index("abort migration transaction"))?;
        return Err(Error::SchemaTooNew {
            found: version,
            supported: SCHEMA_VERSION,
        });
    }

    for migration in MIGRATIONS.iter().filter(|m| m.from >= version) {
        let rows = (migration.apply)(&write_txn)?;
        tracing::info!(
            from = migration.from,
            to = migration.from + 1,
            rows,
            step = migration.description,
            "Migrated metadata index schema"
        );
    }

    {
        let mut table = write_txn
            .open_table(SCHEMA_TABLE)
            .map_err(Error::index("open schema table"))?;
        table
            .insert(VERSION_KEY, SCHEMA_VERSION)
            .map_err(Error::index("write schema version"))?;
    }

    write_txn
        .commit()
        .map_err(Error::index("commit migration transaction"))
}

/// Row layout of schema version 1.
#[derive(Deserialize)]
struct EntryV1 {
    name: Option<String>,
    time: i64,
}

fn v1_to_v2(txn: &WriteTransaction) -> Result<usize> {
    let mut table = txn
        .open_table(ENTRIES_TABLE)
        .map_err(Error::index("open entries table"))?;

    let mut rows = Vec::new();
    for item in table.iter().map_err(Error::index("iterate entries"))? {
        let (key, value) = item.map_err(Error::index("read entry"))?;
        let old: EntryV1 = serde_json::from_slice(value.value())?;
        let created_at = DateTime::<Utc>::from_timestamp_millis(old.time).unwrap_or_default();
        let upgraded = StoredEntry {
            name: old.name,
            content_type: None,
            created_at,
        };
        rows.push((key.value().to_string(), serde_json::to_vec(&upgraded)?));
    }

    for (key, json) in &rows {
        table
            .insert(key.as_str(), json.as_slice())
            .map_err(Error::index("rewrite entry"))?;
    }

    Ok(rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::id::EntryId;
    use crate::storage::index::{IndexBackend, RedbIndex};
    use ::redb::ReadableDatabase;
    use tempfile::TempDir;

    fn write_v1_database(path: &std::path::Path, rows: &[(EntryId, Option<&str>, i64)]) {
        let db = Database::create(path).unwrap();
        let txn = db.begin_write().unwrap();
        {
            let mut schema = txn.open_table(SCHEMA_TABLE).unwrap();
            schema.insert(VERSION_KEY, 1).unwrap();

            let mut entries = txn.open_table(ENTRIES_TABLE).unwrap();
            for (id, name, time) in rows {
                let json = serde_json::json!({ "name": name, "time": time }).to_string();
                entries
                    .insert(id.to_string().as_str(), json.as_bytes())
                    .unwrap();
            }
        }
        txn.commit().unwrap();
    }

    fn read_version(path: &std::path::Path) -> Option<u64> {
        let db = Database::create(path).unwrap();
        let txn = db.begin_read().unwrap();
        let table = txn.open_table(SCHEMA_TABLE).unwrap();
        table.get(VERSION_KEY).unwrap().map(|g| g.value())
    }

    #[test]
    fn test_fresh_database_gets_current_version() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("index.redb");

        drop(RedbIndex::open(&path).unwrap());

        assert_eq!(read_version(&path), Some(SCHEMA_VERSION));
    }

    #[test]
    fn test_v1_rows_are_preserved() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("index.redb");
        let rows = [
            (EntryId::generate(), Some("a.txt"), 1_700_000_000_000),
            (EntryId::generate(), None, 1_700_000_123_456),
            (EntryId::generate(), Some("c.pdf"), 1_600_000_000_000),
        ];
        write_v1_database(&path, &rows);

        {
            let index = RedbIndex::open(&path).unwrap();
            for (id, name, time) in &rows {
                let entry = index.lookup(id).unwrap().expect("row lost in migration");
                assert_eq!(entry.name.as_deref(), *name);
                assert_eq!(entry.content_type, None);
                assert_eq!(entry.created_at.timestamp_millis(), *time);
            }
        }

        assert_eq!(read_version(&path), Some(SCHEMA_VERSION));
    }

    #[test]
    fn test_unversioned_database_with_rows_is_v1() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("index.redb");
        let id = EntryId::generate();
        {
            let db = Database::create(&path).unwrap();
            let txn = db.begin_write().unwrap();
            {
                let mut entries = txn.open_table(ENTRIES_TABLE).unwrap();
                let json = r#"{"name":"legacy","time":1700000000000}"#;
                entries
                    .insert(id.to_string().as_str(), json.as_bytes())
                    .unwrap();
            }
            txn.commit().unwrap();
        }

        let index = RedbIndex::open(&path).unwrap();
        let entry = index.lookup(&id).unwrap().unwrap();
        assert_eq!(entry.name.as_deref(), Some("legacy"));
    }

    #[test]
    fn test_newer_schema_is_refused_untouched() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("index.redb");
        {
            let db = Database::create(&path).unwrap();
            let txn = db.begin_write().unwrap();
            {
                let mut schema = txn.open_table(SCHEMA_TABLE).unwrap();
                schema.insert(VERSION_KEY, SCHEMA_VERSION + 7).unwrap();
            }
            txn.commit().unwrap();
        }

        let err = RedbIndex::open(&path).err().unwrap();
        assert!(matches!(
            err,
            Error::SchemaTooNew { found, supported }
                if found == SCHEMA_VERSION + 7 && supported == SCHEMA_VERSION
        ));
        assert_eq!(read_version(&path), Some(SCHEMA_VERSION + 7));
    }

    #[test]
    fn test_reopen_is_a_no_op() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("index.redb");

        drop(RedbIndex::open(&path).unwrap());
        drop(RedbIndex::open(&path).unwrap());

        assert_eq!(read_version(&path), Some(SCHEMA_VERSION));
    }
}
