//! End-to-end tests for the capability gateway and retention sweeper.
//!
//! These drive the store only through its public API, the way an embedding
//! application would.
//!
//! ```bash
//! cargo test --test gateway_tests
//! ```

use std::collections::HashSet;
use std::fs;
use std::io::{Read, Write};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use capstore::Error;
use capstore::config::IndexKind;
use capstore::storage::{
    AccessMode, Changes, Clock, EntryId, Field, ManualClock, Scope, Store, SystemClock,
};
use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use tempfile::TempDir;

fn open_store(tmp: &TempDir, clock: Arc<dyn Clock>) -> Store {
    Store::open(tmp.path(), IndexKind::Redb, clock).unwrap()
}

fn read_all(store: &Store, id: &str) -> Vec<u8> {
    let mut data = Vec::new();
    store
        .gateway()
        .resolve(id)
        .unwrap()
        .file
        .read_to_end(&mut data)
        .unwrap();
    data
}

// =============================================================================
// Round trip
// =============================================================================

#[test]
fn test_share_round_trip() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp, Arc::new(SystemClock));
    let gateway = store.gateway();

    let id = gateway
        .create(Some("holiday.jpg"), Some("image/jpeg"))
        .unwrap()
        .to_string();
    gateway
        .open(&id, AccessMode::WriteTruncate)
        .unwrap()
        .write_all(b"\xff\xd8\xff\xe0 jpeg bytes")
        .unwrap();

    let resolved = gateway.resolve(&id).unwrap();
    assert_eq!(resolved.name.as_deref(), Some("holiday.jpg"));
    assert_eq!(resolved.content_type, "image/jpeg");
    assert_eq!(resolved.size_bytes, 15);
    assert_eq!(read_all(&store, &id), b"\xff\xd8\xff\xe0 jpeg bytes");

    assert_eq!(gateway.delete_one(&id).unwrap(), 1);
    assert!(gateway.resolve(&id).unwrap_err().is_not_found());
}

#[test]
fn test_resolved_stream_is_read_only() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp, Arc::new(SystemClock));
    let id = store.gateway().create(None, None).unwrap().to_string();

    let mut resolved = store.gateway().resolve(&id).unwrap();
    assert!(resolved.file.write_all(b"nope").is_err());
}

#[test]
fn test_open_mode_parsing() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp, Arc::new(SystemClock));
    let gateway = store.gateway();
    let id = gateway.create(None, None).unwrap().to_string();

    let mode: AccessMode = "wt".parse().unwrap();
    gateway.open(&id, mode).unwrap().write_all(b"abc").unwrap();
    let mode: AccessMode = "wa".parse().unwrap();
    gateway.open(&id, mode).unwrap().write_all(b"def").unwrap();

    assert_eq!(read_all(&store, &id), b"abcdef");
    assert!(matches!(
        "x".parse::<AccessMode>(),
        Err(Error::UnsupportedOperation { .. })
    ));
}

// =============================================================================
// Capability properties
// =============================================================================

#[test]
fn test_ids_are_distinct_and_canonical() {
    let tmp = TempDir::new().unwrap();
    let store = Store::in_memory(tmp.path(), Arc::new(SystemClock)).unwrap();

    let mut seen = HashSet::new();
    for _ in 0..200 {
        let id = store.gateway().create(None, None).unwrap().to_string();
        assert_eq!(id.len(), 36);
        assert_eq!(id, id.to_lowercase());
        assert!(seen.insert(id));
    }
}

#[test]
fn test_guessed_and_traversal_ids_never_resolve() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp, Arc::new(SystemClock));
    let gateway = store.gateway();
    let real = gateway.create(Some("secret"), None).unwrap().to_string();

    let guesses = [
        String::new(),
        "*".to_string(),
        "%".to_string(),
        "../index.redb".to_string(),
        "files/../index.redb".to_string(),
        format!("../files/{real}"),
        format!("{real}/"),
        format!(" {real}"),
        real.to_uppercase(),
        real.replace('-', ""),
        format!("{{{real}}}"),
        format!("urn:uuid:{real}"),
        real[..35].to_string(),
    ];

    for guess in &guesses {
        assert!(gateway.resolve(guess).unwrap_err().is_not_found(), "{guess:?}");
        assert_eq!(gateway.delete_one(guess).unwrap(), 0, "{guess:?}");
    }

    // Nothing above touched the real entry
    assert_eq!(
        gateway.stat(&real).unwrap().name.as_deref(),
        Some("secret")
    );
}

#[test]
fn test_no_listing_through_request_surface() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp, Arc::new(SystemClock));
    let gateway = store.gateway();
    gateway.create(Some("a"), None).unwrap();
    gateway.create(Some("b"), None).unwrap();

    assert!(matches!(
        gateway.query(&Scope::Collection),
        Err(Error::UnsupportedOperation { .. })
    ));
    assert!(matches!(
        gateway.query(&Scope::Filtered {
            id: None,
            selection: "1 = 1".to_string(),
        }),
        Err(Error::UnsupportedOperation { .. })
    ));
    assert_eq!(gateway.delete(&Scope::Collection).unwrap(), 0);
}

#[test]
fn test_only_content_type_is_mutable() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp, Arc::new(SystemClock));
    let gateway = store.gateway();
    let id = gateway.create(Some("a.bin"), None).unwrap().to_string();

    for field in [Field::Id, Field::Name, Field::CreatedAt] {
        let changes = Changes::new().set(field, "x");
        assert!(
            matches!(
                gateway.update(&Scope::entry(&id), &changes),
                Err(Error::UnsupportedOperation { .. })
            ),
            "{field:?}"
        );
    }

    gateway.update_content_type(&id, "application/zip").unwrap();
    let stat = gateway.stat(&id).unwrap();
    assert_eq!(stat.name.as_deref(), Some("a.bin"));
    assert_eq!(stat.content_type, "application/zip");
}

#[test]
fn test_content_type_does_not_reveal_existence() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp, Arc::new(SystemClock));
    let gateway = store.gateway();
    let untyped = gateway.create(None, None).unwrap().to_string();
    let unknown = EntryId::generate().to_string();

    assert_eq!(
        gateway.content_type(&untyped).unwrap(),
        gateway.content_type(&unknown).unwrap()
    );
    assert_eq!(
        gateway.content_type("garbage").unwrap(),
        gateway.content_type(&unknown).unwrap()
    );
}

// =============================================================================
// Deletion and expiry
// =============================================================================

#[test]
fn test_delete_is_idempotent() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp, Arc::new(SystemClock));
    let id = store.gateway().create(None, None).unwrap().to_string();

    assert_eq!(store.gateway().delete_one(&id).unwrap(), 1);
    assert_eq!(store.gateway().delete_one(&id).unwrap(), 0);
    assert_eq!(store.gateway().delete_one(&id).unwrap(), 0);
    assert!(!tmp.path().join("files").join(&id).exists());
}

#[test]
fn test_ttl_expiry_across_reopen() {
    let tmp = TempDir::new().unwrap();
    let start = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
    let clock = Arc::new(ManualClock::new(start));
    let ttl = Duration::from_secs(24 * 60 * 60);

    let store = open_store(&tmp, clock.clone());
    let old = store.gateway().create(Some("old"), None).unwrap().to_string();
    clock.advance(ChronoDuration::hours(20));
    let recent = store.gateway().create(Some("recent"), None).unwrap().to_string();
    store.close();

    clock.advance(ChronoDuration::hours(5));
    let store = open_store(&tmp, clock);
    let report = store.sweeper().sweep_now(ttl).unwrap();

    assert_eq!(report.removed, 1);
    assert!(store.gateway().resolve(&old).unwrap_err().is_not_found());
    assert!(store.gateway().resolve(&recent).is_ok());
    assert!(!tmp.path().join("files").join(&old).exists());
}

#[test]
fn test_newer_schema_is_refused() {
    let tmp = TempDir::new().unwrap();
    {
        let db = redb::Database::create(tmp.path().join("index.redb")).unwrap();
        let txn = db.begin_write().unwrap();
        {
            let schema: redb::TableDefinition<&str, u64> = redb::TableDefinition::new("schema");
            let mut table = txn.open_table(schema).unwrap();
            table.insert("version", 99).unwrap();
        }
        txn.commit().unwrap();
    }

    let err = Store::open(tmp.path(), IndexKind::Redb, Arc::new(SystemClock))
        .err()
        .unwrap();
    assert!(matches!(err, Error::SchemaTooNew { found: 99, .. }));
}

// =============================================================================
// Concurrency
// =============================================================================

#[test]
fn test_concurrent_creates_and_deletes() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp, Arc::new(SystemClock));

    let handles: Vec<_> = (0..8)
        .map(|n| {
            let gateway = store.gateway().clone();
            thread::spawn(move || {
                let mut kept = Vec::new();
                for i in 0..25 {
                    let id = gateway
                        .create(Some(&format!("t{n}-{i}")), None)
                        .unwrap()
                        .to_string();
                    if i % 2 == 0 {
                        assert_eq!(gateway.delete_one(&id).unwrap(), 1);
                    } else {
                        kept.push(id);
                    }
                }
                kept
            })
        })
        .collect();

    let kept: Vec<String> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();

    assert_eq!(kept.len(), 8 * 12);
    for id in &kept {
        assert!(store.gateway().stat(id).is_ok());
    }
    assert_eq!(fs::read_dir(tmp.path().join("files")).unwrap().count(), kept.len());
}
