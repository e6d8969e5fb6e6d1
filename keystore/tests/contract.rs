//! Behavioral contract suite, run against every provided backend.
//!
//! Each case takes the backends it applies to through the public `Store`
//! facade, so anything a backend gets for free from the facade (validation,
//! status policing, not-found) and anything it must supply itself (ordering,
//! atomicity, isolation) is exercised through the same surface real callers
//! use.

use std::sync::Arc;

use keystore::{
    BatchOp, OpenOptions, RangeOptions, SnapshotSemantics, StorageConfig, Store, StratumConfig,
};

use bytes::Bytes;
use common::storage::in_memory::InMemoryBackend;
use common::storage::stratum::StratumBackend;
use tempfile::TempDir;

/// A backend under test plus whatever keeps its resources alive.
struct Fixture {
    store: Store,
    _dir: Option<TempDir>,
}

fn memory_fixture() -> Fixture {
    Fixture {
        store: Store::new(Arc::new(InMemoryBackend::new())),
        _dir: None,
    }
}

fn stratum_fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    let backend = StratumBackend::new(StratumConfig::new(dir.path().to_str().unwrap()));
    Fixture {
        store: Store::new(Arc::new(backend)),
        _dir: Some(dir),
    }
}

fn all_fixtures() -> Vec<Fixture> {
    vec![memory_fixture(), stratum_fixture()]
}

async fn open_all() -> Vec<Fixture> {
    let fixtures = all_fixtures();
    for fixture in &fixtures {
        fixture.store.open().await.unwrap();
    }
    fixtures
}

async fn collect_keys(store: &Store, options: RangeOptions) -> Vec<Bytes> {
    let mut cursor = store.cursor(options).unwrap();
    let mut keys = Vec::new();
    while let Some(record) = cursor.next().await.unwrap() {
        keys.push(record.key);
    }
    cursor.end().await.unwrap();
    keys
}

fn keys(items: &[&str]) -> Vec<Bytes> {
    items.iter().map(|k| Bytes::copy_from_slice(k.as_bytes())).collect()
}

#[tokio::test]
async fn should_round_trip_values_including_empty() {
    for fixture in open_all().await {
        let store = &fixture.store;

        store.put("k", "value").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Bytes::from("value"));

        // overwrite
        store.put("k", "value2").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Bytes::from("value2"));

        // empty value is a value, not absence
        store.put("empty", Bytes::new()).await.unwrap();
        assert_eq!(store.get("empty").await.unwrap(), Bytes::new());
    }
}

#[tokio::test]
async fn should_distinguish_not_found_from_other_errors() {
    for fixture in open_all().await {
        let err = fixture.store.get("absent").await.unwrap_err();
        assert!(err.is_not_found());
        assert!(!err.is_usage());
        assert!(!err.is_validation());
    }
}

#[tokio::test]
async fn should_treat_delete_of_absent_key_as_success() {
    for fixture in open_all().await {
        let store = &fixture.store;
        store.delete("never-existed").await.unwrap();
        store.put("k", "v").await.unwrap();
        store.delete("k").await.unwrap();
        store.delete("k").await.unwrap();
        assert!(store.get("k").await.unwrap_err().is_not_found());
    }
}

#[tokio::test]
async fn should_reject_operations_on_unopened_store() {
    for fixture in all_fixtures() {
        let store = &fixture.store;
        assert!(store.get("k").await.unwrap_err().is_usage());
        assert!(store.put("k", "v").await.unwrap_err().is_usage());
        assert!(store.cursor(RangeOptions::all()).unwrap_err().is_usage());
    }
}

#[tokio::test]
async fn should_reopen_after_close_and_keep_contents() {
    for fixture in open_all().await {
        let store = &fixture.store;
        store.put("k", "v").await.unwrap();

        // when
        store.close().await.unwrap();
        assert!(store.get("k").await.unwrap_err().is_usage());
        store.open().await.unwrap();

        // then
        assert_eq!(store.get("k").await.unwrap(), Bytes::from("v"));
    }
}

#[tokio::test]
async fn should_honor_open_options_on_disk_backend() {
    // given: a populated location
    let dir = TempDir::new().unwrap();
    let path = dir.path().to_str().unwrap().to_string();
    {
        let store = Store::new(Arc::new(StratumBackend::new(StratumConfig::new(&path))));
        store.open().await.unwrap();
        store.close().await.unwrap();
    }

    // then: exclusive open fails and leaves the store openable again
    let store = Store::new(Arc::new(StratumBackend::new(StratumConfig::new(&path))));
    let err = store
        .open_with(OpenOptions {
            create_if_missing: true,
            error_if_exists: true,
        })
        .await
        .unwrap_err();
    assert!(err.is_engine());
    store.open().await.unwrap();

    // and: missing location without create fails
    let absent = dir.path().join("absent");
    let store = Store::new(Arc::new(StratumBackend::new(StratumConfig::new(
        absent.to_str().unwrap(),
    ))));
    let err = store
        .open_with(OpenOptions {
            create_if_missing: false,
            error_if_exists: false,
        })
        .await
        .unwrap_err();
    assert!(err.is_engine());
}

#[tokio::test]
async fn should_apply_write_batch_atomically() {
    for fixture in open_all().await {
        let store = &fixture.store;
        store.put("doomed", "x").await.unwrap();

        store
            .write_batch(vec![
                BatchOp::put("k1", "v1"),
                BatchOp::delete("doomed"),
                BatchOp::put("k2", "v2"),
            ])
            .await
            .unwrap();

        assert_eq!(store.get("k1").await.unwrap(), Bytes::from("v1"));
        assert_eq!(store.get("k2").await.unwrap(), Bytes::from("v2"));
        assert!(store.get("doomed").await.unwrap_err().is_not_found());
    }
}

#[tokio::test]
async fn should_leave_store_untouched_when_batch_has_invalid_entry() {
    for fixture in open_all().await {
        let store = &fixture.store;

        let err = store
            .write_batch(vec![
                BatchOp::put("k1", "v1"),
                BatchOp::put(Bytes::new(), "v2"),
                BatchOp::put("k3", "v3"),
            ])
            .await
            .unwrap_err();

        assert!(err.is_validation());
        assert!(store.get("k1").await.unwrap_err().is_not_found());
        assert!(store.get("k3").await.unwrap_err().is_not_found());
    }
}

#[tokio::test]
async fn should_apply_last_write_wins_within_a_batch() {
    for fixture in open_all().await {
        let store = &fixture.store;

        store
            .write_batch(vec![
                BatchOp::put("k", "first"),
                BatchOp::delete("k"),
                BatchOp::put("k", "last"),
            ])
            .await
            .unwrap();

        assert_eq!(store.get("k").await.unwrap(), Bytes::from("last"));
    }
}

#[tokio::test]
async fn should_run_chained_batch_lifecycle() {
    for fixture in open_all().await {
        let store = &fixture.store;

        let mut batch = store.batch().unwrap();
        batch
            .put("a", "1")
            .unwrap()
            .put("b", "2")
            .unwrap()
            .delete("a")
            .unwrap();
        batch.write().await.unwrap();

        assert!(store.get("a").await.unwrap_err().is_not_found());
        assert_eq!(store.get("b").await.unwrap(), Bytes::from("2"));
        assert!(batch.put("c", "3").unwrap_err().is_usage());
    }
}

#[tokio::test]
async fn should_cover_whole_store_with_default_options() {
    for fixture in open_all().await {
        let store = &fixture.store;
        store.put("a", "v").await.unwrap();
        store.put("b", "v").await.unwrap();

        // a defaulted cursor yields everything
        assert_eq!(
            collect_keys(store, RangeOptions::default()).await,
            keys(&["a", "b"])
        );

        // and a defaulted clear empties the store
        assert_eq!(store.clear(RangeOptions::default()).await.unwrap(), 2);
        assert!(store.get("a").await.unwrap_err().is_not_found());
        assert!(store.get("b").await.unwrap_err().is_not_found());
    }
}

#[tokio::test]
async fn should_yield_keys_in_lexicographic_order() {
    for fixture in open_all().await {
        let store = &fixture.store;
        for key in ["d", "b", "a", "c"] {
            store.put(key, "v").await.unwrap();
        }

        assert_eq!(
            collect_keys(store, RangeOptions::all()).await,
            keys(&["a", "b", "c", "d"])
        );
        assert_eq!(
            collect_keys(store, RangeOptions::all().reverse(true)).await,
            keys(&["d", "c", "b", "a"])
        );
    }
}

#[tokio::test]
async fn should_honor_bound_combinations() {
    for fixture in open_all().await {
        let store = &fixture.store;
        for key in ["a", "b", "c", "d", "e"] {
            store.put(key, "v").await.unwrap();
        }

        assert_eq!(
            collect_keys(store, RangeOptions::all().gt("b").lt("e")).await,
            keys(&["c", "d"])
        );
        assert_eq!(
            collect_keys(store, RangeOptions::all().gte("b").lte("d")).await,
            keys(&["b", "c", "d"])
        );
        assert_eq!(
            collect_keys(store, RangeOptions::all().gte("b").lte("d").reverse(true)).await,
            keys(&["d", "c", "b"])
        );
        assert_eq!(
            collect_keys(store, RangeOptions::all().limit(2)).await,
            keys(&["a", "b"])
        );
        assert_eq!(
            collect_keys(store, RangeOptions::all().reverse(true).limit(2)).await,
            keys(&["e", "d"])
        );
        assert!(collect_keys(store, RangeOptions::all().limit(0)).await.is_empty());
    }
}

#[tokio::test]
async fn should_honor_legacy_start_end_aliases() {
    for fixture in open_all().await {
        let store = &fixture.store;
        for key in ["a", "b", "c", "d", "e"] {
            store.put(key, "v").await.unwrap();
        }

        assert_eq!(
            collect_keys(store, RangeOptions::default().start("b").end("d").limit(-1)).await,
            keys(&["b", "c", "d"])
        );
        // under reverse, `start` is where traversal begins
        assert_eq!(
            collect_keys(
                store,
                RangeOptions::default()
                    .start("d")
                    .end("b")
                    .reverse(true)
                    .limit(-1)
            )
            .await,
            keys(&["d", "c", "b"])
        );
    }
}

#[tokio::test]
async fn should_treat_empty_bound_as_a_real_bound() {
    for fixture in open_all().await {
        let store = &fixture.store;
        store.put("a", "v").await.unwrap();

        // an empty exclusive upper bound excludes everything
        assert!(
            collect_keys(store, RangeOptions::all().lt(Bytes::new()))
                .await
                .is_empty()
        );
        // an empty inclusive lower bound excludes nothing
        assert_eq!(
            collect_keys(store, RangeOptions::all().gte(Bytes::new())).await,
            keys(&["a"])
        );
    }
}

#[tokio::test]
async fn should_clamp_seek_outside_range_to_exhaustion() {
    for fixture in open_all().await {
        let store = &fixture.store;
        for key in ["3", "4", "5", "6", "7"] {
            store.put(key, "v").await.unwrap();
        }

        // given: a cursor bounded below at "5"
        let mut cursor = store.cursor(RangeOptions::all().gte("5")).unwrap();

        // when: seeking below the range
        cursor.seek("4").unwrap();

        // then
        assert!(cursor.next().await.unwrap().is_none());

        // and: an in-range seek still works on a fresh cursor
        let mut cursor = store.cursor(RangeOptions::all().gte("5")).unwrap();
        cursor.seek("6").unwrap();
        assert_eq!(cursor.next().await.unwrap().unwrap().key, Bytes::from("6"));
    }
}

#[tokio::test]
async fn should_seek_to_next_existing_key_past_absent_target() {
    for fixture in open_all().await {
        let store = &fixture.store;
        for key in ["a", "c", "e"] {
            store.put(key, "v").await.unwrap();
        }

        let mut cursor = store.cursor(RangeOptions::all()).unwrap();
        cursor.seek("b").unwrap();
        assert_eq!(cursor.next().await.unwrap().unwrap().key, Bytes::from("c"));

        let mut cursor = store.cursor(RangeOptions::all().reverse(true)).unwrap();
        cursor.seek("d").unwrap();
        assert_eq!(cursor.next().await.unwrap().unwrap().key, Bytes::from("c"));
    }
}

#[tokio::test]
async fn should_isolate_snapshot_cursors_from_later_writes() {
    for fixture in open_all().await {
        let store = &fixture.store;
        assert_eq!(store.semantics(), SnapshotSemantics::Snapshot);
        store.put("a", "v").await.unwrap();
        store.put("b", "v").await.unwrap();

        // given: a cursor created before the mutations
        let mut cursor = store.cursor(RangeOptions::all()).unwrap();

        // when
        store.delete("b").await.unwrap();
        store.put("c", "v").await.unwrap();

        // then: the cursor sees creation-time state
        let mut seen = Vec::new();
        while let Some(record) = cursor.next().await.unwrap() {
            seen.push(record.key);
        }
        assert_eq!(seen, keys(&["a", "b"]));
    }
}

#[tokio::test]
async fn should_fail_cursor_reads_after_store_closes() {
    for fixture in open_all().await {
        let store = &fixture.store;
        store.put("a", "v").await.unwrap();
        let mut cursor = store.cursor(RangeOptions::all()).unwrap();

        store.close().await.unwrap();

        assert!(cursor.next().await.unwrap_err().is_usage());
        cursor.end().await.unwrap();
    }
}

#[tokio::test]
async fn should_clear_ranges_with_exact_cardinality() {
    for fixture in open_all().await {
        let store = &fixture.store;
        for i in 0..100u32 {
            store.put(format!("{i:02}"), "v").await.unwrap();
        }

        // ["30".."70"] inclusive holds 41 keys
        let removed = store
            .clear(RangeOptions::all().gte("30").lte("70"))
            .await
            .unwrap();
        assert_eq!(removed, 41);
        assert!(store.get("30").await.unwrap_err().is_not_found());
        assert!(store.get("29").await.is_ok());
        assert!(store.get("71").await.is_ok());

        // limit 0 removes nothing
        assert_eq!(store.clear(RangeOptions::all().limit(0)).await.unwrap(), 0);

        // reverse + limit removes from the top of the remaining keys
        let removed = store
            .clear(RangeOptions::all().reverse(true).limit(2))
            .await
            .unwrap();
        assert_eq!(removed, 2);
        assert!(store.get("99").await.unwrap_err().is_not_found());
        assert!(store.get("98").await.unwrap_err().is_not_found());
        assert!(store.get("97").await.is_ok());

        // default options clear everything left
        let removed = store.clear(RangeOptions::all()).await.unwrap();
        assert_eq!(removed, 100 - 41 - 2);
        assert!(collect_keys(store, RangeOptions::all()).await.is_empty());
    }
}

#[tokio::test]
async fn should_route_config_factory_to_matching_backend() {
    // given
    let dir = TempDir::new().unwrap();
    let memory = Store::from_config(&StorageConfig::InMemory).unwrap();
    let disk = Store::from_config(&StorageConfig::Stratum(StratumConfig::new(
        dir.path().to_str().unwrap(),
    )))
    .unwrap();
    memory.open().await.unwrap();
    disk.open().await.unwrap();

    // when
    memory.put("k", "v").await.unwrap();
    disk.put("k", "v").await.unwrap();

    // then: only the engine-class backend has extensions
    assert!(memory.property("stratum.stats").unwrap_err().is_usage());
    let stats = disk.property("stratum.stats").unwrap();
    assert!(stats.contains("Live keys: 1"));
}

#[tokio::test]
async fn should_shrink_footprint_after_compaction_through_facade() {
    // given: a compacted baseline with two live keys
    let fixture = stratum_fixture();
    let store = &fixture.store;
    store.open().await.unwrap();
    store.put("a", "payload-payload-a").await.unwrap();
    store.put("b", "payload-payload-b").await.unwrap();
    store.compact_range("a", "z").await.unwrap();
    let baseline = store.approximate_size("a", "z").await.unwrap();
    assert!(baseline > 0);

    // when: tombstone-heavy content, then compaction
    store.delete("a").await.unwrap();
    store.delete("b").await.unwrap();
    let with_tombstones = store.approximate_size("a", "z").await.unwrap();
    assert!(with_tombstones > baseline);
    store.compact_range("a", "z").await.unwrap();

    // then
    let compacted = store.approximate_size("a", "z").await.unwrap();
    assert!(compacted < baseline);

    // and: the store still answers reads correctly
    assert!(store.get("a").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn should_validate_engine_extension_bounds_like_keys() {
    let fixture = stratum_fixture();
    let store = &fixture.store;
    store.open().await.unwrap();

    assert!(store
        .approximate_size(Bytes::new(), "z")
        .await
        .unwrap_err()
        .is_validation());
    assert!(store
        .compact_range("a", Bytes::new())
        .await
        .unwrap_err()
        .is_validation());
}

#[tokio::test]
async fn should_destroy_only_engine_files() {
    // given: a populated location plus a foreign file
    let dir = TempDir::new().unwrap();
    let path = dir.path().to_str().unwrap().to_string();
    {
        let store = Store::new(Arc::new(StratumBackend::new(StratumConfig::new(&path))));
        store.open().await.unwrap();
        store.put("k", "v").await.unwrap();
        store.close().await.unwrap();
    }
    let foreign = dir.path().join("unrelated.txt");
    std::fs::write(&foreign, b"keep me").unwrap();

    // when
    common::storage::stratum::destroy(dir.path()).await.unwrap();

    // then: the directory survives with only the foreign file
    assert!(foreign.exists());
    assert!(!dir.path().join("STRATUM").exists());
    let store = Store::new(Arc::new(StratumBackend::new(StratumConfig::new(&path))));
    store.open().await.unwrap();
    assert!(store.get("k").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn should_repair_torn_segment_tails() {
    // given: a valid record followed by a torn tail
    let dir = TempDir::new().unwrap();
    let path = dir.path().to_str().unwrap().to_string();
    let segment = {
        let store = Store::new(Arc::new(StratumBackend::new(StratumConfig::new(&path))));
        store.open().await.unwrap();
        store.put("k", "v").await.unwrap();
        store.close().await.unwrap();
        dir.path().join("000001.slog")
    };
    let valid_len = std::fs::metadata(&segment).unwrap().len();
    let mut bytes = std::fs::read(&segment).unwrap();
    bytes.extend_from_slice(&[0xde, 0xad, 0xbe]);
    std::fs::write(&segment, &bytes).unwrap();

    // when
    common::storage::stratum::repair(dir.path()).await.unwrap();

    // then: the tail is gone and the data still reads back
    assert_eq!(std::fs::metadata(&segment).unwrap().len(), valid_len);
    let store = Store::new(Arc::new(StratumBackend::new(StratumConfig::new(&path))));
    store.open().await.unwrap();
    assert_eq!(store.get("k").await.unwrap(), Bytes::from("v"));
}
