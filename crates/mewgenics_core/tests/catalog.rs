mod support;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use mewgenics_core::core_api::{
    CatalogConfig, ChangeSignal, CoreError, MemorySource, RecordCatalog, RecordSource,
};
use mewgenics_core::record::RawRecord;
use mewgenics_core::sex::Sex;

use support::*;

/// Counts enumerations and stalls each one so concurrent callers pile up.
struct SlowSource {
    inner: MemorySource,
    enumerations: AtomicUsize,
    delay: Duration,
}

impl RecordSource for SlowSource {
    fn fetch_record_bytes(&self, key: i64) -> Result<Option<Vec<u8>>, CoreError> {
        self.inner.fetch_record_bytes(key)
    }

    fn fetch_named_blob(&self, name: &str) -> Result<Option<Vec<u8>>, CoreError> {
        self.inner.fetch_named_blob(name)
    }

    fn records(&self) -> Result<Vec<RawRecord>, CoreError> {
        self.enumerations.fetch_add(1, Ordering::SeqCst);
        thread::sleep(self.delay);
        self.inner.records()
    }
}

fn populated_source() -> MemorySource {
    let source = MemorySource::new();
    source.insert_record(3, compress_with_header(&named_record_bytes("Zelda")));
    source.insert_record(1, compress_with_header(&named_record_bytes("Biscu")));
    source.insert_record(2, compress_with_header(&named_record_bytes("Alpha")));
    source.insert_record(9, vec![0xFF, 0xFF, 0xFF]);
    source.insert_blob("current_day", b"500\0".to_vec());
    source
}

#[test]
fn list_all_sorts_by_name_and_skips_bad_records() {
    let catalog = RecordCatalog::new(Arc::new(populated_source()));
    let records = catalog.list_all().expect("collection should load");

    let names: Vec<&str> = records.iter().map(|r| r.name()).collect();
    assert_eq!(names, vec!["Alpha", "Biscu", "Zelda"]);
    assert_eq!(catalog.record_count().expect("stored rows"), 4);
    assert_eq!(catalog.load_count(), 1);
}

#[test]
fn concurrent_misses_share_one_decode() {
    let source = Arc::new(SlowSource {
        inner: populated_source(),
        enumerations: AtomicUsize::new(0),
        delay: Duration::from_millis(100),
    });
    let catalog = Arc::new(RecordCatalog::new(source.clone()));
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let catalog = Arc::clone(&catalog);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                catalog.list_all().expect("collection should load").len()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().expect("worker panicked"), 3);
    }
    assert_eq!(source.enumerations.load(Ordering::SeqCst), 1);
    assert_eq!(catalog.load_count(), 1);
}

#[test]
fn invalidation_forces_fresh_decode() {
    let source = Arc::new(populated_source());
    let catalog = Arc::new(RecordCatalog::new(source.clone()));
    let signal = ChangeSignal::new();
    catalog.watch(&signal);

    let before = catalog.list_all().expect("collection should load");
    source.remove_record(3);
    assert!(Arc::ptr_eq(&before, &catalog.list_all().expect("cached")));

    signal.notify();
    let after = catalog.list_all().expect("collection should reload");
    assert_eq!(after.len(), 2);
    assert_eq!(catalog.load_count(), 2);
}

#[test]
fn maximal_ttl_keeps_collection_cached() {
    let config = CatalogConfig {
        ttl: Duration::MAX,
        ..CatalogConfig::default()
    };
    let catalog = RecordCatalog::with_config(Arc::new(populated_source()), config);

    let first = catalog.list_all().expect("collection should load");
    let second = catalog.list_all().expect("collection should stay cached");
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(catalog.load_count(), 1);
}

#[test]
fn current_day_feeds_birthday_filter() {
    let catalog = RecordCatalog::new(Arc::new(populated_source()));
    assert_eq!(catalog.current_day().expect("blob lookup"), Some(500));

    let record = catalog
        .get_record(2)
        .expect("record should decode")
        .expect("record should exist");
    assert_eq!(record.age(Some(500)), Some(500 - BIRTHDAY_DAY));
    assert!(catalog.get_record(42).expect("lookup").is_none());
}

#[test]
fn get_record_surfaces_decompression_failure() {
    let catalog = RecordCatalog::new(Arc::new(populated_source()));
    let err = catalog.get_record(9).expect_err("garbage record should fail");
    assert!(err.is_record_fatal());
}

#[test]
fn house_roster_joins_decoded_records() {
    let source = populated_source();
    source.insert_blob(
        "house_state",
        house_state_blob(&[(3, "Attic"), (77, "Cellar"), (2, "Kitchen")]),
    );
    let catalog = RecordCatalog::new(Arc::new(source));

    let cats = catalog.house_cats().expect("roster should load");
    assert_eq!(cats.len(), 2);
    assert_eq!(cats[0].name, "Alpha");
    assert_eq!(cats[0].room, "Kitchen");
    assert_eq!(cats[0].sex, Sex::Female);
    assert_eq!(cats[0].class_name.as_deref(), Some(CLASS_NAME));
    assert_eq!(cats[0].age, Some(500 - BIRTHDAY_DAY));
    assert!(cats[0].retired);
    assert_eq!(cats[1].name, "Zelda");
    assert_eq!(cats[1].room, "Attic");
}

#[test]
fn missing_house_state_is_empty_roster() {
    let catalog = RecordCatalog::new(Arc::new(populated_source()));
    assert!(catalog.house_cats().expect("roster lookup").is_empty());
}
