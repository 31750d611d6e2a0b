use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::record::RawRecord;

use super::error::CoreError;

/// Storage the catalog reads raw records and named blobs from.
pub trait RecordSource: Send + Sync {
    fn fetch_record_bytes(&self, key: i64) -> Result<Option<Vec<u8>>, CoreError>;

    /// Auxiliary blobs such as `house_state` and `current_day`.
    fn fetch_named_blob(&self, name: &str) -> Result<Option<Vec<u8>>, CoreError>;

    /// Every stored record, in key order.
    fn records(&self) -> Result<Vec<RawRecord>, CoreError>;
}

pub type ChangeCallback = Arc<dyn Fn() + Send + Sync>;

/// Something that can announce that the underlying save data changed.
pub trait ChangeFeed {
    fn on_external_change(&self, callback: ChangeCallback);
}

/// In-process change feed; `notify` runs every subscriber in order.
///
/// Callbacks run outside the subscriber lock, so they may subscribe or
/// notify again. Subscribers added during a notify are not called by it.
#[derive(Default)]
pub struct ChangeSignal {
    subscribers: Mutex<Vec<ChangeCallback>>,
}

impl ChangeSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notify(&self) {
        let subscribers: Vec<ChangeCallback> = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for callback in &subscribers {
            callback();
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl ChangeFeed for ChangeSignal {
    fn on_external_change(&self, callback: ChangeCallback) {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(callback);
    }
}

#[derive(Debug, Default)]
pub struct MemorySource {
    records: RwLock<BTreeMap<i64, Vec<u8>>>,
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_record(&self, key: i64, bytes: Vec<u8>) {
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, bytes);
    }

    pub fn remove_record(&self, key: i64) -> Option<Vec<u8>> {
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&key)
    }

    pub fn insert_blob(&self, name: impl Into<String>, bytes: Vec<u8>) {
        self.blobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), bytes);
    }
}

impl RecordSource for MemorySource {
    fn fetch_record_bytes(&self, key: i64) -> Result<Option<Vec<u8>>, CoreError> {
        Ok(self
            .records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned())
    }

    fn fetch_named_blob(&self, name: &str) -> Result<Option<Vec<u8>>, CoreError> {
        Ok(self
            .blobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned())
    }

    fn records(&self) -> Result<Vec<RawRecord>, CoreError> {
        Ok(self
            .records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(&key, bytes)| RawRecord {
                key,
                bytes: bytes.clone(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::{ChangeFeed, ChangeSignal, MemorySource, RecordSource};

    #[test]
    fn memory_source_round_trips_records_and_blobs() {
        let source = MemorySource::new();
        source.insert_record(5, vec![1, 2]);
        source.insert_record(3, vec![9]);
        source.insert_blob("current_day", b"10".to_vec());

        let keys: Vec<i64> = source
            .records()
            .expect("memory source never fails")
            .iter()
            .map(|r| r.key)
            .collect();
        assert_eq!(keys, vec![3, 5]);
        assert_eq!(source.fetch_record_bytes(5).expect("lookup"), Some(vec![1, 2]));
        assert_eq!(source.fetch_record_bytes(6).expect("lookup"), None);
        assert_eq!(
            source.fetch_named_blob("current_day").expect("lookup"),
            Some(b"10".to_vec())
        );
    }

    #[test]
    fn change_signal_reaches_every_subscriber() {
        let signal = ChangeSignal::new();
        let hits = Arc::new(AtomicUsize::new(0));
        for _ in 0..2 {
            let hits = Arc::clone(&hits);
            signal.on_external_change(Arc::new(move || {
                hits.fetch_add(1, Ordering::SeqCst);
            }));
        }

        signal.notify();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert_eq!(signal.subscriber_count(), 2);
    }

    #[test]
    fn callbacks_may_reenter_the_signal() {
        let signal = Arc::new(ChangeSignal::new());
        let hits = Arc::new(AtomicUsize::new(0));

        let weak = Arc::downgrade(&signal);
        let counter = Arc::clone(&hits);
        signal.on_external_change(Arc::new(move || {
            let Some(signal) = weak.upgrade() else {
                return;
            };
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                let inner = Arc::clone(&counter);
                signal.on_external_change(Arc::new(move || {
                    inner.fetch_add(10, Ordering::SeqCst);
                }));
                signal.notify();
            }
        }));

        signal.notify();
        // outer call, then the nested notify reaches both subscribers
        assert_eq!(hits.load(Ordering::SeqCst), 12);
        assert_eq!(signal.subscriber_count(), 2);
    }
}
