use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::house::{self, CURRENT_DAY_BLOB, HOUSE_STATE_BLOB};
use crate::record::DecodedRecord;

use super::engine::{Engine, EngineConfig};
use super::error::CoreError;
use super::source::{ChangeFeed, RecordSource};
use super::types::HouseCat;

/// Cache key of the fully decoded collection.
pub const ALL_RECORDS_KEY: &str = "all_decoded_records";
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogConfig {
    pub ttl: Duration,
    pub engine: EngineConfig,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_CACHE_TTL,
            engine: EngineConfig::default(),
        }
    }
}

#[derive(Debug, Clone)]
struct CachedCollection {
    records: Arc<Vec<DecodedRecord>>,
    /// `None` when the TTL runs past what `Instant` can represent.
    expires_at: Option<Instant>,
}

impl CachedCollection {
    fn new(records: Arc<Vec<DecodedRecord>>, ttl: Duration) -> Self {
        Self {
            records,
            expires_at: Instant::now().checked_add(ttl),
        }
    }

    fn fresh(&self) -> Option<Arc<Vec<DecodedRecord>>> {
        let live = self
            .expires_at
            .is_none_or(|expires_at| Instant::now() < expires_at);
        live.then(|| Arc::clone(&self.records))
    }
}

/// Decoded view over a [`RecordSource`], cached for a bounded time.
///
/// Concurrent misses share one decode: callers queue on the load guard and
/// re-check the cache once they hold it.
pub struct RecordCatalog {
    source: Arc<dyn RecordSource>,
    engine: Engine,
    ttl: Duration,
    fast: RwLock<Option<CachedCollection>>,
    backing: Mutex<HashMap<&'static str, CachedCollection>>,
    load_guard: Mutex<()>,
    epoch: AtomicU64,
    loads: AtomicU64,
}

impl RecordCatalog {
    pub fn new(source: Arc<dyn RecordSource>) -> Self {
        Self::with_config(source, CatalogConfig::default())
    }

    pub fn with_config(source: Arc<dyn RecordSource>, config: CatalogConfig) -> Self {
        Self {
            source,
            engine: Engine::with_config(config.engine),
            ttl: config.ttl,
            fast: RwLock::new(None),
            backing: Mutex::new(HashMap::new()),
            load_guard: Mutex::new(()),
            epoch: AtomicU64::new(0),
            loads: AtomicU64::new(0),
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Invalidates the cache whenever `feed` fires, for as long as the catalog lives.
    pub fn watch(self: &Arc<Self>, feed: &dyn ChangeFeed) {
        let catalog = Arc::downgrade(self);
        feed.on_external_change(Arc::new(move || {
            if let Some(catalog) = catalog.upgrade() {
                catalog.invalidate_cache();
            }
        }));
    }

    /// Number of full decodes performed so far.
    pub fn load_count(&self) -> u64 {
        self.loads.load(Ordering::SeqCst)
    }

    fn cached(&self) -> Option<Arc<Vec<DecodedRecord>>> {
        if let Some(hit) = self
            .fast
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .and_then(CachedCollection::fresh)
        {
            return Some(hit);
        }

        let backing = self.backing.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = backing.get(ALL_RECORDS_KEY)?;
        let hit = entry.fresh()?;
        *self.fast.write().unwrap_or_else(PoisonError::into_inner) = Some(entry.clone());
        Some(hit)
    }

    /// Every decodable record, sorted by name then key.
    pub fn list_all(&self) -> Result<Arc<Vec<DecodedRecord>>, CoreError> {
        if let Some(hit) = self.cached() {
            return Ok(hit);
        }

        let _guard = self
            .load_guard
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(hit) = self.cached() {
            debug!("cache filled while waiting for load guard");
            return Ok(hit);
        }

        let epoch = self.epoch.load(Ordering::SeqCst);
        let started = Instant::now();
        let current_day = self.current_day()?;
        let raw = self.source.records()?;
        let records = Arc::new(self.engine.decode_batch(&raw, current_day));
        self.loads.fetch_add(1, Ordering::SeqCst);
        info!(
            stored = raw.len(),
            decoded = records.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "decoded record collection"
        );

        let entry = CachedCollection::new(Arc::clone(&records), self.ttl);
        let mut backing = self.backing.lock().unwrap_or_else(PoisonError::into_inner);
        let mut fast = self.fast.write().unwrap_or_else(PoisonError::into_inner);
        if self.epoch.load(Ordering::SeqCst) == epoch {
            backing.insert(ALL_RECORDS_KEY, entry.clone());
            *fast = Some(entry);
        } else {
            debug!("source changed during load; result not cached");
        }
        Ok(records)
    }

    /// Drops the cached collection from both the fast slot and the backing cache.
    pub fn invalidate_cache(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        let mut backing = self.backing.lock().unwrap_or_else(PoisonError::into_inner);
        let mut fast = self.fast.write().unwrap_or_else(PoisonError::into_inner);
        backing.remove(ALL_RECORDS_KEY);
        *fast = None;
        info!("record cache invalidated");
    }

    /// Decodes one record straight from the source, bypassing the cache.
    pub fn get_record(&self, key: i64) -> Result<Option<DecodedRecord>, CoreError> {
        let Some(bytes) = self.source.fetch_record_bytes(key)? else {
            return Ok(None);
        };
        let current_day = self.current_day()?;
        self.engine.decode_record(key, bytes, current_day).map(Some)
    }

    /// Number of stored rows, decodable or not. Does not touch the cache.
    pub fn record_count(&self) -> Result<usize, CoreError> {
        Ok(self.source.records()?.len())
    }

    pub fn current_day(&self) -> Result<Option<i64>, CoreError> {
        Ok(self
            .source
            .fetch_named_blob(CURRENT_DAY_BLOB)?
            .and_then(|blob| house::parse_current_day(&blob)))
    }

    /// Roster entries joined with their decoded records, sorted by name.
    pub fn house_cats(&self) -> Result<Vec<HouseCat>, CoreError> {
        let Some(blob) = self.source.fetch_named_blob(HOUSE_STATE_BLOB)? else {
            return Ok(Vec::new());
        };
        let entries = self.engine.decode_house_state(&blob);
        if entries.is_empty() {
            return Ok(Vec::new());
        }

        let records = self.list_all()?;
        let by_key: HashMap<i64, &DecodedRecord> = records.iter().map(|r| (r.key, r)).collect();
        let current_day = self.current_day()?;

        let mut cats: Vec<HouseCat> = entries
            .iter()
            .filter_map(|entry| {
                let record = by_key.get(&i64::from(entry.key))?;
                Some(HouseCat::join(entry, record, current_day))
            })
            .collect();
        cats.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(cats)
    }
}
