use std::sync::Arc;

use rayon::ThreadPool;
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::decompress::{self, DecodedBuffer, DecompressionVariant};
use crate::house::{self, HouseCatEntry};
use crate::record::{self, DecodedRecord, MIN_RECORD_LEN, RawRecord};

use super::error::{CoreError, CoreErrorCode};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineConfig {
    /// Batch decode pool size; `None` uses rayon's global pool.
    pub worker_threads: Option<usize>,
}

#[derive(Debug, Default, Clone)]
pub struct Engine {
    config: EngineConfig,
    /// Built once from `worker_threads`; clones share it.
    pool: Option<Arc<ThreadPool>>,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let pool = config.worker_threads.and_then(|threads| {
            match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
                Ok(pool) => Some(Arc::new(pool)),
                Err(e) => {
                    warn!(threads, error = %e, "falling back to the global pool");
                    None
                }
            }
        });
        Self { config, pool }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn decode_record<B: AsRef<[u8]>>(
        &self,
        key: i64,
        bytes: B,
        current_day: Option<i64>,
    ) -> Result<DecodedRecord, CoreError> {
        let buffer = decompress::decompress(bytes.as_ref()).map_err(|e| {
            CoreError::new(e.code, format!("record {key}: {}", e.message))
        })?;
        if buffer.bytes.len() < MIN_RECORD_LEN {
            return Err(CoreError::new(
                CoreErrorCode::RecordTooSmall,
                format!(
                    "record {key}: blob too small after decompress ({} bytes)",
                    buffer.bytes.len()
                ),
            ));
        }
        debug!(key, len = buffer.bytes.len(), variant = %buffer.variant, "record decompressed");
        Ok(record::decode_buffer(key, buffer, current_day))
    }

    /// Decodes bytes that were already decompressed under `variant`.
    pub fn redecode_from_buffer(
        &self,
        key: i64,
        bytes: Vec<u8>,
        variant: DecompressionVariant,
        current_day: Option<i64>,
    ) -> DecodedRecord {
        record::decode_buffer(
            key,
            DecodedBuffer::from_decompressed(bytes, variant),
            current_day,
        )
    }

    pub fn decode_house_state(&self, blob: &[u8]) -> Vec<HouseCatEntry> {
        house::decode_house_state(blob)
    }

    /// Decodes every record in parallel, skipping failures, sorted by name then key.
    pub fn decode_batch(&self, records: &[RawRecord], current_day: Option<i64>) -> Vec<DecodedRecord> {
        let run = || {
            records
                .par_iter()
                .filter_map(|raw| match self.decode_record(raw.key, &raw.bytes, current_day) {
                    Ok(decoded) => Some(decoded),
                    Err(e) => {
                        warn!(key = raw.key, error = %e, "skipping undecodable record");
                        None
                    }
                })
                .collect::<Vec<_>>()
        };

        let mut decoded = match &self.pool {
            Some(pool) => pool.install(run),
            None => run(),
        };

        decoded.sort_by(|a, b| a.name().cmp(b.name()).then(a.key.cmp(&b.key)));
        decoded
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{Engine, EngineConfig};
    use crate::core_api::CoreErrorCode;
    use crate::record::RawRecord;

    #[test]
    fn undersized_buffer_is_record_fatal() {
        let blob = lz4_flex::block::compress_prepend_size(&[1, 2, 3, 4, 5]);
        let err = Engine::new()
            .decode_record(9, blob, None)
            .expect_err("five bytes is below the minimum");
        assert_eq!(err.code, CoreErrorCode::RecordTooSmall);
        assert!(err.message.contains("record 9"));
    }

    #[test]
    fn batch_skips_failures() {
        let good = lz4_flex::block::compress_prepend_size(&[0u8; 64]);
        let records = vec![
            RawRecord { key: 2, bytes: good.clone() },
            RawRecord { key: 3, bytes: vec![0xFF; 3] },
            RawRecord { key: 1, bytes: good },
        ];

        let engine = Engine::with_config(EngineConfig {
            worker_threads: Some(2),
        });
        let decoded = engine.decode_batch(&records, None);
        let keys: Vec<i64> = decoded.iter().map(|r| r.key).collect();
        assert_eq!(keys, vec![1, 2]);
    }

    #[test]
    fn configured_pool_is_built_once_and_shared() {
        let engine = Engine::with_config(EngineConfig {
            worker_threads: Some(3),
        });
        let pool = engine.pool.clone().expect("pool should build");
        assert_eq!(pool.current_num_threads(), 3);

        let good = lz4_flex::block::compress_prepend_size(&[0u8; 64]);
        let records = vec![RawRecord { key: 1, bytes: good }];
        for _ in 0..3 {
            assert_eq!(engine.decode_batch(&records, None).len(), 1);
        }
        let after = engine.pool.as_ref().expect("pool should persist");
        assert!(Arc::ptr_eq(&pool, after));

        let copy = engine.clone();
        assert!(Arc::ptr_eq(&pool, copy.pool.as_ref().expect("clone shares pool")));
        assert!(Engine::new().pool.is_none());
    }
}
