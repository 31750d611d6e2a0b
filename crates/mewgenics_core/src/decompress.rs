use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::core_api::{CoreError, CoreErrorCode};
use crate::reader::LeView;

const SIZE_HEADER_LEN: usize = 4;
const MAX_DECLARED_SIZE: u32 = 10_000_000;

/// Output sizes tried, in order, when a blob carries no size header.
pub const HEADERLESS_CANDIDATE_SIZES: [usize; 6] =
    [0x2000, 0x3000, 0x4000, 0x5000, 0x6000, 0x8000];

/// Which strategy recovered the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecompressionVariant {
    Header,
    Headerless { size: usize },
}

impl fmt::Display for DecompressionVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Header => f.write_str("header"),
            Self::Headerless { size } => write!(f, "headerless({size})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedBuffer {
    pub bytes: Vec<u8>,
    pub variant: DecompressionVariant,
}

impl DecodedBuffer {
    /// Wraps bytes that are already decompressed, e.g. a cached blob.
    pub fn from_decompressed(bytes: Vec<u8>, variant: DecompressionVariant) -> Self {
        Self { bytes, variant }
    }
}

pub fn decompress(blob: &[u8]) -> Result<DecodedBuffer, CoreError> {
    if let Some(bytes) = decompress_with_header(blob) {
        return Ok(DecodedBuffer {
            bytes,
            variant: DecompressionVariant::Header,
        });
    }

    for size in HEADERLESS_CANDIDATE_SIZES {
        if let Some(bytes) = decompress_headerless(blob, size) {
            return Ok(DecodedBuffer {
                bytes,
                variant: DecompressionVariant::Headerless { size },
            });
        }
    }

    Err(CoreError::new(
        CoreErrorCode::Decompression,
        format!(
            "all decompression strategies failed for {}-byte blob",
            blob.len()
        ),
    ))
}

fn decompress_with_header(blob: &[u8]) -> Option<Vec<u8>> {
    if blob.len() < SIZE_HEADER_LEN {
        return None;
    }

    let declared = LeView::new(blob).u32_at(0);
    if declared == 0 || declared >= MAX_DECLARED_SIZE {
        return None;
    }

    let mut out = vec![0u8; declared as usize];
    match lz4_flex::block::decompress_into(&blob[SIZE_HEADER_LEN..], &mut out) {
        Ok(produced) if produced == out.len() => Some(out),
        Ok(produced) => {
            trace!(declared, produced, "size header disagrees with decoded length");
            None
        }
        Err(e) => {
            trace!(declared, error = %e, "size-header decode failed");
            None
        }
    }
}

fn decompress_headerless(blob: &[u8], size: usize) -> Option<Vec<u8>> {
    let mut out = vec![0u8; size];
    match lz4_flex::block::decompress_into(blob, &mut out) {
        Ok(produced) if produced > 0 => {
            out.truncate(produced);
            Some(out)
        }
        Ok(_) => None,
        Err(e) => {
            trace!(size, error = %e, "headerless decode failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{DecompressionVariant, decompress};
    use crate::core_api::CoreErrorCode;

    fn sample(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8 ^ (i / 97) as u8).collect()
    }

    #[test]
    fn header_blob_recovers_exact_bytes() {
        let original = sample(3000);
        let blob = lz4_flex::block::compress_prepend_size(&original);

        let decoded = decompress(&blob).expect("header blob should decode");
        assert_eq!(decoded.variant, DecompressionVariant::Header);
        assert_eq!(decoded.bytes, original);
    }

    #[test]
    fn headerless_blob_uses_first_fitting_candidate() {
        let original = sample(0x3000);
        let blob = lz4_flex::block::compress(&original);

        let decoded = decompress(&blob).expect("headerless blob should decode");
        assert_eq!(decoded.bytes, original);
        assert_eq!(
            decoded.variant,
            DecompressionVariant::Headerless { size: 0x3000 }
        );
    }

    #[test]
    fn garbage_exhausts_every_strategy() {
        let err = decompress(&[0xFF; 3]).expect_err("three bytes cannot decode");
        assert_eq!(err.code, CoreErrorCode::Decompression);
        assert!(err.is_record_fatal());
    }
}
