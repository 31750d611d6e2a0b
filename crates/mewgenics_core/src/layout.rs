use std::fmt;
use std::io;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByteRange {
    pub start: usize,
    pub end: usize,
}

impl ByteRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn with_len(start: usize, len: usize) -> Self {
        Self {
            start,
            end: start.saturating_add(len),
        }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn overlaps(&self, other: &ByteRange) -> bool {
        self.start < other.end && other.start < self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegionId {
    Name,
    Flags,
    Stats,
    Bonus,
    Combat,
    Birthday,
    Mutations,
    Equipment,
    Abilities,
}

impl RegionId {
    pub fn as_str(&self) -> &'static str {
        match *self {
            Self::Name => "name",
            Self::Flags => "flags",
            Self::Stats => "stats",
            Self::Bonus => "bonus",
            Self::Combat => "combat",
            Self::Birthday => "birthday",
            Self::Mutations => "mutations",
            Self::Equipment => "equipment",
            Self::Abilities => "abilities",
        }
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionLayout {
    pub id: RegionId,
    pub range: ByteRange,
}

/// Byte ranges the locators claimed inside one decompressed buffer.
///
/// Unlike a parsed file this never covers the whole buffer; unlocated bytes
/// between regions are expected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordLayout {
    pub buffer_len: usize,
    pub regions: Vec<RegionLayout>,
}

impl RecordLayout {
    pub fn new(buffer_len: usize, mut regions: Vec<RegionLayout>) -> Self {
        regions.sort_by_key(|r| (r.range.start, r.range.end));
        Self {
            buffer_len,
            regions,
        }
    }

    pub fn get(&self, id: RegionId) -> Option<ByteRange> {
        self.regions.iter().find(|r| r.id == id).map(|r| r.range)
    }

    pub fn validate(&self) -> io::Result<()> {
        let mut previous_start = 0usize;
        for region in &self.regions {
            if region.range.end < region.range.start {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!(
                        "invalid region range {:?}: {}..{}",
                        region.id, region.range.start, region.range.end
                    ),
                ));
            }
            if region.range.end > self.buffer_len {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!(
                        "region {:?} ends at {}, buffer length {}",
                        region.id, region.range.end, self.buffer_len
                    ),
                ));
            }
            if region.range.start < previous_start {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("regions out of order at {:?}", region.id),
                ));
            }
            previous_start = region.range.start;
        }
        Ok(())
    }

    /// Pairs of regions claiming the same bytes.
    pub fn overlapping(&self) -> Vec<(RegionId, RegionId)> {
        let mut out = Vec::new();
        for (i, a) in self.regions.iter().enumerate() {
            for b in &self.regions[i + 1..] {
                if a.range.overlaps(&b.range) {
                    out.push((a.id, b.id));
                }
            }
        }
        out
    }
}
