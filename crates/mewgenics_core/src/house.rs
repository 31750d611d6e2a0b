use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::reader::LeView;

/// Named blob holding the roster.
pub const HOUSE_STATE_BLOB: &str = "house_state";
/// Named blob holding the in-game day counter as ASCII digits.
pub const CURRENT_DAY_BLOB: &str = "current_day";

const HOUSE_HEADER_LEN: usize = 8;
const HOUSE_MAX_ENTRIES: u32 = 512;
const ENTRY_FIXED_LEN: usize = 16;
const ENTRY_TAIL_LEN: usize = 24;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HouseCatEntry {
    pub key: u32,
    pub room: String,
    pub unknown: u32,
    pub p0: f64,
    pub p1: f64,
    pub p2: f64,
}

/// Decodes the roster blob. Truncation stops the walk and keeps what was read.
pub fn decode_house_state(blob: &[u8]) -> Vec<HouseCatEntry> {
    let view = LeView::new(blob);
    let mut entries = Vec::new();
    if view.len() < HOUSE_HEADER_LEN {
        return entries;
    }

    let version = view.u32_at(0);
    let count = view.u32_at(4);
    if version != 0 || count > HOUSE_MAX_ENTRIES {
        debug!(version, count, "house_state header rejected");
        return entries;
    }

    let mut off = HOUSE_HEADER_LEN;
    for index in 0..count {
        let Some(entry) = decode_entry(&view, off) else {
            debug!(index, offset = off, "house_state truncated");
            break;
        };
        off = entry.1;
        entries.push(entry.0);
    }
    entries
}

fn decode_entry(view: &LeView<'_>, off: usize) -> Option<(HouseCatEntry, usize)> {
    view.slice(off, ENTRY_FIXED_LEN)?;
    let key = view.u32_at(off);
    let unknown = view.u32_at(off + 4);
    let room_len = usize::try_from(view.u64_at(off + 8)).ok()?;

    let room_off = off + ENTRY_FIXED_LEN;
    view.slice(room_off, room_len)?;
    let room = view.ascii_at(room_off, room_len);

    let tail = room_off + room_len;
    view.slice(tail, ENTRY_TAIL_LEN)?;

    let entry = HouseCatEntry {
        key,
        room,
        unknown,
        p0: view.f64_at(tail),
        p1: view.f64_at(tail + 8),
        p2: view.f64_at(tail + 16),
    };
    Some((entry, tail + ENTRY_TAIL_LEN))
}

/// Parses the `current_day` blob: ASCII decimal with trailing NULs or whitespace.
pub fn parse_current_day(blob: &[u8]) -> Option<i64> {
    let text = std::str::from_utf8(blob).ok()?;
    text.trim_end_matches(|c: char| c == '\0' || c.is_whitespace())
        .trim_start()
        .parse()
        .ok()
}
