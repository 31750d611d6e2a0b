use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::reader::LeView;

pub const EQUIP_SLOT_COUNT: usize = 5;
const HEADER_PATTERN: [u8; 8] = [0x01, 0x00, 0x00, 0x00, 0x05, 0x00, 0x00, 0x00];
const EMPTY_MARKER: [u8; 5] = [0x00, 0x05, 0x00, 0x00, 0x00];
const ITEM_TAG: u8 = 0x01;
const BOUNDARY_LEAD: u8 = 0xFF;
const BOUNDARY_TAIL: [u8; 4] = [0x05, 0x00, 0x00, 0x00];
const MAX_TERMINAL_TAG: u8 = 3;

const ITEM_MAX_LEN: usize = 128;
const TERMINAL_ID_MAX: usize = 32;
const TERMINAL_ID_MIN_RUN: usize = 2;
const BOUNDARY_SEARCH: usize = 800;
const LAST_BOUNDARY_SEARCH: usize = 1400;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquipSlot {
    pub blob_slot: usize,
    pub start: usize,
    pub end: usize,
    pub item_id: Option<String>,
    /// Slot 4 had no marker but the next record starts right away.
    pub implicit_empty: bool,
}

impl EquipSlot {
    fn empty(blob_slot: usize, start: usize) -> Self {
        Self {
            blob_slot,
            start,
            end: start + EMPTY_MARKER.len(),
            item_id: None,
            implicit_empty: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.item_id.is_none()
    }
}

/// Finds the first header that yields five well-formed slots.
pub fn locate_equipment(view: &LeView<'_>) -> Option<Vec<EquipSlot>> {
    let mut from = 0;
    while let Some(header) = view.find(&HEADER_PATTERN, from) {
        if let Some(slots) = parse_slots(view, header) {
            return Some(slots);
        }
        from = header + 1;
    }
    debug!(len = view.len(), "no equipment table");
    None
}

fn parse_slots(view: &LeView<'_>, header: usize) -> Option<Vec<EquipSlot>> {
    let mut pos = header + HEADER_PATTERN.len();
    let mut slots = Vec::with_capacity(EQUIP_SLOT_COUNT);

    for blob_slot in 0..EQUIP_SLOT_COUNT - 1 {
        if view.matches_at(pos, &EMPTY_MARKER) {
            slots.push(EquipSlot::empty(blob_slot, pos));
            pos += EMPTY_MARKER.len();
            continue;
        }
        if pos >= view.len() || view.u8_at(pos) != ITEM_TAG {
            return None;
        }
        let (item, len) = read_item_string(view, pos + 1)?;
        let next = find_slot_boundary(view, pos + 9 + len)?;
        slots.push(EquipSlot {
            blob_slot,
            start: pos,
            end: next,
            item_id: Some(item),
            implicit_empty: false,
        });
        pos = next;
    }

    slots.push(parse_last_slot(view, pos)?);
    Some(slots)
}

fn parse_last_slot(view: &LeView<'_>, pos: usize) -> Option<EquipSlot> {
    let blob_slot = EQUIP_SLOT_COUNT - 1;
    if view.matches_at(pos, &EMPTY_MARKER) {
        return Some(EquipSlot::empty(blob_slot, pos));
    }

    if pos < view.len() && view.u8_at(pos) == ITEM_TAG {
        let (item, len) = read_item_string(view, pos + 1)?;
        let end = find_last_slot_boundary(view, pos + 9 + len)?;
        return Some(EquipSlot {
            blob_slot,
            start: pos,
            end,
            item_id: Some(item),
            implicit_empty: false,
        });
    }

    if pos + 9 <= view.len()
        && view.u8_at(pos) <= MAX_TERMINAL_TAG
        && has_short_identifier(view, pos + 1)
    {
        return Some(EquipSlot {
            blob_slot,
            start: pos,
            end: pos,
            item_id: None,
            implicit_empty: true,
        });
    }
    None
}

/// Item id after a slot tag: a u64-length string, else a NUL-terminated one.
fn read_item_string(view: &LeView<'_>, len_off: usize) -> Option<(String, usize)> {
    view.slice(len_off, 8)?;
    let text = len_off + 8;

    let declared = view.u64_at(len_off);
    if (1..=ITEM_MAX_LEN as u64).contains(&declared) {
        let len = declared as usize;
        if view.is_printable(text, len) {
            return Some((view.ascii_at(text, len), len));
        }
    }

    let len = view
        .bytes()
        .get(text..)?
        .iter()
        .take(ITEM_MAX_LEN)
        .take_while(|&&b| b != 0)
        .count();
    (len > 0 && view.is_printable(text, len)).then(|| (view.ascii_at(text, len), len))
}

/// True when the u64 at `len_off` frames a 1-32 byte printable id, or a
/// printable run of 2-32 bytes follows the length field.
fn has_short_identifier(view: &LeView<'_>, len_off: usize) -> bool {
    let text = len_off + 8;
    let declared = view.u64_at(len_off);
    if (1..=TERMINAL_ID_MAX as u64).contains(&declared) && view.is_printable(text, declared as usize)
    {
        return true;
    }
    let run = view.printable_run(text, TERMINAL_ID_MAX);
    (TERMINAL_ID_MIN_RUN..=TERMINAL_ID_MAX).contains(&run)
}

fn find_slot_boundary(view: &LeView<'_>, start: usize) -> Option<usize> {
    let end = view.len().saturating_sub(6).min(start + BOUNDARY_SEARCH);
    (start..end)
        .find(|&p| view.u8_at(p) == BOUNDARY_LEAD && view.matches_at(p + 2, &BOUNDARY_TAIL))
        .map(|p| p + 6)
}

fn find_last_slot_boundary(view: &LeView<'_>, start: usize) -> Option<usize> {
    let end = view.len().saturating_sub(10).min(start + LAST_BOUNDARY_SEARCH);
    (start..end)
        .find(|&p| {
            view.u8_at(p) == BOUNDARY_LEAD
                && view.u8_at(p + 1) <= MAX_TERMINAL_TAG
                && has_short_identifier(view, p + 2)
        })
        .map(|p| p + 1)
}
