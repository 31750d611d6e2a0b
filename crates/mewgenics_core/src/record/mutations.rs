use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::reader::LeView;
use crate::scan::{self, TieBreak};

pub const MUTATION_SLOT_COUNT: usize = 14;
const HEADER_LEN: usize = 16;
const SLOT_STRIDE: usize = 20;
pub(crate) const TABLE_LEN: usize = HEADER_LEN + MUTATION_SLOT_COUNT * SLOT_STRIDE;
/// Slots that must repeat the coat id (or hold zero) for a table to count.
pub const MIN_AGREEING_SLOTS: usize = 10;

const SCALE_RANGE: std::ops::RangeInclusive<f32> = 0.05..=20.0;
const COAT_MAX: u32 = 20_000;
const T1_MAX: u32 = 500;
const T2_MAX: u32 = 5_000;
const T2_UNSET: u32 = 0xFFFF_FFFF;

const SLOT_LABELS: [(&str, MutationCategory); MUTATION_SLOT_COUNT] = [
    ("Eyes", MutationCategory::Appearance),
    ("Ears", MutationCategory::Appearance),
    ("Tail", MutationCategory::Appearance),
    ("Body", MutationCategory::Appearance),
    ("Pattern", MutationCategory::Appearance),
    ("Color 1", MutationCategory::Appearance),
    ("Color 2", MutationCategory::Appearance),
    ("Color 3", MutationCategory::Appearance),
    ("Mutation 1", MutationCategory::Mutation),
    ("Mutation 2", MutationCategory::Mutation),
    ("Mutation 3", MutationCategory::Mutation),
    ("Mutation 4", MutationCategory::Mutation),
    ("Mutation 5", MutationCategory::Mutation),
    ("Mutation 6", MutationCategory::Mutation),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MutationCategory {
    Appearance,
    Mutation,
    Unknown,
}

impl MutationCategory {
    pub fn as_str(&self) -> &'static str {
        match *self {
            Self::Appearance => "Appearance",
            Self::Mutation => "Mutation",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for MutationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Label and category for a 1-based slot index.
pub fn slot_info(slot_index: usize) -> (String, MutationCategory) {
    match slot_index
        .checked_sub(1)
        .and_then(|i| SLOT_LABELS.get(i))
    {
        Some((label, category)) => ((*label).to_string(), *category),
        None => (format!("Slot {slot_index}"), MutationCategory::Unknown),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationSlot {
    pub slot_index: usize,
    pub label: String,
    pub category: MutationCategory,
    pub slot_id: u32,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationTable {
    pub base_offset: usize,
    pub coat_id: u32,
    pub coat_offset: usize,
    pub slots: Vec<MutationSlot>,
}

fn slot_offset(base: usize, i: usize) -> usize {
    base + HEADER_LEN + i * SLOT_STRIDE
}

fn agreeing_slots(view: &LeView<'_>, base: usize) -> Option<usize> {
    let scale = view.f32_at(base);
    let coat = view.u32_at(base + 4);
    let t1 = view.u32_at(base + 8);
    let t2 = view.u32_at(base + 12);

    // NaN fails `contains`.
    if !SCALE_RANGE.contains(&scale) {
        return None;
    }
    if coat == 0 || coat > COAT_MAX || t1 > T1_MAX {
        return None;
    }
    if t2 != T2_UNSET && t2 > T2_MAX {
        return None;
    }

    let ok = (0..MUTATION_SLOT_COUNT)
        .filter(|&i| {
            let c = view.u32_at(slot_offset(base, i) + 4);
            c == coat || c == 0
        })
        .count();
    Some(ok)
}

/// Scans every base offset for the cosmetic/mutation table.
///
/// Among tables clearing [`MIN_AGREEING_SLOTS`], more agreeing slots wins,
/// then the higher base offset.
pub fn locate_mutations(view: &LeView<'_>) -> Option<MutationTable> {
    let n = view.len();
    if n < TABLE_LEN {
        return None;
    }

    let winner = scan::best(0..=n - TABLE_LEN, TieBreak::FirstSeen, |base| {
        let ok = agreeing_slots(view, base)?;
        (ok >= MIN_AGREEING_SLOTS).then_some((ok * 1000 + base, ()))
    });
    let Some(winner) = winner else {
        debug!(len = n, "no mutation table");
        return None;
    };

    let base = winner.offset;
    let slots = (0..MUTATION_SLOT_COUNT)
        .map(|i| {
            let offset = slot_offset(base, i);
            let (label, category) = slot_info(i + 1);
            MutationSlot {
                slot_index: i + 1,
                label,
                category,
                slot_id: view.u32_at(offset),
                offset,
            }
        })
        .collect();

    Some(MutationTable {
        base_offset: base,
        coat_id: view.u32_at(base + 4),
        coat_offset: base + 4,
        slots,
    })
}
