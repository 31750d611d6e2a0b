use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::reader::LeView;

const RUN_ANCHOR: &str = "DefaultMove";
const RUN_ITEM_MAX_LEN: u64 = 96;
const RUN_MAX_ITEMS: usize = 32;
const RUN_MIN_ITEMS: usize = 11;
const TAIL_ENTRY_COUNT: usize = 3;
const TIER_RANGE: std::ops::RangeInclusive<u32> = 1..=50;
const PASSIVE_RUN_INDEX: usize = 10;

const ACTIVE_LABELS: [&str; 6] = [
    "Active1 (DefaultMove)",
    "Active2 (BasicAttack)",
    "Active3",
    "Active4",
    "Active5",
    "Active6",
];
const TAIL_LABELS: [&str; TAIL_ENTRY_COUNT] = ["Passive2", "Disorder1", "Disorder2"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AbilityKind {
    /// Member of the contiguous u64-prefixed run.
    RunEntry,
    /// Standalone u64-prefixed id followed by a u32 tier.
    TierEntry,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilitySlot {
    pub label: String,
    pub kind: AbilityKind,
    pub ability_id: String,
    pub tier: Option<u32>,
    pub run_start: Option<usize>,
    pub run_end: Option<usize>,
    pub run_index: Option<usize>,
    pub record_offset: Option<usize>,
    pub byte_length: Option<usize>,
}

#[derive(Debug)]
struct RunItem {
    offset: usize,
    value: String,
}

#[derive(Debug)]
struct TierItem {
    offset: usize,
    len: usize,
    value: String,
    tier: u32,
}

#[derive(Debug)]
struct AbilityRun {
    items: Vec<RunItem>,
    end: usize,
    passive_tier: u32,
    tail: Vec<TierItem>,
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn parse_run(view: &LeView<'_>, start: usize) -> (Vec<RunItem>, usize) {
    let mut items = Vec::new();
    let mut at = start;
    while items.len() < RUN_MAX_ITEMS {
        if view.slice(at, 8).is_none() {
            break;
        }
        let len = view.u64_at(at);
        if len == 0 || len > RUN_ITEM_MAX_LEN {
            break;
        }
        let len = len as usize;
        if !view.is_printable(at + 8, len) {
            break;
        }
        let value = view.ascii_at(at + 8, len);
        if !is_identifier(&value) {
            break;
        }
        items.push(RunItem { offset: at, value });
        at += 8 + len;
    }
    (items, at)
}

fn parse_tier_entries(view: &LeView<'_>, start: usize) -> Vec<TierItem> {
    let mut out = Vec::with_capacity(TAIL_ENTRY_COUNT);
    let mut at = start;
    for _ in 0..TAIL_ENTRY_COUNT {
        if view.slice(at, 8).is_none() {
            break;
        }
        let len = view.u64_at(at);
        if len == 0 || len > RUN_ITEM_MAX_LEN {
            break;
        }
        let len = len as usize;
        if view.slice(at + 8, len + 4).is_none() || !view.is_printable(at + 8, len) {
            break;
        }
        let tier = view.u32_at(at + 8 + len);
        if !TIER_RANGE.contains(&tier) {
            break;
        }
        out.push(TierItem {
            offset: at,
            len,
            value: view.ascii_at(at + 8, len),
            tier,
        });
        at += 8 + len + 4;
    }
    out
}

fn find_primary_run(view: &LeView<'_>) -> Option<AbilityRun> {
    let n = view.len();
    let anchor_len = RUN_ANCHOR.len() as u64;
    for start in 0..n.saturating_sub(32) {
        // Cheap pre-check: the first item must be the anchor.
        if view.u64_at(start) != anchor_len || !view.matches_at(start + 8, RUN_ANCHOR.as_bytes()) {
            continue;
        }
        let (items, end) = parse_run(view, start);
        if items.len() < RUN_MIN_ITEMS {
            continue;
        }
        if view.slice(end, 4).is_none() {
            continue;
        }
        let passive_tier = view.u32_at(end);
        if !TIER_RANGE.contains(&passive_tier) {
            continue;
        }
        let tail = parse_tier_entries(view, end + 4);
        if tail.len() != TAIL_ENTRY_COUNT {
            continue;
        }
        return Some(AbilityRun {
            items,
            end,
            passive_tier,
            tail,
        });
    }
    None
}

/// Decodes the ability run anchored at `DefaultMove` into labelled slots.
pub fn locate_abilities(view: &LeView<'_>) -> Vec<AbilitySlot> {
    let Some(run) = find_primary_run(view) else {
        debug!(len = view.len(), "no ability run");
        return Vec::new();
    };

    let run_start = run.items.first().map(|item| item.offset);
    let run_entry = |label: &str, index: usize, tier: Option<u32>| AbilitySlot {
        label: label.to_string(),
        kind: AbilityKind::RunEntry,
        ability_id: run.items[index].value.clone(),
        tier,
        run_start,
        run_end: Some(run.end),
        run_index: Some(index),
        record_offset: None,
        byte_length: None,
    };

    let mut slots: Vec<AbilitySlot> = ACTIVE_LABELS
        .iter()
        .enumerate()
        .take(run.items.len())
        .map(|(i, label)| run_entry(*label, i, None))
        .collect();

    if run.items.len() > PASSIVE_RUN_INDEX {
        slots.push(run_entry(
            "Passive1",
            PASSIVE_RUN_INDEX,
            Some(run.passive_tier),
        ));
    }

    slots.extend(run.tail.iter().zip(TAIL_LABELS).map(|(entry, label)| AbilitySlot {
        label: label.to_string(),
        kind: AbilityKind::TierEntry,
        ability_id: entry.value.clone(),
        tier: Some(entry.tier),
        run_start: None,
        run_end: None,
        run_index: None,
        record_offset: Some(entry.offset),
        byte_length: Some(entry.len),
    }));
    slots
}
