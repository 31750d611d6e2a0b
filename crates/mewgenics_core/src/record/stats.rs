use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::reader::LeView;
use crate::scan;

pub const STATS_EXPECTED_OFFSET: usize = 0x1CC;
pub const STATS_WINDOW: usize = 0x140;
const STAT_COUNT: usize = 7;
const VECTOR_LEN: usize = STAT_COUNT * 4;
const BASE_RANGE: std::ops::RangeInclusive<i32> = 1..=10;
const BONUS_RANGE: std::ops::RangeInclusive<i32> = -10..=50;

/// Distance from the stats vector to the combat-state block.
pub const COMBAT_ANCHOR_DELTA: usize = 84;
const COMBAT_MIN_SPAN: usize = 13;
const STATUS_MAX_LEN: u32 = 64;

pub const STAT_NAMES: [&str; STAT_COUNT] = ["STR", "DEX", "CON", "INT", "SPD", "CHA", "LCK"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatVector {
    pub str: i32,
    pub dex: i32,
    pub con: i32,
    #[serde(rename = "int")]
    pub int_: i32,
    pub spd: i32,
    pub cha: i32,
    pub luck: i32,
}

impl StatVector {
    pub fn from_array(v: [i32; STAT_COUNT]) -> Self {
        Self {
            str: v[0],
            dex: v[1],
            con: v[2],
            int_: v[3],
            spd: v[4],
            cha: v[5],
            luck: v[6],
        }
    }

    pub fn to_array(&self) -> [i32; STAT_COUNT] {
        [
            self.str, self.dex, self.con, self.int_, self.spd, self.cha, self.luck,
        ]
    }

    pub fn sum(&self) -> i32 {
        self.to_array().iter().sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsLocation {
    pub offset: usize,
    pub base: StatVector,
    pub bonus: Option<StatVector>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatState {
    pub status_effect: String,
    pub hp: i32,
    pub status_offset: usize,
    pub hp_offset: usize,
}

fn read_vector(
    view: &LeView<'_>,
    offset: usize,
    range: &std::ops::RangeInclusive<i32>,
) -> Option<StatVector> {
    view.slice(offset, VECTOR_LEN)?;
    let mut values = [0i32; STAT_COUNT];
    for (i, slot) in values.iter_mut().enumerate() {
        let v = view.i32_at(offset + i * 4);
        if !range.contains(&v) {
            return None;
        }
        *slot = v;
    }
    Some(StatVector::from_array(values))
}

/// Finds the base stat vector nearest the expected offset.
///
/// Candidates are ranked by closeness plus a small sum bonus. When the top
/// candidate has no combat block at its anchor, the best-ranked candidate
/// that does is preferred.
pub fn locate_stats<C>(view: &LeView<'_>, corroborates: C) -> Option<StatsLocation>
where
    C: Fn(&LeView<'_>, usize) -> bool,
{
    let n = view.len();
    if n < VECTOR_LEN {
        return None;
    }
    let lo = STATS_EXPECTED_OFFSET.saturating_sub(STATS_WINDOW);
    let hi = (n - VECTOR_LEN).min(STATS_EXPECTED_OFFSET + STATS_WINDOW);
    if lo > hi {
        return None;
    }

    let candidates = scan::ranked(lo..=hi, |off| {
        let base = read_vector(view, off, &BASE_RANGE)?;
        let distance = off.abs_diff(STATS_EXPECTED_OFFSET) as f64;
        let score = (1000.0 - distance) + f64::from(base.sum()) * 0.1;
        Some((score, base))
    });

    let Some(top) = candidates.first() else {
        debug!(lo, hi, "no stat vector in window");
        return None;
    };
    let chosen = if corroborates(view, top.offset) {
        top
    } else {
        candidates
            .iter()
            .find(|c| corroborates(view, c.offset))
            .unwrap_or(top)
    };

    Some(StatsLocation {
        offset: chosen.offset,
        base: chosen.value,
        bonus: read_vector(view, chosen.offset + VECTOR_LEN, &BONUS_RANGE),
    })
}

/// Validates the length-prefixed status string anchored after a stats vector.
pub fn has_combat_state(view: &LeView<'_>, stats_offset: usize) -> bool {
    status_span(view, stats_offset + COMBAT_ANCHOR_DELTA).is_some()
}

fn status_span(view: &LeView<'_>, anchor: usize) -> Option<(usize, usize)> {
    view.slice(anchor, COMBAT_MIN_SPAN)?;
    let len = view.u32_at(anchor);
    if view.u32_at(anchor + 4) != 0 || len == 0 || len > STATUS_MAX_LEN {
        return None;
    }
    let text = anchor + 8;
    let len = len as usize;
    view.slice(text, len + 4)?;
    view.is_printable(text, len).then_some((text, len))
}

pub fn read_combat_state(view: &LeView<'_>, stats_offset: usize) -> Option<CombatState> {
    let anchor = stats_offset + COMBAT_ANCHOR_DELTA;
    let Some((text, len)) = status_span(view, anchor) else {
        debug!(anchor, "no combat block at anchor");
        return None;
    };
    let hp_offset = text + len;
    Some(CombatState {
        status_effect: view.ascii_at(text, len),
        hp: view.u32_at(hp_offset) as i32,
        status_offset: anchor,
        hp_offset,
    })
}

#[cfg(test)]
mod tests {
    use super::{
        COMBAT_ANCHOR_DELTA, STATS_EXPECTED_OFFSET, StatVector, has_combat_state,
        locate_stats, read_combat_state,
    };
    use crate::reader::LeView;

    fn put_i32s(buf: &mut [u8], off: usize, values: &[i32]) {
        for (i, v) in values.iter().enumerate() {
            buf[off + i * 4..off + i * 4 + 4].copy_from_slice(&v.to_le_bytes());
        }
    }

    fn put_status(buf: &mut [u8], anchor: usize, text: &str, hp: u32) {
        buf[anchor..anchor + 8].copy_from_slice(&(text.len() as u64).to_le_bytes());
        let text_at = anchor + 8;
        buf[text_at..text_at + text.len()].copy_from_slice(text.as_bytes());
        let hp_at = text_at + text.len();
        buf[hp_at..hp_at + 4].copy_from_slice(&hp.to_le_bytes());
    }

    #[test]
    fn picks_vector_at_expected_offset_with_bonus() {
        let mut buf = vec![0u8; 0x400];
        put_i32s(&mut buf, STATS_EXPECTED_OFFSET, &[7, 5, 6, 4, 8, 3, 9]);
        put_i32s(&mut buf, STATS_EXPECTED_OFFSET + 28, &[0, 2, -1, 3, 0, 1, 0]);

        let found = locate_stats(&LeView::new(&buf), has_combat_state).expect("stats present");
        assert_eq!(found.offset, STATS_EXPECTED_OFFSET);
        assert_eq!(found.base, StatVector::from_array([7, 5, 6, 4, 8, 3, 9]));
        assert_eq!(
            found.bonus,
            Some(StatVector::from_array([0, 2, -1, 3, 0, 1, 0]))
        );
    }

    #[test]
    fn out_of_range_bonus_is_absent() {
        let mut buf = vec![0u8; 0x400];
        put_i32s(&mut buf, STATS_EXPECTED_OFFSET, &[1, 1, 1, 1, 1, 1, 1]);
        put_i32s(&mut buf, STATS_EXPECTED_OFFSET + 28, &[0, 0, 0, 99, 0, 0, 0]);

        let found = locate_stats(&LeView::new(&buf), has_combat_state).expect("stats present");
        assert_eq!(found.bonus, None);
    }

    #[test]
    fn empty_window_yields_none() {
        let buf = vec![0u8; 0x400];
        assert!(locate_stats(&LeView::new(&buf), has_combat_state).is_none());
        assert!(locate_stats(&LeView::new(&buf[..20]), has_combat_state).is_none());
    }

    #[test]
    fn combat_state_reads_status_and_hp() {
        let mut buf = vec![0u8; 0x400];
        let stats = 0x100;
        put_status(&mut buf, stats + COMBAT_ANCHOR_DELTA, "Poisoned", 42);

        let combat = read_combat_state(&LeView::new(&buf), stats).expect("combat present");
        assert_eq!(combat.status_effect, "Poisoned");
        assert_eq!(combat.hp, 42);
        assert_eq!(combat.status_offset, stats + COMBAT_ANCHOR_DELTA);
        assert_eq!(combat.hp_offset, stats + COMBAT_ANCHOR_DELTA + 8 + 8);
    }

    #[test]
    fn combat_state_rejects_bad_length_and_text() {
        let mut buf = vec![0u8; 0x400];
        let anchor = 0x100 + COMBAT_ANCHOR_DELTA;
        put_status(&mut buf, anchor, "Ok", 1);
        buf[anchor + 4] = 1;
        assert!(!has_combat_state(&LeView::new(&buf), 0x100));

        buf[anchor + 4] = 0;
        buf[anchor + 8] = 0x07;
        assert!(!has_combat_state(&LeView::new(&buf), 0x100));
    }
}
