use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::reader::LeView;
use crate::scan::{self, TieBreak};
use crate::sex::Sex;

const NAME_LEN_OFFSETS: [usize; 2] = [0x0C, 0x10];
pub(crate) const NAME_START: usize = 0x14;
const NAME_MAX_UNITS: u32 = 128;
const SEX_MARKER_A: usize = 8;
const SEX_MARKER_B: usize = 12;

const FLAGS_AFTER_NAME: usize = 0x10;
const FLAG_RETIRED: i32 = 0x0002;
const FLAG_DEAD: i32 = 0x0020;
const FLAG_DONATED: i32 = 0x4000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    pub sex: Sex,
    /// Offset one past the last name code unit. Falls back to the name start.
    pub name_end: usize,
}

impl Default for Identity {
    fn default() -> Self {
        Self {
            name: String::new(),
            sex: Sex::Unknown,
            name_end: NAME_START,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flags {
    /// Raw 16-bit word, or -1 when it lies past the buffer.
    pub raw: i32,
    pub offset: usize,
    pub retired: bool,
    pub dead: bool,
    pub donated: bool,
}

impl Flags {
    pub fn from_raw(raw: i32, offset: usize) -> Self {
        let has = |mask: i32| raw >= 0 && raw & mask != 0;
        Self {
            raw,
            offset,
            retired: has(FLAG_RETIRED),
            dead: has(FLAG_DEAD),
            donated: has(FLAG_DONATED),
        }
    }
}

/// Picks the name-length slot whose name is followed by plausible sex markers.
pub fn locate_identity(view: &LeView<'_>) -> Identity {
    let winner = scan::best(NAME_LEN_OFFSETS, TieBreak::FirstSeen, |len_off| {
        read_name_at(view, len_off)
    });

    match winner {
        Some(found) => found.value,
        None => {
            debug!(len = view.len(), "no viable name length slot");
            Identity::default()
        }
    }
}

fn read_name_at(view: &LeView<'_>, len_off: usize) -> Option<(i32, Identity)> {
    view.slice(len_off, 4)?;
    let units = view.u32_at(len_off);
    if units > NAME_MAX_UNITS {
        return None;
    }
    let end = NAME_START + units as usize * 2;
    if end > view.len() {
        return None;
    }

    let name = view.utf16_at(NAME_START, units as usize);
    let mut score = 0;
    let mut sex = Sex::Unknown;

    if view.slice(end + SEX_MARKER_B, 2).is_some() {
        let a = view.u16_at(end + SEX_MARKER_A);
        let b = view.u16_at(end + SEX_MARKER_B);
        match (Sex::from_raw(a), Sex::from_raw(b)) {
            (Some(found), _) if a == b => {
                sex = found;
                score += 4;
            }
            (Some(found), _) | (None, Some(found)) => {
                sex = found;
                score += 2;
            }
            (None, None) => {}
        }
    }

    if !name.is_empty() {
        score += 1;
    }

    Some((
        score,
        Identity {
            name,
            sex,
            name_end: end,
        },
    ))
}

pub fn read_flags(view: &LeView<'_>, name_end: usize) -> Flags {
    let offset = name_end + FLAGS_AFTER_NAME;
    let raw = match view.slice(offset, 2) {
        Some(_) => i32::from(view.u16_at(offset)),
        None => -1,
    };
    Flags::from_raw(raw, offset)
}
