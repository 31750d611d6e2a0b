use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::reader::LeView;
use crate::scan::{self, TieBreak};

const MIN_BUFFER_LEN: usize = 64;
const TAIL_WINDOW: usize = 2048;
const CLASS_NAME_MIN: u64 = 3;
const CLASS_NAME_MAX: u64 = 64;
const PADDING_AFTER_NAME: usize = 12;
pub const MAX_AGE_DAYS: i64 = 500_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BirthdayRecord {
    pub class_name: String,
    pub birthday_day: i64,
    /// Offset of the day counter.
    pub offset: usize,
}

/// Searches the buffer tail first, then the whole buffer.
///
/// A record is a u64-prefixed printable class name, 12 unchecked bytes, an
/// i64 day and an i64 sentinel of -1. With a current day, only births
/// between 0 and [`MAX_AGE_DAYS`] days ago qualify.
pub fn locate_birthday(view: &LeView<'_>, current_day: Option<i64>) -> Option<BirthdayRecord> {
    let n = view.len();
    if n < MIN_BUFFER_LEN {
        return None;
    }

    let found = scan_range(view, n.saturating_sub(TAIL_WINDOW), n, current_day)
        .or_else(|| scan_range(view, 0, n, current_day));
    if found.is_none() {
        debug!(len = n, ?current_day, "no birthday record");
    }
    found
}

fn scan_range(
    view: &LeView<'_>,
    start: usize,
    end: usize,
    current_day: Option<i64>,
) -> Option<BirthdayRecord> {
    let stop = start.max(end.saturating_sub(8));
    let offsets = (start..stop).take_while(|off| off + 8 <= view.len());

    scan::best(offsets, TieBreak::LastSeen, |off| {
        let record = candidate_at(view, off, current_day)?;
        Some((record.offset, record))
    })
    .map(|found| found.value)
}

fn candidate_at(view: &LeView<'_>, off: usize, current_day: Option<i64>) -> Option<BirthdayRecord> {
    let len = view.u64_at(off);
    if !(CLASS_NAME_MIN..=CLASS_NAME_MAX).contains(&len) {
        return None;
    }
    let len = len as usize;
    let text = off + 8;
    let day_offset = text + len + PADDING_AFTER_NAME;
    view.slice(day_offset, 16)?;
    if !view.is_printable(text, len) {
        return None;
    }

    let day = view.i64_at(day_offset);
    if view.i64_at(day_offset + 8) != -1 {
        return None;
    }
    if let Some(today) = current_day {
        let age = today.checked_sub(day)?;
        if !(0..=MAX_AGE_DAYS).contains(&age) {
            return None;
        }
    }

    Some(BirthdayRecord {
        class_name: view.ascii_at(text, len),
        birthday_day: day,
        offset: day_offset,
    })
}

#[cfg(test)]
mod tests {
    use super::locate_birthday;
    use crate::reader::LeView;

    fn put_record(buf: &mut [u8], off: usize, class: &str, day: i64, sentinel: i64) -> usize {
        buf[off..off + 8].copy_from_slice(&(class.len() as u64).to_le_bytes());
        buf[off + 8..off + 8 + class.len()].copy_from_slice(class.as_bytes());
        let day_at = off + 8 + class.len() + 12;
        buf[day_at..day_at + 8].copy_from_slice(&day.to_le_bytes());
        buf[day_at + 8..day_at + 16].copy_from_slice(&sentinel.to_le_bytes());
        day_at
    }

    #[test]
    fn finds_record_and_reports_day_offset() {
        let mut buf = vec![0u8; 0x1000];
        let day_at = put_record(&mut buf, 0xF00, "Fighter", 120, -1);

        let found = locate_birthday(&LeView::new(&buf), Some(500)).expect("record present");
        assert_eq!(found.class_name, "Fighter");
        assert_eq!(found.birthday_day, 120);
        assert_eq!(found.offset, day_at);
    }

    #[test]
    fn age_filter_rejects_future_births() {
        let mut buf = vec![0u8; 0x1000];
        put_record(&mut buf, 0xF00, "Fighter", 120, -1);

        assert!(locate_birthday(&LeView::new(&buf), Some(100)).is_none());
        assert!(locate_birthday(&LeView::new(&buf), None).is_some());
    }

    #[test]
    fn falls_back_to_full_scan_outside_tail() {
        let mut buf = vec![0u8; 0x1800];
        put_record(&mut buf, 0x100, "Mage", 7, -1);

        let found = locate_birthday(&LeView::new(&buf), None).expect("record present");
        assert_eq!(found.class_name, "Mage");
    }

    #[test]
    fn later_record_wins() {
        let mut buf = vec![0u8; 0x1000];
        put_record(&mut buf, 0xE00, "Archer", 10, -1);
        let later = put_record(&mut buf, 0xF00, "Tank", 20, -1);

        let found = locate_birthday(&LeView::new(&buf), None).expect("record present");
        assert_eq!(found.offset, later);
        assert_eq!(found.class_name, "Tank");
    }
}
