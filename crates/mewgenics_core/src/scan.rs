//! Candidate scoring shared by the field locators.
//!
//! Each locator walks a window of offsets, turns every offset that passes its
//! validity predicate into a scored candidate, and keeps the best one.

use std::cmp::Ordering;

/// Which candidate wins when two scores are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TieBreak {
    FirstSeen,
    LastSeen,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scored<T, S> {
    pub offset: usize,
    pub score: S,
    pub value: T,
}

/// Best candidate over `offsets`; `check` returns `None` for offsets that fail validation.
pub fn best<T, S, I, F>(offsets: I, tie: TieBreak, mut check: F) -> Option<Scored<T, S>>
where
    S: PartialOrd,
    I: IntoIterator<Item = usize>,
    F: FnMut(usize) -> Option<(S, T)>,
{
    let mut best: Option<Scored<T, S>> = None;
    for offset in offsets {
        let Some((score, value)) = check(offset) else {
            continue;
        };
        let wins = match &best {
            None => true,
            Some(current) => match score.partial_cmp(&current.score) {
                Some(Ordering::Greater) => true,
                Some(Ordering::Equal) => tie == TieBreak::LastSeen,
                _ => false,
            },
        };
        if wins {
            best = Some(Scored {
                offset,
                score,
                value,
            });
        }
    }
    best
}

/// Every valid candidate, highest score first. Equal scores keep scan order.
pub fn ranked<T, S, I, F>(offsets: I, mut check: F) -> Vec<Scored<T, S>>
where
    S: PartialOrd,
    I: IntoIterator<Item = usize>,
    F: FnMut(usize) -> Option<(S, T)>,
{
    let mut all: Vec<Scored<T, S>> = offsets
        .into_iter()
        .filter_map(|offset| {
            check(offset).map(|(score, value)| Scored {
                offset,
                score,
                value,
            })
        })
        .collect();
    all.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    all
}

#[cfg(test)]
mod tests {
    use super::{TieBreak, best, ranked};

    #[test]
    fn tie_break_controls_equal_scores() {
        let even = |off: usize| (off % 2 == 0).then_some((1, off));

        let first = best(0..6, TieBreak::FirstSeen, even).expect("candidates exist");
        assert_eq!(first.offset, 0);

        let last = best(0..6, TieBreak::LastSeen, even).expect("candidates exist");
        assert_eq!(last.offset, 4);
    }

    #[test]
    fn ranked_is_stable_for_equal_scores() {
        let scores = [3.0, 5.0, 3.0, 5.0];
        let order: Vec<usize> = ranked(0..4, |off| Some((scores[off], ())))
            .into_iter()
            .map(|c| c.offset)
            .collect();
        assert_eq!(order, vec![1, 3, 0, 2]);
    }

    #[test]
    fn empty_window_has_no_winner() {
        let winner = best(0..0, TieBreak::FirstSeen, |_| Some((1u32, ())));
        assert!(winner.is_none());
    }
}
