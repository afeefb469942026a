//! Scroll Module — Bounded-window viewport for scrollable lists.
//!
//! Responsibilities:
//! - Keep the selected index inside a window of visible rows
//! - Move the offset as little as possible (one edge at a time)
//! - Map window rows back to item indices

use crate::types::Range;

/// Offset that keeps `selection` visible in a window of `window` rows.
/// A negative selection counts as 0.
pub fn follow(offset: i32, selection: i32, window: i32) -> i32 {
    let s = selection.max(0);
    if offset > s {
        s
    } else if offset + window - 1 <= s {
        s - window + 1
    } else {
        offset
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Viewport {
    offset: i32,
}

impl Viewport {
    pub fn offset(&self) -> i32 {
        self.offset
    }

    /// Scroll so `selection` lands inside `rows`. Returns whether the offset
    /// moved.
    pub fn scroll_to(&mut self, selection: i32, rows: Range) -> bool {
        let next = follow(self.offset, selection, rows.length());
        if next == self.offset {
            return false;
        }
        self.offset = next;
        true
    }

    /// Each display row in `rows` paired with the item index it shows, or
    /// `None` past the end of a list of `len` items.
    pub fn slots(&self, rows: Range, len: usize) -> impl Iterator<Item = (i32, Option<usize>)> {
        let offset = self.offset;
        rows.rows().enumerate().map(move |(n, row)| {
            let index = usize::try_from(offset).ok().map(|o| o + n);
            (row, index.filter(|&i| i < len))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_walk_scrolls_at_bottom_edge() {
        let rows = Range::new(1, 3);
        let mut vp = Viewport::default();
        let mut seen = Vec::new();
        for s in 0..4 {
            vp.scroll_to(s, rows);
            seen.push(vp.offset());
        }
        assert_eq!(seen, vec![0, 0, 0, 1]);
    }

    #[test]
    fn test_scroll_up_puts_selection_first() {
        assert_eq!(follow(5, 2, 3), 2);
        assert_eq!(follow(5, -1, 3), 0);
    }

    #[test]
    fn test_unchanged_offset_reports_false() {
        let mut vp = Viewport::default();
        assert!(!vp.scroll_to(1, Range::new(0, 2)));
        assert!(vp.scroll_to(7, Range::new(0, 2)));
        assert_eq!(vp.offset(), 5);
    }

    #[test]
    fn test_slots_past_end_are_empty() {
        let mut vp = Viewport::default();
        vp.scroll_to(3, Range::new(1, 3));
        let slots: Vec<_> = vp.slots(Range::new(1, 3), 3).collect();
        assert_eq!(slots, vec![(1, Some(1)), (2, Some(2)), (3, None)]);
    }
}
