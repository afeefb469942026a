//! Shared types, enums, and constants.
//!
//! All value types that cross module boundaries live here: the dirty-flag
//! set, row ranges, alignment, and the focus token.

use std::time::{Duration, Instant};

use bitflags::bitflags;

// ============================================================================
// Dirty Flags
// ============================================================================

bitflags! {
    /// Reasons an element needs to be redrawn. Cleared as a whole after a
    /// successful draw pass.
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct UiFlags: u8 {
        const PROPERTY_CHANGED = 0x01;
        const CURSOR_CHANGED   = 0x02;
        const STATE_CHANGED    = 0x04;
        const LAYOUT_CHANGED   = 0x08;
        const FOCUS_LOST       = 0x10;
        const FOCUS_GOT        = 0x20;
        const FOCUS_CHANGED    = Self::FOCUS_LOST.bits() | Self::FOCUS_GOT.bits();
        const LOCAL_RESET      = 0x40;
        const GLOBAL_DRAW      = 0x80;
        const ANY              = 0xFF;
    }
}

impl UiFlags {
    /// Whether this set is dirty for `reason`. `GLOBAL_DRAW` matches every
    /// query.
    pub fn matches(self, reason: UiFlags) -> bool {
        self.intersects(reason | UiFlags::GLOBAL_DRAW)
    }
}

// ============================================================================
// Alignment
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
    #[default]
    Front,
    Center,
    Back,
}

// ============================================================================
// Range
// ============================================================================

/// Inclusive interval of display rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub start: i32,
    pub end: i32,
}

impl Range {
    pub fn new(start: i32, end: i32) -> Self {
        Self {
            start,
            end: start.max(end),
        }
    }

    pub fn length(self) -> i32 {
        self.end
            .saturating_sub(self.start)
            .saturating_add(1)
            .max(0)
    }

    /// Trim `front` rows from the start and `back` rows from the end.
    pub fn with_margin(self, front: i32, back: i32) -> Self {
        Self::new(
            self.start.saturating_add(front),
            self.end.saturating_sub(back),
        )
    }

    /// Fit the range to `length` rows, cropping according to `alignment`.
    /// Never grows the range.
    pub fn with_length(self, length: i32, alignment: Alignment) -> Self {
        let d = self.length().saturating_sub(length.max(0)).max(0);
        match alignment {
            Alignment::Front => self.with_margin(0, d),
            Alignment::Center => self.with_margin(d / 2, d - d / 2),
            Alignment::Back => self.with_margin(d, 0),
        }
    }

    pub fn contains(self, row: i32) -> bool {
        row >= self.start && row <= self.end
    }

    pub fn rows(self) -> std::ops::RangeInclusive<i32> {
        self.start..=self.end
    }
}

// ============================================================================
// Focus Token
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorState {
    #[default]
    PointerOver,
    PointerDisabled,
    PointerDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FocusState {
    #[default]
    Normal,
    Disabled,
    Engaged,
    Pressed,
}

/// Elapsed-time counter driven by the coordinator's tick clock.
#[derive(Debug, Clone, Copy)]
pub struct Timer {
    started: Instant,
    now: Instant,
}

impl Timer {
    pub fn new(now: Instant) -> Self {
        Self { started: now, now }
    }

    pub fn tick(&mut self, now: Instant) {
        self.now = self.now.max(now);
    }

    pub fn elapsed(&self) -> Duration {
        self.now.saturating_duration_since(self.started)
    }

    pub fn has_elapsed(&self, interval: Duration) -> bool {
        self.elapsed() >= interval
    }

    pub fn reset(&mut self) {
        self.started = self.now;
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new(Instant::now())
    }
}

/// Transient state of whichever element currently holds focus. Exactly one
/// exists, owned by the coordinator, and it is replaced whenever focus moves.
#[derive(Debug, Clone, Copy, Default)]
pub struct FocusToken {
    pub cursor: CursorState,
    pub state: FocusState,
    pub timer: Timer,
}

impl FocusToken {
    pub fn fresh(now: Instant) -> Self {
        Self {
            cursor: CursorState::default(),
            state: FocusState::default(),
            timer: Timer::new(now),
        }
    }

    pub fn update(&mut self, now: Instant) {
        self.timer.tick(now);
    }
}

/// Store `value` into `slot`, reporting whether it changed.
pub fn assign<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_focus_changed_is_union() {
        assert_eq!(
            UiFlags::FOCUS_CHANGED,
            UiFlags::FOCUS_LOST | UiFlags::FOCUS_GOT
        );
        assert!(UiFlags::FOCUS_GOT.matches(UiFlags::FOCUS_CHANGED));
    }

    #[test]
    fn test_global_draw_matches_everything() {
        let flags = UiFlags::GLOBAL_DRAW;
        assert!(flags.matches(UiFlags::PROPERTY_CHANGED));
        assert!(flags.matches(UiFlags::FOCUS_LOST));
        assert!(!UiFlags::CURSOR_CHANGED.matches(UiFlags::PROPERTY_CHANGED));
        assert!(!UiFlags::empty().matches(UiFlags::ANY));
    }

    #[test]
    fn test_range_clamps_end() {
        let r = Range::new(5, 2);
        assert_eq!(r, Range::new(5, 5));
        assert_eq!(r.length(), 1);
        assert_eq!(Range::new(0, 3).length(), 4);
    }

    #[test]
    fn test_range_with_length() {
        let r = Range::new(0, 9);
        assert_eq!(r.with_length(2, Alignment::Front), Range::new(0, 1));
        assert_eq!(r.with_length(2, Alignment::Back), Range::new(8, 9));
        assert_eq!(r.with_length(2, Alignment::Center), Range::new(4, 5));
        assert_eq!(r.with_length(1, Alignment::Center), Range::new(4, 4));
        // Oversized requests keep the original range.
        assert_eq!(r.with_length(40, Alignment::Center), r);
    }

    #[test]
    fn test_range_margin_never_inverts() {
        let r = Range::new(0, 3).with_margin(3, 3);
        assert!(r.length() >= 0);
        assert_eq!(r.start, 3);
    }

    #[test]
    fn test_timer_elapsed_and_reset() {
        let t0 = Instant::now();
        let mut timer = Timer::new(t0);
        timer.tick(t0 + Duration::from_millis(400));
        assert_eq!(timer.elapsed(), Duration::from_millis(400));
        assert!(!timer.has_elapsed(Duration::from_millis(500)));
        timer.reset();
        timer.tick(t0 + Duration::from_millis(1500));
        assert!(timer.has_elapsed(Duration::from_millis(1000)));
    }

    #[test]
    fn test_assign_reports_change() {
        let mut v = 3;
        assert!(!assign(&mut v, 3));
        assert!(assign(&mut v, 4));
        assert_eq!(v, 4);
    }
}
