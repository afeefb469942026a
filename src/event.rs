//! Event Module — Key events and input dispatch.
//!
//! Responsibilities:
//! - Model key events as immutable (key, state) pairs
//! - Pull raw input from the TerminalBackend
//! - Route each event into the current view through the coordinator

use crate::context::UiContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Enter,
    Escape,
    Left,
    Up,
    Right,
    Down,
    Char(char),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyState {
    Down,
    Up,
    /// Auto-repeat while the key is held.
    Pressed,
}

/// A single input event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interaction {
    pub key: Key,
    pub state: KeyState,
}

impl Interaction {
    pub const fn new(key: Key, state: KeyState) -> Self {
        Self { key, state }
    }

    pub const fn down(key: Key) -> Self {
        Self::new(key, KeyState::Down)
    }

    pub const fn up(key: Key) -> Self {
        Self::new(key, KeyState::Up)
    }

    pub const fn pressed(key: Key) -> Self {
        Self::new(key, KeyState::Pressed)
    }

    pub fn is(&self, key: Key, state: KeyState) -> bool {
        self.key == key && self.state == state
    }
}

/// Read terminal input and dispatch every event into the current view.
/// Returns the number of events the view consumed.
pub(crate) fn read_input(ctx: &mut UiContext, timeout_ms: u32) -> usize {
    let events = ctx.printer_mut().backend_mut().read_events(timeout_ms);
    let mut consumed = 0;
    for event in events {
        if ctx.interact(event) {
            consumed += 1;
        }
    }
    consumed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interaction_matching() {
        let e = Interaction::down(Key::Enter);
        assert!(e.is(Key::Enter, KeyState::Down));
        assert!(!e.is(Key::Enter, KeyState::Up));
        assert!(!e.is(Key::Escape, KeyState::Down));
        assert_eq!(Interaction::pressed(Key::Up).state, KeyState::Pressed);
    }

    #[test]
    fn test_char_keys_compare_by_value() {
        assert_eq!(Key::Char('4'), Key::Char('4'));
        assert_ne!(Key::Char('4'), Key::Char('5'));
    }
}
