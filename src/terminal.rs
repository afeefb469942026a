//! TerminalBackend trait + CrosstermBackend implementation.
//!
//! The printer and the coordinator depend on this trait, not on crossterm
//! directly. A backend only needs two output primitives: print one
//! character at the device cursor, and move that cursor. Both report
//! failure with `false` and never panic.

use crate::error::{Result, UiError};
use crate::event::{Interaction, Key, KeyState};

// ============================================================================
// TerminalBackend Trait
// ============================================================================

pub trait TerminalBackend {
    fn init(&mut self) -> Result<()>;
    fn shutdown(&mut self) -> Result<()>;
    fn size(&self) -> (u16, u16);
    /// Print one character and advance the device cursor. `false` means the
    /// write failed and the cursor did not move.
    fn print_char(&mut self, c: char) -> bool;
    /// Move the device cursor. `false` means its position is now unknown.
    fn move_cursor(&mut self, x: u16, y: u16) -> bool;
    fn flush(&mut self) -> Result<()>;
    fn read_events(&mut self, timeout_ms: u32) -> Vec<Interaction>;

    /// Downcast support for test code. Returns self as Any for type-safe downcasting.
    #[cfg(test)]
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any;
}

// ============================================================================
// CrosstermBackend
// ============================================================================

pub struct CrosstermBackend {
    width: u16,
    height: u16,
    reports_release: bool,
}

impl CrosstermBackend {
    /// A backend for a fixed character grid. `None` uses the terminal size.
    pub fn new(grid: Option<(u16, u16)>) -> Self {
        let (w, h) = grid.unwrap_or_else(|| crossterm::terminal::size().unwrap_or((20, 4)));
        Self {
            width: w,
            height: h,
            reports_release: false,
        }
    }
}

impl TerminalBackend for CrosstermBackend {
    fn init(&mut self) -> Result<()> {
        use crossterm::{
            cursor,
            event::{KeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
            terminal::{enable_raw_mode, supports_keyboard_enhancement, Clear, ClearType, EnterAlternateScreen},
            ExecutableCommand,
        };

        enable_raw_mode().map_err(|e| UiError::Terminal(format!("raw mode: {e}")))?;
        let mut stdout = std::io::stdout();
        stdout
            .execute(EnterAlternateScreen)
            .map_err(|e| UiError::Terminal(format!("alternate screen: {e}")))?;
        stdout
            .execute(Clear(ClearType::All))
            .map_err(|e| UiError::Terminal(format!("clear: {e}")))?;
        stdout
            .execute(cursor::Hide)
            .map_err(|e| UiError::Terminal(format!("hide cursor: {e}")))?;

        // Key release events need the kitty keyboard protocol. Without it
        // every press is reported as a down edge immediately followed by an
        // up edge.
        self.reports_release = supports_keyboard_enhancement().unwrap_or(false);
        if self.reports_release {
            stdout
                .execute(PushKeyboardEnhancementFlags(
                    KeyboardEnhancementFlags::REPORT_EVENT_TYPES,
                ))
                .map_err(|e| UiError::Terminal(format!("keyboard enhancement: {e}")))?;
        }
        tracing::debug!(
            width = self.width,
            height = self.height,
            reports_release = self.reports_release,
            "crossterm backend initialized"
        );
        Ok(())
    }

    fn shutdown(&mut self) -> Result<()> {
        use crossterm::{
            cursor,
            event::PopKeyboardEnhancementFlags,
            terminal::{disable_raw_mode, LeaveAlternateScreen},
            ExecutableCommand,
        };

        let mut stdout = std::io::stdout();
        if self.reports_release {
            stdout
                .execute(PopKeyboardEnhancementFlags)
                .map_err(|e| UiError::Terminal(format!("keyboard enhancement: {e}")))?;
        }
        stdout
            .execute(cursor::Show)
            .map_err(|e| UiError::Terminal(format!("show cursor: {e}")))?;
        stdout
            .execute(LeaveAlternateScreen)
            .map_err(|e| UiError::Terminal(format!("leave alternate screen: {e}")))?;
        disable_raw_mode().map_err(|e| UiError::Terminal(format!("disable raw mode: {e}")))?;
        Ok(())
    }

    fn size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    fn print_char(&mut self, c: char) -> bool {
        use crossterm::{style::Print, QueueableCommand};

        match std::io::stdout().queue(Print(c)) {
            Ok(_) => true,
            Err(e) => {
                tracing::trace!("print failed: {e}");
                false
            }
        }
    }

    fn move_cursor(&mut self, x: u16, y: u16) -> bool {
        use crossterm::{cursor::MoveTo, QueueableCommand};

        match std::io::stdout().queue(MoveTo(x, y)) {
            Ok(_) => true,
            Err(e) => {
                tracing::trace!("move failed: {e}");
                false
            }
        }
    }

    fn flush(&mut self) -> Result<()> {
        use std::io::Write;
        std::io::stdout().flush()?;
        Ok(())
    }

    fn read_events(&mut self, timeout_ms: u32) -> Vec<Interaction> {
        use crossterm::event::{self, Event, KeyCode, KeyEventKind};

        let mut events = Vec::new();
        let timeout = std::time::Duration::from_millis(timeout_ms as u64);

        if event::poll(timeout).unwrap_or(false) {
            while event::poll(std::time::Duration::ZERO).unwrap_or(false) {
                match event::read() {
                    Ok(Event::Key(key_event)) => {
                        let key = match key_event.code {
                            KeyCode::Enter => Key::Enter,
                            // Backspace doubles as the cancel key.
                            KeyCode::Esc | KeyCode::Backspace => Key::Escape,
                            KeyCode::Left => Key::Left,
                            KeyCode::Right => Key::Right,
                            KeyCode::Up => Key::Up,
                            KeyCode::Down => Key::Down,
                            KeyCode::Char(c) => Key::Char(c),
                            _ => continue,
                        };

                        match key_event.kind {
                            KeyEventKind::Press if self.reports_release => {
                                events.push(Interaction::new(key, KeyState::Down));
                            }
                            KeyEventKind::Press => {
                                events.push(Interaction::new(key, KeyState::Down));
                                events.push(Interaction::new(key, KeyState::Up));
                            }
                            KeyEventKind::Repeat => {
                                events.push(Interaction::new(key, KeyState::Pressed));
                            }
                            KeyEventKind::Release => {
                                events.push(Interaction::new(key, KeyState::Up));
                            }
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!("reading terminal input failed: {e}");
                        break;
                    }
                }
            }
        }

        events
    }

    #[cfg(test)]
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

// ============================================================================
// HeadlessBackend (for benchmarks and CI environments)
// ============================================================================

pub struct HeadlessBackend {
    pub width: u16,
    pub height: u16,
}

impl HeadlessBackend {
    pub fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }
}

impl TerminalBackend for HeadlessBackend {
    fn init(&mut self) -> Result<()> {
        Ok(())
    }

    fn shutdown(&mut self) -> Result<()> {
        Ok(())
    }

    fn size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    fn print_char(&mut self, _c: char) -> bool {
        true
    }

    fn move_cursor(&mut self, _x: u16, _y: u16) -> bool {
        true
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn read_events(&mut self, _timeout_ms: u32) -> Vec<Interaction> {
        Vec::new()
    }

    #[cfg(test)]
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

// ============================================================================
// MockBackend (for Rust unit tests only)
// ============================================================================

/// Records every physical write into a character grid.
#[cfg(test)]
pub struct MockBackend {
    pub width: u16,
    pub height: u16,
    pub grid: Vec<Vec<char>>,
    pub cursor: (u16, u16),
    pub writes: usize,
    pub moves: usize,
    /// The next `fail_writes` character writes fail.
    pub fail_writes: usize,
    /// The next `fail_moves` cursor moves fail.
    pub fail_moves: usize,
    pub injected_events: Vec<Interaction>,
}

#[cfg(test)]
impl MockBackend {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            grid: vec![vec![' '; width as usize]; height as usize],
            cursor: (0, 0),
            writes: 0,
            moves: 0,
            fail_writes: 0,
            fail_moves: 0,
            injected_events: Vec::new(),
        }
    }

    pub fn row_text(&self, row: usize) -> String {
        self.grid[row].iter().collect()
    }

    pub fn reset_counters(&mut self) {
        self.writes = 0;
        self.moves = 0;
    }
}

#[cfg(test)]
impl TerminalBackend for MockBackend {
    fn init(&mut self) -> Result<()> {
        Ok(())
    }

    fn shutdown(&mut self) -> Result<()> {
        Ok(())
    }

    fn size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    fn print_char(&mut self, c: char) -> bool {
        if self.fail_writes > 0 {
            self.fail_writes -= 1;
            return false;
        }
        let (x, y) = self.cursor;
        if let Some(cell) = self
            .grid
            .get_mut(y as usize)
            .and_then(|row| row.get_mut(x as usize))
        {
            *cell = c;
        }
        self.cursor.0 = x.saturating_add(1);
        self.writes += 1;
        true
    }

    fn move_cursor(&mut self, x: u16, y: u16) -> bool {
        if self.fail_moves > 0 {
            self.fail_moves -= 1;
            return false;
        }
        self.cursor = (x, y);
        self.moves += 1;
        true
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn read_events(&mut self, _timeout_ms: u32) -> Vec<Interaction> {
        std::mem::take(&mut self.injected_events)
    }

    #[cfg(test)]
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
