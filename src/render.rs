//! Render Module — Virtual-cursor printer over a TerminalBackend.
//!
//! Responsibilities:
//! - Track the physical device cursor and the virtual (target) cursor apart
//! - Issue a physical move only when a write happens away from the cursor
//! - Let renderers skip spans that cannot have changed (`omit`)
//! - Padding, repetition, and aligned text clamped to the row width
//!
//! Columns past the right edge are dropped rather than wrapped.

use crate::glyphs::Glyphs;
use crate::terminal::TerminalBackend;
use crate::text_utils::{char_width, display_width, truncate_to_width};
use crate::types::Alignment;

// ============================================================================
// DrawContext
// ============================================================================

/// Single-line drawing surface handed to content elements.
pub trait DrawContext {
    /// Columns left between the virtual cursor and the right edge.
    fn remaining(&self) -> u16;
    /// Column of the virtual cursor.
    fn position(&self) -> u16;
    /// Row width.
    fn total(&self) -> u16;
    fn glyphs(&self) -> &Glyphs;

    fn write_char(&mut self, c: char);
    fn write_str(&mut self, s: &str);
    /// Write `s` into a field of `total` columns, padded with `padding`
    /// according to `alignment`. Text wider than the field is truncated.
    fn write_aligned(&mut self, s: &str, alignment: Alignment, total: u16, padding: char);
    fn repeat(&mut self, c: char, count: u16);
    /// `prefix`, then `infix` repeated, then `postfix`; `count` columns total.
    fn repeat_framed(&mut self, prefix: char, infix: char, postfix: char, count: u16);
    /// Skip `count` columns without touching the device when `skip` is true.
    /// Returns `skip`; the caller renders the span itself otherwise.
    fn omit(&mut self, count: u16, skip: bool) -> bool;

    /// Pad the rest of the row with the default padding glyph.
    fn fill(&mut self) {
        let pad = self.glyphs().default_padding;
        self.fill_with(pad);
    }

    fn fill_with(&mut self, c: char) {
        let count = self.remaining();
        self.repeat(c, count);
    }

    fn fill_framed(&mut self, prefix: char, infix: char, postfix: char) {
        let count = self.remaining();
        self.repeat_framed(prefix, infix, postfix, count);
    }

    /// Write `s` across the rest of the row with the default padding glyph.
    fn fill_text(&mut self, s: &str, alignment: Alignment) {
        let pad = self.glyphs().default_padding;
        self.fill_text_with(s, alignment, pad);
    }

    fn fill_text_with(&mut self, s: &str, alignment: Alignment, padding: char) {
        let count = self.remaining();
        self.write_aligned(s, alignment, count, padding);
    }
}

// ============================================================================
// Printer
// ============================================================================

pub struct Printer {
    backend: Box<dyn TerminalBackend>,
    glyphs: Glyphs,
    width: u16,
    height: u16,
    pos_x: u16,
    pos_y: u16,
    virtual_x: u16,
    virtual_y: u16,
}

impl Printer {
    pub fn new(backend: Box<dyn TerminalBackend>) -> Self {
        let (width, height) = backend.size();
        Self {
            backend,
            glyphs: Glyphs::default(),
            width,
            height,
            // Out-of-bounds sentinel: the first write always moves.
            pos_x: width,
            pos_y: height,
            virtual_x: width,
            virtual_y: height,
        }
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn set_glyphs(&mut self, glyphs: Glyphs) {
        self.glyphs = glyphs;
    }

    pub fn backend_mut(&mut self) -> &mut dyn TerminalBackend {
        self.backend.as_mut()
    }

    pub(crate) fn into_backend(self) -> Box<dyn TerminalBackend> {
        self.backend
    }

    /// Physical cursor position as last confirmed by the device.
    pub fn physical_cursor(&self) -> (u16, u16) {
        (self.pos_x, self.pos_y)
    }

    pub fn virtual_cursor(&self) -> (u16, u16) {
        (self.virtual_x, self.virtual_y)
    }

    /// Point the virtual cursor at column 0 of `row`. No device I/O.
    pub fn begin(&mut self, row: u16) -> &mut Self {
        self.virtual_move(0, row);
        self
    }

    pub fn flush(&mut self) -> crate::error::Result<()> {
        self.backend.flush()
    }

    fn virtual_move(&mut self, x: u16, y: u16) {
        self.virtual_x = x;
        self.virtual_y = y;
    }

    fn invalidate_physical(&mut self) {
        self.pos_x = self.width;
        self.pos_y = self.height;
    }

    fn move_to(&mut self, x: u16, y: u16) -> bool {
        if self.backend.move_cursor(x, y) {
            self.pos_x = x;
            self.pos_y = y;
            true
        } else {
            tracing::debug!(x, y, "cursor move failed, resynchronizing");
            self.invalidate_physical();
            false
        }
    }

    fn ensure_move(&mut self) -> bool {
        if self.virtual_x != self.pos_x || self.virtual_y != self.pos_y {
            return self.move_to(self.virtual_x, self.virtual_y);
        }
        true
    }

    fn print(&mut self, c: char) {
        let w = char_width(c) as u16;
        // Wide glyphs must fit entirely inside the row.
        if self.virtual_x.saturating_add(w.max(1)) > self.width || !self.ensure_move() {
            return;
        }
        if self.backend.print_char(c) {
            self.pos_x = self.pos_x.saturating_add(w);
            self.virtual_x = self.virtual_x.saturating_add(w);
        } else {
            tracing::debug!(c = %c, "character write failed, resynchronizing");
            self.invalidate_physical();
        }
    }
}

impl DrawContext for Printer {
    fn remaining(&self) -> u16 {
        self.total().saturating_sub(self.position())
    }

    fn position(&self) -> u16 {
        self.virtual_x
    }

    fn total(&self) -> u16 {
        self.width
    }

    fn glyphs(&self) -> &Glyphs {
        &self.glyphs
    }

    fn write_char(&mut self, c: char) {
        self.print(c);
    }

    fn write_str(&mut self, s: &str) {
        for c in s.chars() {
            self.print(c);
        }
    }

    fn write_aligned(&mut self, s: &str, alignment: Alignment, total: u16, padding: char) {
        let text = truncate_to_width(s, total as usize);
        let len = display_width(text) as u16;
        let gap = total - len;
        let front = match alignment {
            Alignment::Front => 0,
            Alignment::Center => gap / 2,
            Alignment::Back => gap,
        };
        self.repeat(padding, front);
        self.write_str(text);
        self.repeat(padding, gap - front);
    }

    fn repeat(&mut self, c: char, count: u16) {
        for _ in 0..count {
            self.print(c);
        }
    }

    fn repeat_framed(&mut self, prefix: char, infix: char, postfix: char, count: u16) {
        match count {
            0 => {}
            1 => self.print(prefix),
            _ => {
                self.print(prefix);
                self.repeat(infix, count - 2);
                self.print(postfix);
            }
        }
    }

    fn omit(&mut self, count: u16, skip: bool) -> bool {
        if skip {
            self.virtual_x = self.virtual_x.saturating_add(count);
        }
        skip
    }
}
