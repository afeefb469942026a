//! Popups Module — Modal overlays and the priority stack that arbitrates them.
//!
//! Responsibilities:
//! - Fixed-capacity slot table of open popups
//! - Highest priority wins the overlay; on a tie the highest slot wins
//! - Popup frame rendering (border, header, content line)
//! - Warning, dialog, lock-code, and progress popups
//!
//! Opening and closing go through `UiContext::show_popup` and
//! `UiContext::hide_popup`, which keep the coordinator's overlay in step
//! with the stack.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use crate::context::UiContext;
use crate::error::{Result, UiError};
use crate::event::{Interaction, Key, KeyState};
use crate::render::DrawContext;
use crate::text_utils::display_width;
use crate::tree::{Element, ElementId, ElementState, Layout, LayoutRef};
use crate::types::{assign, Alignment, FocusState, Range, UiFlags};

pub const POPUP_CAPACITY: usize = 8;

/// How long a finished progress popup stays up before closing itself.
pub const DEFAULT_PROGRESS_HOLD: Duration = Duration::from_millis(1000);

// ============================================================================
// Popup stack
// ============================================================================

/// An overlay layout together with its fixed priority.
#[derive(Debug, Clone)]
pub struct PopupRef {
    layout: LayoutRef,
    priority: i8,
}

impl PopupRef {
    pub fn new(layout: LayoutRef, priority: i8) -> Self {
        Self { layout, priority }
    }

    pub fn id(&self) -> ElementId {
        self.layout.id()
    }

    pub fn priority(&self) -> i8 {
        self.priority
    }

    pub fn layout(&self) -> &LayoutRef {
        &self.layout
    }
}

impl From<Rc<RefCell<Popup>>> for PopupRef {
    fn from(cell: Rc<RefCell<Popup>>) -> Self {
        let priority = cell.borrow().priority();
        Self::new(cell.into(), priority)
    }
}

#[derive(Debug, Default)]
pub struct PopupStack {
    slots: [Option<PopupRef>; POPUP_CAPACITY],
    current: Option<ElementId>,
}

impl PopupStack {
    pub fn contains(&self, id: ElementId) -> bool {
        self.slots.iter().flatten().any(|p| p.id() == id)
    }

    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The slot at `slot`, which may be empty.
    pub fn get(&self, slot: usize) -> Result<Option<&PopupRef>> {
        self.slots
            .get(slot)
            .map(Option::as_ref)
            .ok_or(UiError::SlotOutOfRange {
                slot,
                capacity: POPUP_CAPACITY,
            })
    }

    /// The popup the stack last put on screen.
    pub fn current(&self) -> Option<ElementId> {
        self.current
    }

    pub(crate) fn set_current(&mut self, id: Option<ElementId>) {
        self.current = id;
    }

    /// Place `popup` in the first empty slot. `None` when it is already
    /// present or every slot is taken.
    pub(crate) fn insert(&mut self, popup: PopupRef) -> Option<usize> {
        if self.contains(popup.id()) {
            return None;
        }
        let slot = self.slots.iter().position(Option::is_none)?;
        self.slots[slot] = Some(popup);
        Some(slot)
    }

    pub(crate) fn remove(&mut self, id: ElementId) -> bool {
        match self
            .slots
            .iter_mut()
            .find(|s| matches!(s, Some(p) if p.id() == id))
        {
            Some(slot) => {
                *slot = None;
                true
            }
            None => false,
        }
    }

    /// Highest priority among occupied slots; the later slot wins a tie.
    pub fn top(&self) -> Option<&PopupRef> {
        let mut top: Option<&PopupRef> = None;
        for popup in self.slots.iter().flatten() {
            if top.map_or(true, |t| popup.priority >= t.priority) {
                top = Some(popup);
            }
        }
        top
    }
}

// ============================================================================
// Popup
// ============================================================================

/// Close handler; returning `false` keeps the popup open.
pub type PopupHandler<A> = Box<dyn FnMut(&mut UiContext, A) -> bool>;

pub enum PopupKind {
    Warning {
        message: String,
        handler: Option<PopupHandler<()>>,
    },
    /// Left picks "No", Right picks "Yes"; the handler gets the choice.
    Dialog { handler: Option<PopupHandler<bool>> },
    /// Code entry. The handler gets the entry, or an empty string when fewer
    /// than `length` characters were typed.
    Lock {
        length: usize,
        masked: bool,
        input: Vec<char>,
        handler: Option<PopupHandler<String>>,
    },
    /// Loading bar over a fraction in [0, 1]. Closes itself once the
    /// fraction has stayed at 1 for `hold`.
    Progress {
        source: Box<dyn Fn() -> f32>,
        last: f32,
        hold: Duration,
    },
}

impl PopupKind {
    pub fn warning(message: impl Into<String>) -> Self {
        PopupKind::Warning {
            message: message.into(),
            handler: None,
        }
    }

    pub fn dialog(handler: impl FnMut(&mut UiContext, bool) -> bool + 'static) -> Self {
        PopupKind::Dialog {
            handler: Some(Box::new(handler)),
        }
    }

    pub fn lock(
        length: usize,
        masked: bool,
        handler: impl FnMut(&mut UiContext, String) -> bool + 'static,
    ) -> Self {
        PopupKind::Lock {
            length,
            masked,
            input: Vec::with_capacity(length),
            handler: Some(Box::new(handler)),
        }
    }

    pub fn progress(source: impl Fn() -> f32 + 'static) -> Self {
        PopupKind::Progress {
            source: Box::new(source),
            last: 0.0,
            hold: DEFAULT_PROGRESS_HOLD,
        }
    }

    fn draw(&self, out: &mut dyn DrawContext, flags: UiFlags, pressed: bool) {
        match self {
            PopupKind::Warning { message, .. } => out.fill_text(message, Alignment::Center),
            PopupKind::Dialog { .. } => {
                let g = out.glyphs();
                let choice = if pressed { " Yes " } else { " No " };
                let text = format!("{}{choice}{}", g.pointer_down_left, g.pointer_down_right);
                out.fill_text(&text, Alignment::Center);
            }
            PopupKind::Lock {
                length,
                masked,
                input,
                ..
            } => {
                let full = flags.matches(UiFlags::FOCUS_CHANGED);
                let length = u16::try_from(*length).unwrap_or(u16::MAX);
                let start = out.remaining().saturating_sub(length) / 2;
                if !out.omit(start, !full) {
                    out.repeat(' ', start);
                }
                let (mask, placeholder) = (out.glyphs().password_char, out.glyphs().lock_placeholder);
                for i in 0..length as usize {
                    let c = match input.get(i) {
                        Some(_) if *masked => mask,
                        Some(&c) => c,
                        None => placeholder,
                    };
                    out.write_char(c);
                }
                if full {
                    out.fill();
                }
            }
            PopupKind::Progress { last, .. } => {
                let fraction = last.clamp(0.0, 1.0);
                let filled = (f32::from(out.remaining()) * fraction) as u16;
                let bar = out.glyphs().loading_bar;
                out.repeat(bar, filled);
                out.fill();
            }
        }
    }
}

pub struct Popup {
    state: ElementState,
    pub header: String,
    priority: i8,
    pub kind: PopupKind,
}

impl Popup {
    pub fn new(header: impl Into<String>, priority: i8, kind: PopupKind) -> Self {
        Self {
            state: ElementState::new(),
            header: header.into(),
            priority,
            kind,
        }
    }

    pub fn priority(&self) -> i8 {
        self.priority
    }

    /// Remove this popup from the stack.
    pub fn close(&mut self, ui: &mut UiContext) -> bool {
        ui.hide_popup(self.id())
    }

    /// Ask the variant whether an Enter release may close the popup.
    fn allow_close(&mut self, ui: &mut UiContext) -> bool {
        let id = self.id();
        match &mut self.kind {
            PopupKind::Warning { handler, .. } => handler.as_mut().map_or(true, |h| h(ui, ())),
            PopupKind::Dialog { handler } => {
                let Some(state) = ui.request_token(id).map(|t| t.state) else {
                    return true;
                };
                handler
                    .as_mut()
                    .map_or(true, |h| h(ui, state == FocusState::Pressed))
            }
            PopupKind::Lock {
                length,
                input,
                handler,
                ..
            } => {
                let entry = if input.len() < *length {
                    String::new()
                } else {
                    input.iter().collect()
                };
                handler.as_mut().map_or(true, |h| h(ui, entry))
            }
            PopupKind::Progress { .. } => true,
        }
    }

    /// Enter release closes if allowed; Escape release always closes.
    fn interact_frame(&mut self, ui: &mut UiContext, e: Interaction) -> bool {
        if e.is(Key::Enter, KeyState::Up) {
            if self.allow_close(ui) {
                self.close(ui);
            }
            true
        } else if e.is(Key::Escape, KeyState::Up) {
            self.close(ui);
            true
        } else {
            false
        }
    }

    fn set_choice(&mut self, ui: &mut UiContext, state: FocusState) {
        if let Some(token) = ui.request_token(self.id()) {
            if assign(&mut token.state, state) {
                self.invalidate(UiFlags::STATE_CHANGED);
            }
        }
    }

    fn draw_content(&self, ui: &mut UiContext, row: i32, pressed: bool) -> Result<()> {
        let out = ui.draw_row(row as u16)?;
        self.kind.draw(out, self.flags(), pressed);
        Ok(())
    }
}

impl Element for Popup {
    fn state(&self) -> &ElementState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ElementState {
        &mut self.state
    }

    fn on_reset(&mut self, _ui: &mut UiContext) {
        if let PopupKind::Lock { input, .. } = &mut self.kind {
            if !input.is_empty() {
                input.clear();
                self.invalidate(UiFlags::PROPERTY_CHANGED);
            }
        }
    }

    fn on_update(&mut self, ui: &mut UiContext) {
        let id = self.id();
        let PopupKind::Progress { source, last, hold } = &mut self.kind else {
            return;
        };
        let changed = assign(last, source());
        let (value, hold) = (*last, *hold);
        if changed {
            self.invalidate(UiFlags::PROPERTY_CHANGED);
        }
        let mut finished = false;
        if let Some(token) = ui.request_token(id) {
            if value < 1.0 {
                token.timer.reset();
            } else if token.timer.has_elapsed(hold) {
                finished = true;
            }
        }
        if finished {
            tracing::debug!(popup = %id, "progress complete, closing");
            self.close(ui);
        }
    }

    fn on_interact(&mut self, ui: &mut UiContext, e: Interaction) -> bool {
        match &mut self.kind {
            PopupKind::Warning { .. } => self.interact_frame(ui, e),
            PopupKind::Dialog { .. } => {
                if ui.request_token(self.id()).is_none() {
                    return false;
                }
                if e.is(Key::Left, KeyState::Down) {
                    self.set_choice(ui, FocusState::Normal);
                    true
                } else if e.is(Key::Right, KeyState::Down) {
                    self.set_choice(ui, FocusState::Pressed);
                    true
                } else {
                    self.interact_frame(ui, e)
                }
            }
            PopupKind::Lock { length, input, .. } => {
                if e.state == KeyState::Up {
                    match e.key {
                        // Escape deletes while there is something to delete.
                        Key::Escape if !input.is_empty() => {
                            input.pop();
                            self.invalidate(UiFlags::PROPERTY_CHANGED);
                            return true;
                        }
                        Key::Char(c) => {
                            if input.len() < *length {
                                input.push(c);
                                self.invalidate(UiFlags::PROPERTY_CHANGED);
                            }
                            return true;
                        }
                        _ => {}
                    }
                }
                if self.interact_frame(ui, e) {
                    self.reset(ui);
                }
                true
            }
            PopupKind::Progress { .. } => true,
        }
    }
}

impl Layout for Popup {
    /// At least four rows: border, header, content, border. Two or three:
    /// header on top, content at the bottom. One: header and content side
    /// by side. Without a focus change only the content line is redrawn.
    fn on_draw(&mut self, ui: &mut UiContext, rows: Range) -> Result<()> {
        let pressed = ui
            .request_token(self.id())
            .is_some_and(|t| t.state == FocusState::Pressed);
        let full = self.is_dirty(UiFlags::FOCUS_CHANGED);
        let len = rows.length();

        if len < 2 {
            let header_width = display_width(&self.header) as u16;
            let out = ui.draw_row(rows.start as u16)?;
            if !out.omit(header_width + 1, !full) {
                out.write_str(&self.header);
                out.write_char(' ');
            }
            self.kind.draw(out, self.flags(), pressed);
            return Ok(());
        }

        if len < 4 {
            if full {
                ui.draw_row(rows.start as u16)?
                    .fill_text(&self.header, Alignment::Center);
                for row in rows.start + 1..rows.end {
                    ui.draw_row(row as u16)?.fill();
                }
            }
            return self.draw_content(ui, rows.end, pressed);
        }

        let header_row = rows.start + (len / 2 - 1).max(0);
        let content_row = rows.start + (len / 2).max(1);
        if !full {
            return self.draw_content(ui, content_row, pressed);
        }
        for row in rows.rows() {
            if row == header_row {
                ui.draw_row(row as u16)?
                    .fill_text(&self.header, Alignment::Center);
            } else if row == content_row {
                self.draw_content(ui, row, pressed)?;
            } else if row == rows.start || row == rows.end {
                let out = ui.draw_row(row as u16)?;
                let (corner, edge) = (out.glyphs().border_corner, out.glyphs().border_edge);
                out.fill_framed(corner, edge, corner);
            } else {
                ui.draw_row(row as u16)?.fill();
            }
        }
        Ok(())
    }
}
