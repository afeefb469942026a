//! UiContext struct: the coordinator that owns all runtime state.
//!
//! The context owns the printer, the active view (root plus optional
//! overlay), the resolved focus, the single focus token, the row-binding
//! table, and the popup stack. It is created by `UiContext::begin` and torn
//! down by `UiContext::end`, and is passed by `&mut` into every element hook;
//! there is no global instance.

use std::time::Instant;

use crate::error::{Result, UiError};
use crate::event::{self, Interaction};
use crate::glyphs::Glyphs;
use crate::popups::{PopupRef, PopupStack};
use crate::render::{DrawContext, Printer};
use crate::terminal::TerminalBackend;
use crate::tree::{ContentRef, ElementId, LayoutRef, Node};
use crate::types::{FocusToken, Range, UiFlags};

pub struct UiContext {
    // Render Module
    printer: Printer,
    rows: Vec<Option<ContentRef>>,

    // View
    root: LayoutRef,
    overlay: Option<LayoutRef>,
    pending_resets: Vec<Node>,

    // Focus
    focus: Option<Node>,
    token: FocusToken,
    now: Instant,

    // Sticky flags, consumed by the next tick
    global_draw: bool,
    resolve_focus: bool,

    popups: PopupStack,

    // Diagnostics
    pub debug_mode: bool,
}

impl UiContext {
    /// Initialize `backend` and make `root` the active view. The first tick
    /// draws everything.
    pub fn begin(mut backend: Box<dyn TerminalBackend>, root: LayoutRef) -> Result<Self> {
        backend.init()?;
        let printer = Printer::new(backend);
        let now = Instant::now();
        let mut ctx = Self {
            rows: vec![None; printer.height() as usize],
            printer,
            root: root.clone(),
            overlay: None,
            pending_resets: Vec::new(),
            focus: None,
            token: FocusToken::fresh(now),
            now,
            global_draw: false,
            resolve_focus: false,
            popups: PopupStack::default(),
            debug_mode: false,
        };
        Node::Layout(root).reset(&mut ctx);
        ctx.invalidate_view();
        tracing::debug!(
            width = ctx.width(),
            height = ctx.height(),
            "ui context started"
        );
        Ok(ctx)
    }

    /// Shut the backend down and hand it back. Every element reference held
    /// by the context is released.
    pub fn end(self) -> Result<Box<dyn TerminalBackend>> {
        let mut backend = self.printer.into_backend();
        backend.shutdown()?;
        tracing::debug!("ui context ended");
        Ok(backend)
    }

    pub fn debug_log(&self, msg: &str) {
        if self.debug_mode {
            tracing::debug!(target: "crystalline::debug", "{msg}");
        }
    }

    pub fn set_debug(&mut self, enabled: bool) {
        self.debug_mode = enabled;
    }

    /// Swap the glyph table and redraw everything with it.
    pub fn set_glyphs(&mut self, glyphs: Glyphs) {
        self.printer.set_glyphs(glyphs);
        self.invalidate_view();
    }

    pub fn glyphs(&self) -> &Glyphs {
        self.printer.glyphs()
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn width(&self) -> u16 {
        self.printer.width()
    }

    pub fn height(&self) -> u16 {
        self.printer.height()
    }

    pub fn has_overlay(&self) -> bool {
        self.overlay.is_some()
    }

    pub fn root(&self) -> &LayoutRef {
        &self.root
    }

    pub fn overlay(&self) -> Option<&LayoutRef> {
        self.overlay.as_ref()
    }

    /// The overlay if one is shown, otherwise the root.
    pub fn current_view(&self) -> &LayoutRef {
        self.overlay.as_ref().unwrap_or(&self.root)
    }

    pub fn current_focus(&self) -> Option<ElementId> {
        self.focus.as_ref().map(Node::id)
    }

    pub fn is_focused(&self, id: ElementId) -> bool {
        self.current_focus() == Some(id)
    }

    /// The focus token, but only for the element that currently holds focus.
    pub fn request_token(&mut self, id: ElementId) -> Option<&mut FocusToken> {
        if self.is_focused(id) {
            Some(&mut self.token)
        } else {
            None
        }
    }

    pub fn printer_mut(&mut self) -> &mut Printer {
        &mut self.printer
    }

    /// The content element bound to `row`, if any.
    pub fn bound(&self, row: u16) -> Option<&ContentRef> {
        self.rows.get(row as usize).and_then(Option::as_ref)
    }

    // ========================================================================
    // View switching
    // ========================================================================

    /// Force a full redraw and focus re-resolution on the next tick.
    pub fn invalidate_view(&mut self) {
        self.invalidate_focus();
        self.global_draw = true;
    }

    pub fn invalidate_focus(&mut self) {
        self.resolve_focus = true;
    }

    /// Every row binding belongs to the view that made it; a new view binds
    /// its own.
    fn release_rows(&mut self) {
        self.rows.iter_mut().for_each(|slot| *slot = None);
    }

    /// Make `root` the base view. Closes any overlay. No-op if `root` is
    /// already the base view.
    pub fn navigate(&mut self, root: LayoutRef, reset: bool) {
        if self.root.id() == root.id() {
            return;
        }
        tracing::debug!(from = %self.root.id(), to = %root.id(), "navigate");
        self.overlay = None;
        self.root = root.clone();
        self.release_rows();
        self.invalidate_view();
        if reset {
            Node::Layout(root).reset(self);
        }
    }

    /// Show `overlay` above the root, replacing any overlay already shown.
    pub fn show(&mut self, overlay: LayoutRef, reset: bool) {
        tracing::debug!(overlay = %overlay.id(), reset, "show overlay");
        self.overlay = Some(overlay.clone());
        self.release_rows();
        if reset {
            Node::Layout(overlay).reset(self);
        }
        self.invalidate_view();
    }

    pub fn hide(&mut self) {
        if let Some(overlay) = self.overlay.take() {
            tracing::debug!(overlay = %overlay.id(), "hide overlay");
        }
        self.release_rows();
        self.invalidate_view();
    }

    /// Queue a reset for an element that is busy in the current dispatch.
    pub(crate) fn defer_reset(&mut self, node: Node) {
        if self.pending_resets.iter().any(|n| n.id() == node.id()) {
            return;
        }
        tracing::debug!(element = %node.id(), "reset deferred to next tick");
        self.pending_resets.push(node);
    }

    // ========================================================================
    // Tick
    // ========================================================================

    pub fn update(&mut self) -> Result<()> {
        self.update_at(Instant::now())
    }

    /// One tick against an explicit clock.
    pub fn update_at(&mut self, now: Instant) -> Result<()> {
        self.now = now;

        for node in std::mem::take(&mut self.pending_resets) {
            node.reset(self);
        }

        let global_draw = std::mem::take(&mut self.global_draw);
        let resolve_focus = std::mem::take(&mut self.resolve_focus);

        if resolve_focus {
            self.resolve_focus();
        }
        self.token.update(now);

        let view = self.current_view().clone();
        view.update(self);
        for row in 0..self.rows.len() {
            if let Some(content) = self.rows[row].clone() {
                content.update(self);
            }
        }

        if self.height() > 0 {
            let rows = Range::new(0, i32::from(self.height()) - 1);
            view.draw(self, rows, global_draw)?;
        }
        for row in 0..self.rows.len() {
            if let Some(content) = self.rows[row].clone() {
                content.draw(self, row as u16, global_draw)?;
            }
        }

        self.printer.flush()
    }

    fn resolve_focus(&mut self) {
        let next = Node::Layout(self.current_view().clone()).resolve();
        if self.current_focus() == Some(next.id()) {
            return;
        }
        if let Some(previous) = self.focus.take() {
            previous.invalidate(UiFlags::FOCUS_LOST);
        }
        next.invalidate(UiFlags::FOCUS_GOT);
        self.debug_log(&format!("focus: {}", next.id()));
        self.focus = Some(next);
        self.token = FocusToken::fresh(self.now);
    }

    // ========================================================================
    // Input
    // ========================================================================

    /// Route `e` into the current view. Returns whether it was consumed.
    pub fn interact(&mut self, e: Interaction) -> bool {
        let view = self.current_view().clone();
        Node::Layout(view).interact(self, e)
    }

    /// Pull pending input from the backend and dispatch it.
    pub fn read_input(&mut self, timeout_ms: u32) -> usize {
        event::read_input(self, timeout_ms)
    }

    // ========================================================================
    // Row binding
    // ========================================================================

    fn check_row(&self, row: u16) -> Result<()> {
        if (row as usize) < self.rows.len() {
            Ok(())
        } else {
            Err(UiError::RowOutOfRange {
                row,
                height: self.height(),
            })
        }
    }

    /// Hand `row` to `content`. A new binding forces a full render of it.
    pub fn bind_row(&mut self, row: u16, content: ContentRef) -> Result<()> {
        self.check_row(row)?;
        let slot = &mut self.rows[row as usize];
        if slot.as_ref().map(ContentRef::id) == Some(content.id()) {
            return Ok(());
        }
        content.invalidate(UiFlags::GLOBAL_DRAW);
        *slot = Some(content);
        Ok(())
    }

    /// Take `row` back from any bound content and return the printer,
    /// positioned at its first column.
    pub fn draw_row(&mut self, row: u16) -> Result<&mut Printer> {
        self.check_row(row)?;
        self.rows[row as usize] = None;
        Ok(self.printer.begin(row))
    }

    /// Drawing surface for `row`, plus the token when `id` holds focus.
    pub(crate) fn line(
        &mut self,
        row: u16,
        id: ElementId,
    ) -> Result<(&mut dyn DrawContext, Option<&mut FocusToken>)> {
        self.check_row(row)?;
        let focused = self.is_focused(id);
        let out: &mut dyn DrawContext = self.printer.begin(row);
        let token = if focused { Some(&mut self.token) } else { None };
        Ok((out, token))
    }

    // ========================================================================
    // Popups
    // ========================================================================

    pub fn popups(&self) -> &PopupStack {
        &self.popups
    }

    pub fn is_popup_open(&self, id: ElementId) -> bool {
        self.popups.contains(id)
    }

    /// Open `popup` in the first free slot and show whichever open popup now
    /// has the highest priority. Fails if it is already open or the stack is
    /// full.
    pub fn show_popup(&mut self, popup: PopupRef) -> bool {
        if self.popups.contains(popup.id()) {
            return false;
        }
        let Some(slot) = self.popups.insert(popup.clone()) else {
            tracing::warn!(popup = %popup.id(), "popup stack full, show rejected");
            return false;
        };
        tracing::debug!(popup = %popup.id(), slot, priority = popup.priority(), "popup opened");

        Node::Layout(popup.layout().clone()).reset(self);

        if let Some(top) = self.popups.top().cloned() {
            self.popups.set_current(Some(top.id()));
            self.show(top.layout().clone(), false);
        }
        true
    }

    /// Close popup `id`. If the popup stack owned the overlay, the next
    /// highest-priority popup takes over (or the overlay is hidden).
    pub fn hide_popup(&mut self, id: ElementId) -> bool {
        let previous_top = self.popups.current();
        if !self.popups.remove(id) {
            return false;
        }
        let top = self.popups.top().cloned();
        let overlay = self.overlay.as_ref().map(LayoutRef::id);
        tracing::debug!(popup = %id, "popup closed");

        match &top {
            Some(next) if overlay.is_some() && overlay == previous_top => {
                self.show(next.layout().clone(), false);
            }
            _ if overlay.is_some() && (overlay == previous_top || overlay == Some(id)) => {
                self.hide();
            }
            _ => {}
        }
        self.popups.set_current(top.as_ref().map(PopupRef::id));
        true
    }
}

// ============================================================================
// Test helpers
// ============================================================================

#[cfg(test)]
pub(crate) fn test_ui(width: u16, height: u16, root: LayoutRef) -> UiContext {
    let backend = Box::new(crate::terminal::MockBackend::new(width, height));
    match UiContext::begin(backend, root) {
        Ok(ui) => ui,
        Err(e) => panic!("mock backend failed to start: {e}"),
    }
}

#[cfg(test)]
impl UiContext {
    pub(crate) fn mock(&mut self) -> &mut crate::terminal::MockBackend {
        self.printer
            .backend_mut()
            .as_any_mut()
            .downcast_mut::<crate::terminal::MockBackend>()
            .expect("test context must use MockBackend")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Key;
    use crate::tree::{shared, Content, Element, ElementState, Layout};
    use crate::types::Alignment;

    /// A view that fills every row with one character, and can optionally
    /// hand one row to a content line.
    struct Screen {
        state: ElementState,
        glyph: char,
        bound: Option<(u16, ContentRef)>,
        source: Option<Node>,
        draws: usize,
        resets: usize,
        keys: Vec<Interaction>,
    }

    impl Screen {
        fn new(glyph: char) -> Self {
            Self {
                state: ElementState::new(),
                glyph,
                bound: None,
                source: None,
                draws: 0,
                resets: 0,
                keys: Vec::new(),
            }
        }
    }

    impl Element for Screen {
        fn state(&self) -> &ElementState {
            &self.state
        }
        fn state_mut(&mut self) -> &mut ElementState {
            &mut self.state
        }
        fn focus_source(&self) -> Option<Node> {
            self.source.clone()
        }
        fn on_reset(&mut self, _ui: &mut UiContext) {
            self.resets += 1;
        }
        fn on_interact(&mut self, _ui: &mut UiContext, e: Interaction) -> bool {
            self.keys.push(e);
            true
        }
    }

    impl Layout for Screen {
        fn on_draw(&mut self, ui: &mut UiContext, rows: Range) -> Result<()> {
            self.draws += 1;
            for row in rows.rows() {
                let row = row as u16;
                match &self.bound {
                    Some((r, content)) if *r == row => ui.bind_row(row, content.clone())?,
                    _ => ui.draw_row(row)?.fill_with(self.glyph),
                }
            }
            Ok(())
        }
    }

    struct Line {
        state: ElementState,
        text: String,
        saw_token: bool,
    }

    impl Line {
        fn new(text: &str) -> Self {
            Self {
                state: ElementState::new(),
                text: text.to_string(),
                saw_token: false,
            }
        }
    }

    impl Element for Line {
        fn state(&self) -> &ElementState {
            &self.state
        }
        fn state_mut(&mut self) -> &mut ElementState {
            &mut self.state
        }
    }

    impl Content for Line {
        fn on_draw(&mut self, out: &mut dyn DrawContext, token: Option<&mut FocusToken>) {
            self.saw_token = token.is_some();
            out.fill_text(&self.text, Alignment::Front);
        }
    }

    #[test]
    fn test_first_tick_draws_full_view() {
        let screen = shared(Screen::new('#'));
        let mut ui = test_ui(4, 2, screen.clone().into());
        ui.update().unwrap();
        assert_eq!(ui.mock().row_text(0), "####");
        assert_eq!(ui.mock().row_text(1), "####");
        assert_eq!(screen.borrow().resets, 1);
        assert_eq!(ui.current_focus(), Some(screen.borrow().id()));
    }

    #[test]
    fn test_idle_tick_writes_nothing() {
        let screen = shared(Screen::new('#'));
        let mut ui = test_ui(4, 2, screen.clone().into());
        ui.update().unwrap();
        ui.mock().reset_counters();
        ui.update().unwrap();
        assert_eq!(ui.mock().writes, 0);
        assert_eq!(ui.mock().moves, 0);
        assert_eq!(screen.borrow().draws, 1);
    }

    #[test]
    fn test_bound_content_draws_its_row() {
        let line = shared(Line::new("hi"));
        let mut screen = Screen::new('.');
        screen.bound = Some((1, line.clone().into()));
        let screen = shared(screen);
        let mut ui = test_ui(4, 3, screen.clone().into());
        ui.update().unwrap();

        assert_eq!(ui.mock().row_text(0), "....");
        assert_eq!(ui.mock().row_text(1), "hi  ");
        assert_eq!(ui.bound(1).map(ContentRef::id), Some(line.borrow().id()));
        assert!(!line.borrow().saw_token);
    }

    #[test]
    fn test_rebinding_same_content_keeps_it_clean() {
        let line = shared(Line::new("hi"));
        let line_ref: ContentRef = line.clone().into();
        let screen = shared(Screen::new('.'));
        let mut ui = test_ui(4, 2, screen.into());

        ui.bind_row(0, line_ref.clone()).unwrap();
        assert!(line.borrow().is_dirty(UiFlags::GLOBAL_DRAW));
        line.borrow_mut().state_mut().flags = UiFlags::empty();
        ui.bind_row(0, line_ref).unwrap();
        assert!(!line.borrow().is_dirty(UiFlags::ANY));
    }

    #[test]
    fn test_draw_row_releases_binding() {
        let line = shared(Line::new("hi"));
        let screen = shared(Screen::new('.'));
        let mut ui = test_ui(4, 2, screen.into());
        ui.bind_row(1, line.into()).unwrap();
        ui.draw_row(1).unwrap();
        assert!(ui.bound(1).is_none());
    }

    #[test]
    fn test_row_out_of_range_is_error() {
        let screen = shared(Screen::new('.'));
        let line = shared(Line::new("x"));
        let mut ui = test_ui(4, 2, screen.into());
        assert!(matches!(
            ui.bind_row(2, line.into()),
            Err(UiError::RowOutOfRange { row: 2, height: 2 })
        ));
        assert!(ui.draw_row(9).is_err());
    }

    #[test]
    fn test_focus_change_flags_and_token() {
        let line = shared(Line::new("a"));
        let line_id = line.borrow().id();
        let screen = shared(Screen::new('.'));
        let screen_id = screen.borrow().id();
        let mut ui = test_ui(4, 2, screen.clone().into());
        ui.update().unwrap();
        assert!(ui.request_token(screen_id).is_some());

        screen.borrow_mut().source = Some(Node::Content(line.clone().into()));
        ui.invalidate_focus();
        ui.update().unwrap();

        assert_eq!(ui.current_focus(), Some(line_id));
        assert!(ui.request_token(screen_id).is_none());
        assert!(ui.request_token(line_id).is_some());
        // The screen redrew because it lost focus; the line is not bound so
        // its FOCUS_GOT flag is still pending.
        assert_eq!(screen.borrow().draws, 2);
        assert!(line.borrow().is_dirty(UiFlags::FOCUS_GOT));
    }

    #[test]
    fn test_token_is_fresh_after_focus_moves() {
        let line = shared(Line::new("a"));
        let line_id = line.borrow().id();
        let screen = shared(Screen::new('.'));
        let screen_id = screen.borrow().id();
        let mut ui = test_ui(4, 2, screen.clone().into());
        ui.update().unwrap();
        if let Some(token) = ui.request_token(screen_id) {
            token.state = crate::types::FocusState::Engaged;
        }

        screen.borrow_mut().source = Some(Node::Content(line.into()));
        ui.invalidate_focus();
        ui.update().unwrap();
        let token = ui.request_token(line_id).unwrap();
        assert_eq!(token.state, crate::types::FocusState::Normal);
    }

    #[test]
    fn test_overlay_takes_input_and_hide_restores_root() {
        let root = shared(Screen::new('.'));
        let overlay = shared(Screen::new('!'));
        let mut ui = test_ui(3, 1, root.clone().into());
        ui.update().unwrap();

        ui.show(overlay.clone().into(), true);
        assert!(ui.has_overlay());
        assert_eq!(overlay.borrow().resets, 1);
        ui.update().unwrap();
        assert_eq!(ui.mock().row_text(0), "!!!");

        assert!(ui.interact(Interaction::down(Key::Enter)));
        assert_eq!(overlay.borrow().keys.len(), 1);
        assert!(root.borrow().keys.is_empty());

        ui.hide();
        ui.update().unwrap();
        assert_eq!(ui.mock().row_text(0), "...");
        assert_eq!(ui.current_focus(), Some(root.borrow().id()));
    }

    #[test]
    fn test_overlay_releases_rows_bound_by_root() {
        let line = shared(Line::new("x"));
        let line_ref: ContentRef = line.clone().into();
        let mut root = Screen::new('.');
        root.bound = Some((1, line_ref));
        let root = shared(root);
        let overlay = shared(Screen::new('!'));
        let mut ui = test_ui(3, 3, root.clone().into());
        ui.update().unwrap();
        assert_eq!(ui.bound(1).map(ContentRef::id), Some(line.borrow().id()));

        ui.show(overlay.into(), false);
        assert!(ui.bound(1).is_none());
        ui.update().unwrap();
        assert!(ui.bound(1).is_none());
        assert_eq!(ui.mock().row_text(1), "!!!");

        ui.hide();
        assert!(ui.bound(1).is_none());
        ui.update().unwrap();
        assert_eq!(ui.bound(1).map(ContentRef::id), Some(line.borrow().id()));
        assert_eq!(ui.mock().row_text(1), "x  ");
    }

    #[test]
    fn test_navigate_closes_overlay_and_resets() {
        let a = shared(Screen::new('a'));
        let b = shared(Screen::new('b'));
        let overlay = shared(Screen::new('!'));
        let mut ui = test_ui(2, 1, a.clone().into());
        ui.show(overlay.into(), false);

        ui.navigate(b.clone().into(), true);
        assert!(!ui.has_overlay());
        assert_eq!(b.borrow().resets, 1);
        ui.update().unwrap();
        assert_eq!(ui.mock().row_text(0), "bb");

        // Navigating to the current root is a no-op.
        ui.navigate(b.clone().into(), true);
        assert_eq!(b.borrow().resets, 1);
    }

    #[test]
    fn test_reset_of_busy_view_is_deferred() {
        let a = shared(Screen::new('a'));
        let a_ref: LayoutRef = a.clone().into();
        let b = shared(Screen::new('b'));
        let mut ui = test_ui(2, 1, b.into());

        {
            let _busy = a.borrow_mut();
            ui.navigate(a_ref, true);
        }
        assert_eq!(a.borrow().resets, 0);
        ui.update().unwrap();
        assert_eq!(a.borrow().resets, 1);
    }

    #[test]
    fn test_set_glyphs_forces_redraw() {
        let screen = shared(Screen::new('.'));
        let mut ui = test_ui(2, 1, screen.clone().into());
        ui.update().unwrap();
        ui.set_glyphs(Glyphs::default());
        ui.update().unwrap();
        assert_eq!(screen.borrow().draws, 2);
    }

    #[test]
    fn test_read_input_dispatches_injected_events() {
        let screen = shared(Screen::new('.'));
        let mut ui = test_ui(2, 1, screen.clone().into());
        ui.mock().injected_events = vec![
            Interaction::down(Key::Up),
            Interaction::up(Key::Up),
        ];
        assert_eq!(ui.read_input(0), 2);
        assert_eq!(screen.borrow().keys.len(), 2);
    }

    #[test]
    fn test_end_returns_backend() {
        let screen = shared(Screen::new('.'));
        let ui = test_ui(2, 1, screen.into());
        let backend = ui.end().unwrap();
        assert_eq!(backend.size(), (2, 1));
    }
}
