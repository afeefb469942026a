//! Panels Module — Menu layout and its panels.
//!
//! Responsibilities:
//! - MenuLayout: one visible panel at a time, Left/Right cycles
//! - ControlPanel: scrolling list of controls bound to display rows
//! - NavigationPanel: a single action behind a header
//!
//! Every panel draws a header on its first row and its body below. A panel
//! with fewer than two rows shows the header only.

use crate::context::UiContext;
use crate::error::Result;
use crate::event::{Interaction, Key, KeyState};
use crate::property::Action;
use crate::render::DrawContext;
use crate::scroll::Viewport;
use crate::tree::{ContentRef, Element, ElementId, ElementState, Layout, LayoutRef, Node};
use crate::types::{assign, Alignment, Range, UiFlags};

/// Header row: `<header>` with the over glyphs, or the down glyphs while the
/// panel itself holds focus. Only redrawn when focus changed.
fn draw_header(
    ui: &mut UiContext,
    id: ElementId,
    flags: UiFlags,
    header: &str,
    row: i32,
) -> Result<()> {
    if !flags.matches(UiFlags::FOCUS_CHANGED) {
        return Ok(());
    }
    let glyphs = ui.glyphs();
    let text = if ui.is_focused(id) {
        format!("{}{header}{}", glyphs.pointer_down_left, glyphs.pointer_down_right)
    } else {
        format!("{}{header}{}", glyphs.pointer_over_left, glyphs.pointer_over_right)
    };
    ui.draw_row(row as u16)?.fill_text(&text, Alignment::Center);
    Ok(())
}

// ============================================================================
// MenuLayout
// ============================================================================

pub struct MenuLayout {
    state: ElementState,
    pub panels: Vec<LayoutRef>,
    selection: usize,
}

impl MenuLayout {
    pub fn new(panels: Vec<LayoutRef>) -> Self {
        Self {
            state: ElementState::new(),
            panels,
            selection: 0,
        }
    }

    pub fn selection(&self) -> usize {
        self.selection
    }

    pub fn selected_panel(&self) -> Option<&LayoutRef> {
        self.panels.get(self.selection)
    }

    /// Select panel `value`, wrapping past either end. A change refocuses
    /// on the new panel with a full redraw and reset.
    pub fn set_selection(&mut self, ui: &mut UiContext, value: i32) {
        let count = self.panels.len() as i32;
        if count == 0 {
            return;
        }
        let value = if value < 0 {
            count - 1
        } else if value >= count {
            0
        } else {
            value
        };
        if assign(&mut self.selection, value as usize) {
            self.invalidate(UiFlags::PROPERTY_CHANGED);
            self.handle_focus(ui, true, true);
        }
    }
}

impl Element for MenuLayout {
    fn state(&self) -> &ElementState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ElementState {
        &mut self.state
    }

    fn focus_source(&self) -> Option<Node> {
        self.selected_panel().cloned().map(Node::Layout)
    }

    fn on_reset(&mut self, ui: &mut UiContext) {
        self.set_selection(ui, 0);
    }

    fn on_update(&mut self, ui: &mut UiContext) {
        let panel = self.selected_panel().cloned();
        self.handle_update(ui, panel.as_ref());
    }

    fn on_interact(&mut self, ui: &mut UiContext, e: Interaction) -> bool {
        if e.state == KeyState::Up {
            return false;
        }
        let selection = self.selection as i32;
        match e.key {
            Key::Left => self.set_selection(ui, selection - 1),
            Key::Right => self.set_selection(ui, selection + 1),
            _ => return false,
        }
        true
    }
}

impl Layout for MenuLayout {
    fn on_draw(&mut self, ui: &mut UiContext, rows: Range) -> Result<()> {
        let panel = self.selected_panel().cloned();
        self.handle_draw(ui, panel.as_ref(), rows)?;
        Ok(())
    }
}

// ============================================================================
// ControlPanel
// ============================================================================

pub struct ControlPanel {
    state: ElementState,
    pub header: String,
    pub controls: Vec<ContentRef>,
    /// -1 while the panel itself holds focus.
    selection: i32,
    viewport: Viewport,
}

impl ControlPanel {
    pub fn new(header: impl Into<String>, controls: Vec<ContentRef>) -> Self {
        Self {
            state: ElementState::new(),
            header: header.into(),
            controls,
            selection: -1,
            viewport: Viewport::default(),
        }
    }

    pub fn selection(&self) -> i32 {
        self.selection
    }

    pub fn offset(&self) -> i32 {
        self.viewport.offset()
    }

    pub fn selected_control(&self) -> Option<&ContentRef> {
        usize::try_from(self.selection)
            .ok()
            .and_then(|i| self.controls.get(i))
    }

    /// Clamped to [-1, len - 1]. A change moves focus to the new control.
    pub fn set_selection(&mut self, ui: &mut UiContext, value: i32) {
        let last = self.controls.len() as i32 - 1;
        if assign(&mut self.selection, value.min(last).max(-1)) {
            self.invalidate(UiFlags::PROPERTY_CHANGED);
            self.handle_focus(ui, false, false);
        }
    }

    fn draw_body(&mut self, ui: &mut UiContext, body: Range) -> Result<()> {
        let moved = self.viewport.scroll_to(self.selection, body);
        if !moved && !self.is_dirty(UiFlags::GLOBAL_DRAW) {
            return Ok(());
        }
        for (row, index) in self.viewport.slots(body, self.controls.len()) {
            match index.and_then(|i| self.controls.get(i)) {
                Some(control) => ui.bind_row(row as u16, control.clone())?,
                None => ui.draw_row(row as u16)?.fill(),
            }
        }
        Ok(())
    }
}

impl Element for ControlPanel {
    fn state(&self) -> &ElementState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ElementState {
        &mut self.state
    }

    fn focus_source(&self) -> Option<Node> {
        self.selected_control().cloned().map(Node::Content)
    }

    fn on_reset(&mut self, ui: &mut UiContext) {
        self.set_selection(ui, -1);
    }

    fn on_interact(&mut self, ui: &mut UiContext, e: Interaction) -> bool {
        if e.state == KeyState::Up {
            return false;
        }
        match e.key {
            Key::Escape => {
                self.reset(ui);
                true
            }
            Key::Down => {
                self.set_selection(ui, self.selection + 1);
                true
            }
            Key::Up => {
                self.set_selection(ui, self.selection - 1);
                true
            }
            // A selected control keeps the panel from leaking keys upward.
            _ => self.selection >= 0,
        }
    }
}

impl Layout for ControlPanel {
    fn on_draw(&mut self, ui: &mut UiContext, rows: Range) -> Result<()> {
        draw_header(ui, self.id(), self.flags(), &self.header, rows.start)?;
        if rows.length() >= 2 {
            self.draw_body(ui, rows.with_margin(1, 0))?;
        }
        Ok(())
    }
}

// ============================================================================
// NavigationPanel
// ============================================================================

pub struct NavigationPanel {
    state: ElementState,
    pub header: String,
    pub handler: Option<Action>,
}

impl NavigationPanel {
    pub fn new(header: impl Into<String>, handler: impl FnMut(&mut UiContext) + 'static) -> Self {
        Self {
            state: ElementState::new(),
            header: header.into(),
            handler: Some(Box::new(handler)),
        }
    }
}

impl Element for NavigationPanel {
    fn state(&self) -> &ElementState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ElementState {
        &mut self.state
    }

    fn on_interact(&mut self, ui: &mut UiContext, e: Interaction) -> bool {
        if !e.is(Key::Enter, KeyState::Down) {
            return false;
        }
        if let Some(handler) = self.handler.as_mut() {
            handler(ui);
        }
        true
    }
}

impl Layout for NavigationPanel {
    fn on_draw(&mut self, ui: &mut UiContext, rows: Range) -> Result<()> {
        draw_header(ui, self.id(), self.flags(), &self.header, rows.start)?;
        if rows.length() < 2 {
            return Ok(());
        }
        let body = rows.with_margin(1, 0);
        let middle = body.with_length(1, Alignment::Center);
        for row in body.rows() {
            let out = ui.draw_row(row as u16)?;
            if middle.contains(row) {
                out.fill_text("...", Alignment::Center);
            } else {
                out.fill();
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_ui;
    use crate::controls::{ButtonControl, LabelControl};
    use crate::tree::shared;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    fn labels(n: usize) -> Vec<ContentRef> {
        (0..n)
            .map(|i| shared(LabelControl::new(format!("Item {i}"))).into())
            .collect()
    }

    #[test]
    fn test_scrolling_list_offsets() {
        let panel = shared(ControlPanel::new("List", labels(10)));
        let mut ui = test_ui(10, 4, panel.clone().into());
        ui.update().unwrap();

        let mut offsets = Vec::new();
        for _ in 0..4 {
            ui.interact(Interaction::down(Key::Down));
            ui.update().unwrap();
            offsets.push(panel.borrow().offset());
        }
        assert_eq!(panel.borrow().selection(), 3);
        assert_eq!(offsets, vec![0, 0, 0, 1]);
        assert_eq!(ui.mock().row_text(1), "Item 1    ");
        assert_eq!(ui.mock().row_text(3), "- Item 3  ");
    }

    #[test]
    fn test_header_marks_panel_focus() {
        let panel = shared(ControlPanel::new("Set", labels(2)));
        let mut ui = test_ui(9, 3, panel.clone().into());
        ui.update().unwrap();
        assert_eq!(ui.mock().row_text(0), "  =Set=  ");
        assert_eq!(ui.mock().row_text(1), "Item 0   ");

        ui.interact(Interaction::down(Key::Down));
        ui.update().unwrap();
        assert_eq!(ui.mock().row_text(0), "  <Set>  ");
        assert_eq!(ui.mock().row_text(1), "- Item 0 ");
    }

    #[test]
    fn test_escape_returns_focus_to_panel() {
        let panel = shared(ControlPanel::new("Set", labels(3)));
        let panel_id = panel.borrow().id();
        let mut ui = test_ui(9, 4, panel.clone().into());
        ui.update().unwrap();
        ui.interact(Interaction::down(Key::Down));
        ui.interact(Interaction::down(Key::Down));
        ui.update().unwrap();
        assert_eq!(panel.borrow().selection(), 1);

        assert!(ui.interact(Interaction::down(Key::Escape)));
        ui.update().unwrap();
        assert_eq!(panel.borrow().selection(), -1);
        assert_eq!(ui.current_focus(), Some(panel_id));
    }

    #[test]
    fn test_selection_clamps_at_ends() {
        let panel = shared(ControlPanel::new("Set", labels(2)));
        let mut ui = test_ui(9, 3, panel.clone().into());
        ui.interact(Interaction::down(Key::Up));
        assert_eq!(panel.borrow().selection(), -1);
        for _ in 0..5 {
            ui.interact(Interaction::down(Key::Down));
        }
        assert_eq!(panel.borrow().selection(), 1);
    }

    #[test]
    fn test_selected_control_swallows_other_keys() {
        let panel = shared(ControlPanel::new("Set", labels(2)));
        let mut ui = test_ui(9, 3, panel.clone().into());
        assert!(!ui.interact(Interaction::down(Key::Char('x'))));
        ui.interact(Interaction::down(Key::Down));
        ui.update().unwrap();
        assert!(ui.interact(Interaction::down(Key::Char('x'))));
    }

    #[test]
    fn test_menu_wraps_and_resets_panels() {
        let first = shared(ControlPanel::new("A", labels(2)));
        let second = shared(ControlPanel::new("B", labels(2)));
        let menu = shared(MenuLayout::new(vec![
            first.clone().into(),
            second.clone().into(),
        ]));
        let mut ui = test_ui(5, 3, menu.clone().into());
        ui.update().unwrap();
        assert_eq!(ui.mock().row_text(0), " =A= ");

        assert!(ui.interact(Interaction::down(Key::Left)));
        assert_eq!(menu.borrow().selection(), 1);
        ui.update().unwrap();
        assert_eq!(ui.mock().row_text(0), " =B= ");
        assert_eq!(ui.current_focus(), Some(second.borrow().id()));

        assert!(ui.interact(Interaction::down(Key::Right)));
        assert_eq!(menu.borrow().selection(), 0);
        assert!(!ui.interact(Interaction::up(Key::Right)));
    }

    #[test]
    fn test_menu_arrows_reach_panel_first() {
        let clicks = Rc::new(Cell::new(0));
        let c = clicks.clone();
        let button: ContentRef = shared(ButtonControl::new("Go", move |_| c.set(c.get() + 1))).into();
        let panel = shared(ControlPanel::new("A", vec![button]));
        let menu = shared(MenuLayout::new(vec![panel.clone().into()]));
        let mut ui = test_ui(8, 2, menu.into());
        ui.update().unwrap();

        ui.interact(Interaction::down(Key::Down));
        ui.update().unwrap();
        ui.interact(Interaction::down(Key::Enter));
        ui.interact(Interaction::up(Key::Enter));
        assert_eq!(clicks.get(), 1);
        assert_eq!(ui.mock().row_text(1), "> [Go]  ");
    }

    #[test]
    fn test_navigation_panel_body_and_click() {
        let target = shared(ControlPanel::new("T", Vec::new()));
        let target_ref: LayoutRef = target.clone().into();
        let fired = Rc::new(RefCell::new(false));
        let f = fired.clone();
        let nav = shared(NavigationPanel::new("Go", move |ui: &mut UiContext| {
            *f.borrow_mut() = true;
            ui.navigate(target_ref.clone(), true);
        }));
        let mut ui = test_ui(7, 4, nav.clone().into());
        ui.update().unwrap();
        assert_eq!(ui.mock().row_text(0), " =Go=  ");
        assert_eq!(ui.mock().row_text(1), "       ");
        assert_eq!(ui.mock().row_text(2), "  ...  ");
        assert_eq!(ui.mock().row_text(3), "       ");

        assert!(ui.interact(Interaction::down(Key::Enter)));
        assert!(*fired.borrow());
        assert_eq!(ui.root().id(), target.borrow().id());
    }

    #[test]
    fn test_single_row_panel_draws_header_only() {
        let panel = shared(ControlPanel::new("S", labels(3)));
        let mut ui = test_ui(5, 1, panel.into());
        ui.update().unwrap();
        assert_eq!(ui.mock().row_text(0), " =S= ");
        assert!(ui.bound(0).is_none());
    }
}
