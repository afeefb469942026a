//! Tree Module — Element base, render contracts, and focus delegation.
//!
//! Responsibilities:
//! - Identity allocation (sequential ids, never recycled; 0 is invalid)
//! - Dirty-flag bookkeeping shared by every element
//! - Layout (row region) and Content (single line) draw protocols
//! - Focus-source delegation, resolved recursively to a leaf
//!
//! Elements are shared as `Rc<RefCell<..>>` so the same object can sit in a
//! parent, the row-binding table, and the popup stack at once. Every access
//! through a handle uses `try_borrow*`: an element that is already busy in
//! the current dispatch is skipped (or its reset deferred) instead of
//! panicking.

use std::cell::RefCell;
use std::fmt;
use std::num::NonZeroU32;
use std::rc::Rc;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::context::UiContext;
use crate::error::Result;
use crate::event::Interaction;
use crate::render::DrawContext;
use crate::types::{FocusToken, Range, UiFlags};

// ============================================================================
// Identity
// ============================================================================

static NEXT_ID: AtomicU32 = AtomicU32::new(1); // ElementId(0) is permanently invalid

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(NonZeroU32);

impl ElementId {
    fn next() -> Self {
        let raw = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        Self(NonZeroU32::new(raw).unwrap_or(NonZeroU32::MIN))
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identity and dirty flags embedded in every element.
#[derive(Debug)]
pub struct ElementState {
    id: ElementId,
    pub flags: UiFlags,
}

impl ElementState {
    pub fn new() -> Self {
        Self {
            id: ElementId::next(),
            flags: UiFlags::empty(),
        }
    }

    pub fn id(&self) -> ElementId {
        self.id
    }
}

impl Default for ElementState {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Element
// ============================================================================

pub trait Element {
    fn state(&self) -> &ElementState;
    fn state_mut(&mut self) -> &mut ElementState;

    /// The single child this element currently delegates input priority to.
    fn focus_source(&self) -> Option<Node> {
        None
    }

    fn on_reset(&mut self, _ui: &mut UiContext) {}
    fn on_update(&mut self, _ui: &mut UiContext) {}
    fn on_validate(&mut self, _ui: &mut UiContext) {}
    fn on_interact(&mut self, _ui: &mut UiContext, _e: Interaction) -> bool {
        false
    }

    fn id(&self) -> ElementId {
        self.state().id
    }

    fn flags(&self) -> UiFlags {
        self.state().flags
    }

    /// `GLOBAL_DRAW` matches any `reason`; pass `UiFlags::ANY` to ask
    /// whether anything is set at all.
    fn is_dirty(&self, reason: UiFlags) -> bool {
        self.state().flags.matches(reason)
    }

    fn invalidate(&mut self, flag: UiFlags) {
        self.state_mut().flags |= flag;
    }

    fn reset(&mut self, ui: &mut UiContext) {
        self.invalidate(UiFlags::LOCAL_RESET);
        if let Some(source) = self.focus_source() {
            source.reset(ui);
        }
        self.on_reset(ui);
    }

    fn update(&mut self, ui: &mut UiContext) {
        self.on_update(ui);
    }

    /// Offer `e` to the focus source first; handle it locally only if the
    /// source declines.
    fn interact(&mut self, ui: &mut UiContext, e: Interaction) -> bool {
        if let Some(source) = self.focus_source() {
            if source.interact(ui, e) {
                return true;
            }
        }
        self.on_interact(ui, e)
    }
}

/// Capability of leaves that can take part in the focus-token state machine.
pub trait Interactable {
    fn is_interactable(&self) -> bool;
}

// ============================================================================
// Layout
// ============================================================================

/// An element that renders into a range of display rows.
pub trait Layout: Element {
    fn on_draw(&mut self, _ui: &mut UiContext, _rows: Range) -> Result<()> {
        Ok(())
    }

    fn draw(&mut self, ui: &mut UiContext, rows: Range, redraw: bool) -> Result<()> {
        if rows.length() <= 0 {
            return Ok(());
        }
        if redraw {
            self.invalidate(UiFlags::GLOBAL_DRAW);
        }
        if self.is_dirty(UiFlags::ANY) {
            self.on_validate(ui);
            self.on_draw(ui, rows)?;
            self.state_mut().flags = UiFlags::empty();
        }
        Ok(())
    }

    /// Update `child`; a child left dirty marks this layout `LAYOUT_CHANGED`.
    fn handle_update(&mut self, ui: &mut UiContext, child: Option<&LayoutRef>) -> bool {
        let Some(child) = child else {
            return false;
        };
        child.update(ui);
        if child.is_dirty(UiFlags::ANY) {
            self.invalidate(UiFlags::LAYOUT_CHANGED);
        }
        true
    }

    /// Draw `child` into `rows`, but only while this layout is `LAYOUT_CHANGED`.
    fn handle_draw(
        &mut self,
        ui: &mut UiContext,
        child: Option<&LayoutRef>,
        rows: Range,
    ) -> Result<bool> {
        let Some(child) = child else {
            return Ok(false);
        };
        if self.is_dirty(UiFlags::LAYOUT_CHANGED) {
            child.draw(ui, rows, self.is_dirty(UiFlags::GLOBAL_DRAW))?;
        }
        Ok(true)
    }

    /// Redirect attention to the current focus source (or self), then ask the
    /// coordinator to re-resolve focus on the next tick.
    fn handle_focus(&mut self, ui: &mut UiContext, redraw: bool, reset: bool) {
        match self.focus_source() {
            Some(source) => {
                if redraw {
                    source.invalidate(UiFlags::GLOBAL_DRAW);
                }
                if reset {
                    source.reset(ui);
                }
            }
            None => {
                if redraw {
                    self.invalidate(UiFlags::GLOBAL_DRAW);
                }
                if reset {
                    self.reset(ui);
                }
            }
        }
        ui.invalidate_focus();
    }
}

// ============================================================================
// Content
// ============================================================================

/// An element that renders one logical line.
pub trait Content: Element {
    /// `token` is present only while this element holds focus.
    fn on_draw(&mut self, _out: &mut dyn DrawContext, _token: Option<&mut FocusToken>) {}

    fn draw(&mut self, ui: &mut UiContext, row: u16, redraw: bool) -> Result<()> {
        if redraw {
            self.invalidate(UiFlags::GLOBAL_DRAW);
        }
        if self.is_dirty(UiFlags::ANY) {
            self.on_validate(ui);
            let (out, token) = ui.line(row, self.id())?;
            self.on_draw(out, token);
            self.state_mut().flags = UiFlags::empty();
        }
        Ok(())
    }
}

// ============================================================================
// Shared handles
// ============================================================================

pub fn shared<T>(value: T) -> Rc<RefCell<T>> {
    Rc::new(RefCell::new(value))
}

#[derive(Clone)]
pub struct LayoutRef {
    id: ElementId,
    cell: Rc<RefCell<dyn Layout>>,
}

#[derive(Clone)]
pub struct ContentRef {
    id: ElementId,
    cell: Rc<RefCell<dyn Content>>,
}

impl<T: Layout + 'static> From<Rc<RefCell<T>>> for LayoutRef {
    fn from(cell: Rc<RefCell<T>>) -> Self {
        let id = cell.borrow().id();
        Self { id, cell }
    }
}

impl<T: Content + 'static> From<Rc<RefCell<T>>> for ContentRef {
    fn from(cell: Rc<RefCell<T>>) -> Self {
        let id = cell.borrow().id();
        Self { id, cell }
    }
}

impl fmt::Debug for LayoutRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LayoutRef({})", self.id)
    }
}

impl fmt::Debug for ContentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentRef({})", self.id)
    }
}

impl LayoutRef {
    pub fn id(&self) -> ElementId {
        self.id
    }

    pub fn is_dirty(&self, reason: UiFlags) -> bool {
        self.cell.try_borrow().is_ok_and(|l| l.is_dirty(reason))
    }

    pub fn invalidate(&self, flag: UiFlags) {
        match self.cell.try_borrow_mut() {
            Ok(mut l) => l.invalidate(flag),
            Err(_) => tracing::trace!(id = %self.id, "invalidate skipped, element busy"),
        }
    }

    pub fn update(&self, ui: &mut UiContext) {
        match self.cell.try_borrow_mut() {
            Ok(mut l) => l.update(ui),
            Err(_) => tracing::trace!(id = %self.id, "update skipped, element busy"),
        }
    }

    pub fn draw(&self, ui: &mut UiContext, rows: Range, redraw: bool) -> Result<()> {
        match self.cell.try_borrow_mut() {
            Ok(mut l) => l.draw(ui, rows, redraw),
            Err(_) => {
                tracing::trace!(id = %self.id, "draw skipped, element busy");
                Ok(())
            }
        }
    }
}

impl ContentRef {
    pub fn id(&self) -> ElementId {
        self.id
    }

    pub fn is_dirty(&self, reason: UiFlags) -> bool {
        self.cell.try_borrow().is_ok_and(|c| c.is_dirty(reason))
    }

    pub fn invalidate(&self, flag: UiFlags) {
        match self.cell.try_borrow_mut() {
            Ok(mut c) => c.invalidate(flag),
            Err(_) => tracing::trace!(id = %self.id, "invalidate skipped, element busy"),
        }
    }

    pub fn update(&self, ui: &mut UiContext) {
        match self.cell.try_borrow_mut() {
            Ok(mut c) => c.update(ui),
            Err(_) => tracing::trace!(id = %self.id, "update skipped, element busy"),
        }
    }

    pub fn draw(&self, ui: &mut UiContext, row: u16, redraw: bool) -> Result<()> {
        match self.cell.try_borrow_mut() {
            Ok(mut c) => c.draw(ui, row, redraw),
            Err(_) => {
                tracing::trace!(id = %self.id, "draw skipped, element busy");
                Ok(())
            }
        }
    }
}

// ============================================================================
// Node
// ============================================================================

/// Either kind of element, as seen by focus resolution and input routing.
#[derive(Debug, Clone)]
pub enum Node {
    Layout(LayoutRef),
    Content(ContentRef),
}

impl Node {
    pub fn id(&self) -> ElementId {
        match self {
            Node::Layout(l) => l.id,
            Node::Content(c) => c.id,
        }
    }

    pub fn is_dirty(&self, reason: UiFlags) -> bool {
        match self {
            Node::Layout(l) => l.is_dirty(reason),
            Node::Content(c) => c.is_dirty(reason),
        }
    }

    pub fn invalidate(&self, flag: UiFlags) {
        match self {
            Node::Layout(l) => l.invalidate(flag),
            Node::Content(c) => c.invalidate(flag),
        }
    }

    pub fn focus_source(&self) -> Option<Node> {
        match self {
            Node::Layout(l) => l.cell.try_borrow().ok().and_then(|e| e.focus_source()),
            Node::Content(c) => c.cell.try_borrow().ok().and_then(|e| e.focus_source()),
        }
    }

    /// Follow focus-source links down to the leaf that owns input.
    pub fn resolve(&self) -> Node {
        match self.focus_source() {
            Some(source) => source.resolve(),
            None => self.clone(),
        }
    }

    /// Reset the element, or queue the reset for the next tick when the
    /// element is mid-dispatch.
    pub fn reset(&self, ui: &mut UiContext) {
        let done = match self {
            Node::Layout(l) => match l.cell.try_borrow_mut() {
                Ok(mut e) => {
                    e.reset(ui);
                    true
                }
                Err(_) => false,
            },
            Node::Content(c) => match c.cell.try_borrow_mut() {
                Ok(mut e) => {
                    e.reset(ui);
                    true
                }
                Err(_) => false,
            },
        };
        if !done {
            ui.defer_reset(self.clone());
        }
    }

    pub fn interact(&self, ui: &mut UiContext, e: Interaction) -> bool {
        match self {
            Node::Layout(l) => l
                .cell
                .try_borrow_mut()
                .is_ok_and(|mut el| el.interact(ui, e)),
            Node::Content(c) => c
                .cell
                .try_borrow_mut()
                .is_ok_and(|mut el| el.interact(ui, e)),
        }
    }
}

impl From<LayoutRef> for Node {
    fn from(layout: LayoutRef) -> Self {
        Node::Layout(layout)
    }
}

impl From<ContentRef> for Node {
    fn from(content: ContentRef) -> Self {
        Node::Content(content)
    }
}
