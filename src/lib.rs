//! Crystalline — Invalidation-driven UI runtime for character displays
//!
//! Screens are trees of elements. Layouts own a band of rows, contents own
//! a single row. Each tick the coordinator (`UiContext`) resolves focus,
//! updates the current view, and redraws only what was invalidated through
//! a cursor-tracking printer, so an idle tick costs no device I/O.
//!
//! The backend is a trait object: `CrosstermBackend` drives a real terminal,
//! `HeadlessBackend` discards output for benchmarks and CI.

pub mod context;
pub mod controls;
pub mod error;
pub mod event;
pub mod glyphs;
pub mod panels;
pub mod popups;
pub mod property;
pub mod render;
pub mod scroll;
pub mod terminal;
pub mod tree;
pub mod types;

mod text_utils;

pub use context::UiContext;
pub use controls::{
    ButtonControl, DataControl, DataKind, DecimalControl, DecimalStepper, IntegerControl,
    IntegerStepper, LabelControl, Switch, SwitchControl, Toggle, ToggleControl,
};
pub use error::{Result, UiError};
pub use event::{Interaction, Key, KeyState};
pub use glyphs::Glyphs;
pub use panels::{ControlPanel, MenuLayout, NavigationPanel};
pub use popups::{Popup, PopupKind, PopupRef, PopupStack, POPUP_CAPACITY};
pub use property::{Action, Property};
pub use render::{DrawContext, Printer};
pub use terminal::{CrosstermBackend, HeadlessBackend, TerminalBackend};
pub use tree::{shared, Content, ContentRef, Element, ElementId, Layout, LayoutRef, Node};
pub use types::{Alignment, CursorState, FocusState, FocusToken, Range, Timer, UiFlags};
