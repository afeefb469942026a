//! Controls Module — Interactive single-line leaves.
//!
//! Responsibilities:
//! - Pointer prefix for the focused control, skipped unless it changed
//! - Disabled pointer for a focused control that cannot interact
//! - Engage/release machine for data controls, press/click for buttons
//! - Value rendering for steppers, switches, and toggles

use crate::context::UiContext;
use crate::event::{Interaction, Key, KeyState};
use crate::property::{Action, Property};
use crate::render::DrawContext;
use crate::text_utils::display_width;
use crate::tree::{Content, Element, ElementState, Interactable};
use crate::types::{assign, Alignment, CursorState, FocusState, FocusToken, UiFlags};

// ============================================================================
// Shared control behavior
// ============================================================================

fn validate_cursor<C: Element + Interactable + ?Sized>(control: &mut C, ui: &mut UiContext) {
    if control.is_interactable() {
        return;
    }
    if let Some(token) = ui.request_token(control.id()) {
        if assign(&mut token.cursor, CursorState::PointerDisabled) {
            control.invalidate(UiFlags::CURSOR_CHANGED);
        }
    }
}

/// Two-column pointer in front of a focused control.
fn draw_pointer(out: &mut dyn DrawContext, token: Option<&FocusToken>, flags: UiFlags) {
    let Some(token) = token else {
        return;
    };
    let changed = flags.matches(UiFlags::CURSOR_CHANGED | UiFlags::FOCUS_CHANGED);
    if !out.omit(2, !changed) {
        let glyph = out.glyphs().pointer(token.cursor);
        out.write_char(glyph);
        out.write_char(' ');
    }
}

fn set_cursor<C: Element + ?Sized>(control: &mut C, ui: &mut UiContext, cursor: CursorState) {
    if let Some(token) = ui.request_token(control.id()) {
        if assign(&mut token.cursor, cursor) {
            control.invalidate(UiFlags::CURSOR_CHANGED);
        }
    }
}

fn set_state<C: Element + ?Sized>(control: &mut C, ui: &mut UiContext, state: FocusState) {
    if let Some(token) = ui.request_token(control.id()) {
        if assign(&mut token.state, state) {
            control.invalidate(UiFlags::STATE_CHANGED);
        }
    }
}

/// Enter engages a focused control; Enter or Escape releases it. Non-down
/// edges are swallowed while the control can interact.
fn engage<C: Element + Interactable + ?Sized>(
    control: &mut C,
    ui: &mut UiContext,
    e: Interaction,
) -> bool {
    if !control.is_interactable() {
        return false;
    }
    if e.state != KeyState::Down {
        return true;
    }
    let Some(state) = ui.request_token(control.id()).map(|t| t.state) else {
        return false;
    };
    match state {
        FocusState::Normal if e.key == Key::Enter => {
            set_state(control, ui, FocusState::Engaged);
            set_cursor(control, ui, CursorState::PointerDown);
            true
        }
        FocusState::Engaged if matches!(e.key, Key::Enter | Key::Escape) => {
            set_state(control, ui, FocusState::Normal);
            set_cursor(control, ui, CursorState::PointerOver);
            true
        }
        _ => false,
    }
}

// ============================================================================
// ButtonControl
// ============================================================================

pub struct ButtonControl {
    state: ElementState,
    pub text: String,
    pub handler: Option<Action>,
    pub enabled: bool,
}

impl ButtonControl {
    pub fn new(text: impl Into<String>, handler: impl FnMut(&mut UiContext) + 'static) -> Self {
        Self {
            state: ElementState::new(),
            text: text.into(),
            handler: Some(Box::new(handler)),
            enabled: true,
        }
    }

    /// A button with nothing to do. It can hold focus but never presses.
    pub fn inert(text: impl Into<String>) -> Self {
        Self {
            state: ElementState::new(),
            text: text.into(),
            handler: None,
            enabled: true,
        }
    }

    fn click(&mut self, ui: &mut UiContext) {
        tracing::debug!(button = %self.id(), "click");
        if let Some(handler) = self.handler.as_mut() {
            handler(ui);
        }
    }
}

impl Interactable for ButtonControl {
    fn is_interactable(&self) -> bool {
        self.enabled && self.handler.is_some()
    }
}

impl Element for ButtonControl {
    fn state(&self) -> &ElementState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ElementState {
        &mut self.state
    }

    fn on_validate(&mut self, ui: &mut UiContext) {
        validate_cursor(self, ui);
    }

    /// Press on the down edge, click on the up edge.
    fn on_interact(&mut self, ui: &mut UiContext, e: Interaction) -> bool {
        let Some(state) = ui.request_token(self.id()).map(|t| t.state) else {
            return false;
        };
        match state {
            FocusState::Normal if self.is_interactable() && e.is(Key::Enter, KeyState::Down) => {
                set_state(self, ui, FocusState::Pressed);
                true
            }
            FocusState::Pressed if e.is(Key::Enter, KeyState::Up) => {
                self.click(ui);
                set_state(self, ui, FocusState::Normal);
                true
            }
            _ => false,
        }
    }
}

impl Content for ButtonControl {
    fn on_draw(&mut self, out: &mut dyn DrawContext, token: Option<&mut FocusToken>) {
        let token = token.as_deref();
        let pressed = token.is_some_and(|t| t.state == FocusState::Pressed);
        draw_pointer(out, token, self.flags());
        out.write_char(if pressed { '(' } else { '[' });
        out.write_str(&self.text);
        out.write_char(if pressed { ')' } else { ']' });
        out.fill();
    }
}

// ============================================================================
// LabelControl
// ============================================================================

pub struct LabelControl {
    state: ElementState,
    pub text: String,
}

impl LabelControl {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            state: ElementState::new(),
            text: text.into(),
        }
    }
}

impl Interactable for LabelControl {
    fn is_interactable(&self) -> bool {
        false
    }
}

impl Element for LabelControl {
    fn state(&self) -> &ElementState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ElementState {
        &mut self.state
    }

    fn on_validate(&mut self, ui: &mut UiContext) {
        validate_cursor(self, ui);
    }
}

impl Content for LabelControl {
    fn on_draw(&mut self, out: &mut dyn DrawContext, token: Option<&mut FocusToken>) {
        draw_pointer(out, token.as_deref(), self.flags());
        out.write_str(&self.text);
        out.fill();
    }
}

// ============================================================================
// DataControl
// ============================================================================

/// How a data control renders and steps its value.
pub trait DataKind {
    type Value: Clone + PartialEq + 'static;

    /// Render `value` into the rest of the line. `flags` are the control's
    /// dirty flags for this pass.
    fn draw_value(&self, out: &mut dyn DrawContext, value: &Self::Value, flags: UiFlags);

    /// The value after one step of `sign` (+1 or -1), or `None` when this
    /// key edge does not step.
    fn step(&self, value: &Self::Value, sign: i32, state: KeyState) -> Option<Self::Value>;
}

/// A header followed by an externally stored value.
pub struct DataControl<K: DataKind> {
    state: ElementState,
    pub header: String,
    pub enabled: bool,
    pub kind: K,
    property: Property<K::Value>,
    last: Option<K::Value>,
}

pub type IntegerControl = DataControl<IntegerStepper>;
pub type DecimalControl = DataControl<DecimalStepper>;
pub type SwitchControl = DataControl<Switch>;
pub type ToggleControl = DataControl<Toggle>;

impl<K: DataKind> DataControl<K> {
    pub fn new(header: impl Into<String>, property: Property<K::Value>, kind: K) -> Self {
        Self {
            state: ElementState::new(),
            header: header.into(),
            enabled: true,
            kind,
            property,
            last: None,
        }
    }

    pub fn value(&self) -> K::Value {
        self.property.get()
    }

    fn manipulate(&mut self, sign: i32, state: KeyState) {
        let current = self.property.get();
        if let Some(next) = self.kind.step(&current, sign, state) {
            self.property.set(next);
        }
    }
}

impl<K: DataKind> Interactable for DataControl<K> {
    fn is_interactable(&self) -> bool {
        self.enabled && !self.property.is_readonly()
    }
}

impl<K: DataKind> Element for DataControl<K> {
    fn state(&self) -> &ElementState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ElementState {
        &mut self.state
    }

    fn on_update(&mut self, _ui: &mut UiContext) {
        let value = Some(self.property.get());
        if assign(&mut self.last, value) {
            self.invalidate(UiFlags::PROPERTY_CHANGED);
        }
    }

    fn on_validate(&mut self, ui: &mut UiContext) {
        validate_cursor(self, ui);
    }

    fn on_interact(&mut self, ui: &mut UiContext, e: Interaction) -> bool {
        let engaged = self.is_interactable()
            && ui
                .request_token(self.id())
                .is_some_and(|t| t.state == FocusState::Engaged);
        if engaged {
            match e.key {
                Key::Left | Key::Down => {
                    self.manipulate(-1, e.state);
                    return true;
                }
                Key::Right | Key::Up => {
                    self.manipulate(1, e.state);
                    return true;
                }
                _ => {}
            }
        }
        engage(self, ui, e)
    }
}

impl<K: DataKind> Content for DataControl<K> {
    fn on_draw(&mut self, out: &mut dyn DrawContext, token: Option<&mut FocusToken>) {
        let flags = self.flags();
        draw_pointer(out, token.as_deref(), flags);
        let width = display_width(&self.header) as u16;
        if !out.omit(width, !flags.matches(UiFlags::FOCUS_CHANGED)) {
            out.write_str(&self.header);
        }
        let value = match &self.last {
            Some(v) => v.clone(),
            None => self.property.get(),
        };
        self.kind.draw_value(out, &value, flags);
    }
}

/// Right-align `text` in the space left after a trailing `suffix`, then
/// write the suffix on a full redraw only.
fn draw_number(out: &mut dyn DrawContext, text: &str, suffix: &str, flags: UiFlags) {
    let spacing = match display_width(suffix) as u16 {
        0 => 0,
        n => n + 1,
    };
    if flags.matches(UiFlags::PROPERTY_CHANGED | UiFlags::FOCUS_CHANGED) {
        let total = out.remaining().saturating_sub(spacing);
        let pad = out.glyphs().line_padding;
        out.write_aligned(text, Alignment::Back, total, pad);
    }
    if flags.matches(UiFlags::GLOBAL_DRAW) && spacing > 0 {
        out.write_char(' ');
        out.write_str(suffix);
    }
}

#[derive(Debug, Clone, Default)]
pub struct IntegerStepper {
    pub suffix: String,
}

impl DataKind for IntegerStepper {
    type Value = i32;

    fn draw_value(&self, out: &mut dyn DrawContext, value: &i32, flags: UiFlags) {
        draw_number(out, &value.to_string(), &self.suffix, flags);
    }

    fn step(&self, value: &i32, sign: i32, state: KeyState) -> Option<i32> {
        match state {
            KeyState::Down | KeyState::Pressed => Some(value.saturating_add(sign)),
            KeyState::Up => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DecimalStepper {
    pub suffix: String,
}

impl DataKind for DecimalStepper {
    type Value = f32;

    fn draw_value(&self, out: &mut dyn DrawContext, value: &f32, flags: UiFlags) {
        let mut text = format!("{value:.1}");
        if text == "-0.0" {
            text = "0.0".to_string();
        }
        draw_number(out, &text, &self.suffix, flags);
    }

    fn step(&self, value: &f32, sign: i32, state: KeyState) -> Option<f32> {
        match state {
            KeyState::Down | KeyState::Pressed => Some(value + sign as f32 * 0.1),
            KeyState::Up => None,
        }
    }
}

/// An index into a list of labels.
#[derive(Debug, Clone, Default)]
pub struct Switch {
    pub options: Vec<String>,
}

impl Switch {
    pub fn new<S: Into<String>>(options: impl IntoIterator<Item = S>) -> Self {
        Self {
            options: options.into_iter().map(Into::into).collect(),
        }
    }
}

impl DataKind for Switch {
    type Value = i32;

    fn draw_value(&self, out: &mut dyn DrawContext, value: &i32, flags: UiFlags) {
        if !flags.matches(UiFlags::PROPERTY_CHANGED | UiFlags::FOCUS_CHANGED) {
            return;
        }
        let label = usize::try_from(*value)
            .ok()
            .and_then(|i| self.options.get(i))
            .cloned()
            .unwrap_or_else(|| value.to_string());
        let pad = out.glyphs().line_padding;
        out.fill_text_with(&label, Alignment::Back, pad);
    }

    fn step(&self, value: &i32, sign: i32, state: KeyState) -> Option<i32> {
        if state != KeyState::Down {
            return None;
        }
        let last = self.options.len() as i32 - 1;
        Some(value.saturating_add(sign).min(last).max(0))
    }
}

/// On/off. Labels fall back to the glyph table.
#[derive(Debug, Clone, Default)]
pub struct Toggle {
    pub on: Option<String>,
    pub off: Option<String>,
}

impl DataKind for Toggle {
    type Value = bool;

    fn draw_value(&self, out: &mut dyn DrawContext, value: &bool, flags: UiFlags) {
        if !flags.matches(UiFlags::PROPERTY_CHANGED | UiFlags::FOCUS_CHANGED) {
            return;
        }
        let label = match (value, &self.on, &self.off) {
            (true, Some(on), _) => on.clone(),
            (true, None, _) => out.glyphs().default_on.clone(),
            (false, _, Some(off)) => off.clone(),
            (false, _, None) => out.glyphs().default_off.clone(),
        };
        let pad = out.glyphs().line_padding;
        out.fill_text_with(&label, Alignment::Back, pad);
    }

    fn step(&self, value: &bool, _sign: i32, state: KeyState) -> Option<bool> {
        (state == KeyState::Down).then_some(!value)
    }
}
