//! Glyph Module — Character table used by every renderer.
//!
//! Responsibilities:
//! - Built-in defaults for a plain ASCII character display
//! - Partial overrides loaded from JSON (missing keys keep their default)
//! - Pointer glyph lookup per cursor state

use serde::Deserialize;

use crate::error::Result;
use crate::types::CursorState;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Glyphs {
    pub default_padding: char,
    pub default_on: String,
    pub default_off: String,
    pub password_char: char,
    pub pointer_over_left: char,
    pub pointer_over_right: char,
    pub pointer_disabled_left: char,
    pub pointer_disabled_right: char,
    pub pointer_down_left: char,
    pub pointer_down_right: char,
    pub line_padding: char,
    pub loading_bar: char,
    pub border_corner: char,
    pub border_edge: char,
    pub lock_placeholder: char,
}

impl Default for Glyphs {
    fn default() -> Self {
        Self {
            default_padding: ' ',
            default_on: "On".to_string(),
            default_off: "Off".to_string(),
            password_char: '*',
            pointer_over_left: '<',
            pointer_over_right: '>',
            pointer_disabled_left: '-',
            pointer_disabled_right: '-',
            pointer_down_left: '=',
            pointer_down_right: '=',
            line_padding: '.',
            loading_bar: '#',
            border_corner: 'o',
            border_edge: '=',
            lock_placeholder: '-',
        }
    }
}

impl Glyphs {
    /// Parse a (possibly partial) glyph table.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn pointer(&self, state: CursorState) -> char {
        match state {
            CursorState::PointerOver => self.pointer_over_right,
            CursorState::PointerDisabled => self.pointer_disabled_right,
            CursorState::PointerDown => self.pointer_down_right,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let g = Glyphs::default();
        assert_eq!(g.pointer(CursorState::PointerOver), '>');
        assert_eq!(g.pointer(CursorState::PointerDisabled), '-');
        assert_eq!(g.pointer(CursorState::PointerDown), '=');
        assert_eq!(g.default_on, "On");
    }

    #[test]
    fn test_partial_override_keeps_defaults() {
        let g = Glyphs::from_json(r#"{ "pointer_over_right": "*", "default_on": "Yes" }"#)
            .unwrap();
        assert_eq!(g.pointer(CursorState::PointerOver), '*');
        assert_eq!(g.default_on, "Yes");
        assert_eq!(g.default_off, "Off");
        assert_eq!(g.line_padding, '.');
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        let err = Glyphs::from_json("{ not json").unwrap_err();
        assert!(err.to_string().starts_with("invalid glyph configuration"));
    }
}
