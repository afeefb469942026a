//! Error types shared by every module.
//!
//! Only caller-contract violations and device setup failures surface as
//! errors. Write/move failures on the output device are absorbed by the
//! printer, and a full popup stack is reported as `false`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum UiError {
    #[error("row {row} is outside the display (height {height})")]
    RowOutOfRange { row: u16, height: u16 },

    #[error("popup slot {slot} is outside the stack (capacity {capacity})")]
    SlotOutOfRange { slot: usize, capacity: usize },

    #[error("terminal error: {0}")]
    Terminal(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid glyph configuration: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, UiError>;
