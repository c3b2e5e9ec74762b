//! Intents for the code entry model.

use crate::mvi::Intent;

/// Edits a host can dispatch into a [`CodeEntry`](super::CodeEntry).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeEntryIntent {
    /// Write (or clear, with an empty value) a single cell.
    ///
    /// Values longer than one character are truncated to the first one.
    SetCell { index: usize, value: String },

    /// Clear the focused cell, or the previous one when it is already empty.
    Backspace,

    /// Spread pasted text across cells starting at the focused cell.
    Paste { text: String },

    /// Host moved focus to a cell (e.g. the user tapped it).
    Focus { index: usize },

    /// Clear every cell and focus the first one.
    Reset,
}

impl Intent for CodeEntryIntent {}
