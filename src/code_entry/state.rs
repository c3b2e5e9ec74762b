//! State for the code entry model.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::mvi::UiState;

/// Characters a code cell accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CharClass {
    /// ASCII digits only.
    #[default]
    Digits,
    /// ASCII letters and digits.
    Alphanumeric,
    /// Any non-whitespace character.
    Any,
}

impl CharClass {
    pub fn accepts(self, c: char) -> bool {
        match self {
            CharClass::Digits => c.is_ascii_digit(),
            CharClass::Alphanumeric => c.is_ascii_alphanumeric(),
            CharClass::Any => !c.is_whitespace(),
        }
    }
}

/// Fixed-length sequence of single-character cells with a focus index.
///
/// `cells.len()` never changes after construction. `focused` is either a
/// valid index or `None`, meaning every cell is filled and focus has moved
/// past the end.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CodeEntry {
    cells: Vec<Option<char>>,
    focused: Option<usize>,
    class: CharClass,
}

impl UiState for CodeEntry {}

impl CodeEntry {
    pub fn new(cell_count: usize, class: CharClass) -> Self {
        Self {
            cells: vec![None; cell_count],
            focused: if cell_count > 0 { Some(0) } else { None },
            class,
        }
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn cells(&self) -> &[Option<char>] {
        &self.cells
    }

    pub fn cell(&self, index: usize) -> Option<char> {
        self.cells.get(index).copied().flatten()
    }

    pub fn focused_index(&self) -> Option<usize> {
        self.focused
    }

    pub fn char_class(&self) -> CharClass {
        self.class
    }

    /// True iff every cell holds exactly one character.
    pub fn is_complete(&self) -> bool {
        self.cells.iter().all(Option::is_some)
    }

    pub fn filled_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    /// Concatenation of the filled cells, in order.
    pub fn code(&self) -> String {
        self.cells.iter().flatten().collect()
    }

    /// Checks a prospective cell write without applying it.
    ///
    /// Returns the character that would be stored (`None` for a clear).
    /// Only the first character of `value` is considered.
    pub fn validate_cell(&self, index: usize, value: &str) -> Result<Option<char>, EngineError> {
        if index >= self.cells.len() {
            return Err(EngineError::invalid(format!(
                "cell index {} out of range 0..{}",
                index,
                self.cells.len()
            )));
        }

        match value.chars().next() {
            None => Ok(None),
            Some(c) if self.class.accepts(c) => Ok(Some(c)),
            Some(c) => Err(EngineError::invalid(format!(
                "character {:?} not accepted by {:?} cells",
                c, self.class
            ))),
        }
    }

    /// Writes or clears one cell and moves focus accordingly.
    ///
    /// A write moves focus to the next cell; writing the last cell moves focus
    /// past the end once the entry is complete. A clear moves focus back one
    /// cell (staying on the first).
    pub fn set_cell(&mut self, index: usize, value: &str) -> Result<(), EngineError> {
        let ch = self.validate_cell(index, value)?;
        self.cells[index] = ch;

        self.focused = match ch {
            Some(_) if index + 1 < self.cells.len() => Some(index + 1),
            Some(_) if self.is_complete() => None,
            Some(_) => Some(index),
            None => Some(index.saturating_sub(1)),
        };
        Ok(())
    }

    /// Clears the focused cell; when it is already empty, jumps to the
    /// previous cell and clears that one instead.
    pub fn backspace(&mut self) {
        let len = self.cells.len();
        if len == 0 {
            return;
        }

        let target = self.focused.unwrap_or(len - 1);
        if self.cells[target].is_some() {
            self.cells[target] = None;
            self.focused = Some(target);
        } else if target > 0 {
            self.cells[target - 1] = None;
            self.focused = Some(target - 1);
        }
    }

    /// Writes the accepted characters of `text` into consecutive cells,
    /// starting at the focused cell (or the first cell when focus is past the end).
    ///
    /// Characters outside the class are skipped; text with no accepted
    /// characters is rejected. Overflow beyond the last cell is dropped.
    pub fn paste(&mut self, text: &str) -> Result<(), EngineError> {
        let len = self.cells.len();
        let start = self.focused.unwrap_or(0);
        let accepted: Vec<char> = text.chars().filter(|c| self.class.accepts(*c)).collect();
        if accepted.is_empty() || start >= len {
            return Err(EngineError::invalid("pasted text has no usable characters"));
        }

        let mut last = start;
        for (index, c) in (start..len).zip(accepted) {
            self.cells[index] = Some(c);
            last = index;
        }

        self.focused = if last + 1 < len {
            Some(last + 1)
        } else if self.is_complete() {
            None
        } else {
            Some(len - 1)
        };
        Ok(())
    }

    pub fn focus(&mut self, index: usize) -> Result<(), EngineError> {
        if index >= self.cells.len() {
            return Err(EngineError::invalid(format!(
                "cell index {} out of range 0..{}",
                index,
                self.cells.len()
            )));
        }
        self.focused = Some(index);
        Ok(())
    }

    /// Clears every cell and focuses the first one.
    pub fn reset(&mut self) {
        self.cells.iter_mut().for_each(|c| *c = None);
        self.focused = if self.cells.is_empty() { None } else { Some(0) };
    }
}
