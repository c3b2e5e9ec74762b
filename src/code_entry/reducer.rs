//! Reducer for the code entry model.

use crate::mvi::Reducer;

use super::intent::CodeEntryIntent;
use super::state::CodeEntry;

/// Reducer for code entry transitions.
///
/// Invalid edits (out-of-range index, character outside the class) leave the
/// entry untouched.
pub struct CodeEntryReducer;

impl Reducer for CodeEntryReducer {
    type State = CodeEntry;
    type Intent = CodeEntryIntent;

    fn reduce(&self, mut state: Self::State, intent: Self::Intent) -> Self::State {
        let result = match intent {
            CodeEntryIntent::SetCell { index, value } => state.set_cell(index, &value),
            CodeEntryIntent::Backspace => {
                state.backspace();
                Ok(())
            }
            CodeEntryIntent::Paste { text } => state.paste(&text),
            CodeEntryIntent::Focus { index } => state.focus(index),
            CodeEntryIntent::Reset => {
                state.reset();
                Ok(())
            }
        };

        if let Err(e) = result {
            tracing::trace!(error = %e, "Code entry edit ignored");
        }
        state
    }
}
