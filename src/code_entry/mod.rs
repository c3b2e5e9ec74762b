//! Segmented single-character-per-cell input model used for numeric codes.
//!
//! Uses MVI (Model-View-Intent) pattern:
//! - `state.rs` - Cells, focus index and accepted character class
//! - `intent.rs` - Cell edits dispatched by the host
//! - `reducer.rs` - State transitions
//!
//! The engine only tracks the focused *index*; hosts translate a focus change
//! into whatever platform call moves the caret between input widgets.

mod intent;
mod reducer;
mod state;

pub use intent::CodeEntryIntent;
pub use reducer::CodeEntryReducer;
pub use state::{CharClass, CodeEntry};
