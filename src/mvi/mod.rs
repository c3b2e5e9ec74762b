//! Model-View-Intent (MVI) primitives shared by every state machine in the engine.
//!
//! # Architecture
//!
//! ```text
//! Intent ──→ Reducer ──→ State ──→ Host projection
//!    ↑                                  │
//!    └──────────────────────────────────┘
//! ```
//!
//! - **State**: plain data describing a code entry, a resend countdown or a flow
//! - **Intent**: host input (cell edits, continue/back taps) or system events (ticks, outcomes)
//! - **Reducer**: pure transition function; side effects happen around the dispatch call

mod intent;
mod reducer;
mod state;

pub use intent::Intent;
pub use reducer::Reducer;
pub use state::UiState;
