//! Reducer trait for the engine's state machines.

use super::intent::Intent;
use super::state::UiState;

/// Reducer transforms state based on intents.
///
/// The reducer is the only place where state transitions happen. It must not
/// perform I/O: `(State, Intent) -> State`. Reducers that need immutable
/// configuration (such as a flow definition) carry it in `self`.
pub trait Reducer {
    /// The state type this reducer operates on.
    type State: UiState;

    /// The intent type this reducer handles.
    type Intent: Intent;

    /// Process an intent and return the new state.
    ///
    /// Invalid intents leave the state unchanged.
    fn reduce(&self, state: Self::State, intent: Self::Intent) -> Self::State;
}
