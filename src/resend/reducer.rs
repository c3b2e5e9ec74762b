//! Reducer for the resend countdown.

use crate::mvi::Reducer;

use super::intent::TimerIntent;
use super::state::TimerState;

/// Reducer for countdown transitions.
///
/// `Start` with a zero duration is rejected and leaves the state unchanged.
pub struct TimerReducer;

impl Reducer for TimerReducer {
    type State = TimerState;
    type Intent = TimerIntent;

    fn reduce(&self, mut state: Self::State, intent: Self::Intent) -> Self::State {
        match intent {
            TimerIntent::Start { duration_ticks } => {
                if let Err(e) = state.start(duration_ticks) {
                    tracing::warn!(error = %e, "Resend timer start rejected");
                }
            }
            TimerIntent::Tick => {
                state.tick();
            }
            TimerIntent::Stop => state.stop(),
        }
        state
    }
}
