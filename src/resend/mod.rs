//! Countdown that gates when a user may ask for a new code.
//!
//! Uses MVI (Model-View-Intent) pattern:
//! - `state.rs` - Remaining ticks and running flag
//! - `intent.rs` - Start / tick / stop events
//! - `reducer.rs` - State transitions
//! - `clock.rs` - Injected tick source (real-time or manual)

mod clock;
mod intent;
mod reducer;
mod state;

pub use clock::{Clock, ManualClock, Ticker, TokioClock};
pub use intent::TimerIntent;
pub use reducer::TimerReducer;
pub use state::TimerState;
