//! Intents for the resend countdown.

use crate::mvi::Intent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerIntent {
    /// (Re)start the countdown. Replaces any countdown in progress.
    Start { duration_ticks: u32 },

    /// One clock period elapsed.
    Tick,

    /// Stop counting (step left or flow torn down).
    Stop,
}

impl Intent for TimerIntent {}
