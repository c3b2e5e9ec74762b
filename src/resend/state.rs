//! State for the resend countdown.

use crate::error::EngineError;
use crate::mvi::UiState;

/// Countdown state.
///
/// `running` is true exactly while `remaining_ticks > 0`; only an explicit
/// start sets it, resetting `remaining_ticks` to the requested duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimerState {
    remaining_ticks: u32,
    duration_ticks: u32,
    running: bool,
}

impl UiState for TimerState {}

impl TimerState {
    pub fn remaining_ticks(&self) -> u32 {
        self.remaining_ticks
    }

    /// Duration of the most recent start (0 if never started).
    pub fn duration_ticks(&self) -> u32 {
        self.duration_ticks
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Resend is allowed once the countdown is no longer running.
    pub fn is_eligible(&self) -> bool {
        !self.running
    }

    /// Starts (or restarts) the countdown. Restarting replaces the previous
    /// countdown; countdowns never stack.
    pub fn start(&mut self, duration_ticks: u32) -> Result<(), EngineError> {
        if duration_ticks == 0 {
            return Err(EngineError::TimerMisuse);
        }
        self.remaining_ticks = duration_ticks;
        self.duration_ticks = duration_ticks;
        self.running = true;
        Ok(())
    }

    /// Counts one tick down. No-op while not running.
    ///
    /// Returns true when this tick expired the countdown.
    pub fn tick(&mut self) -> bool {
        if !self.running {
            return false;
        }
        self.remaining_ticks = self.remaining_ticks.saturating_sub(1);
        if self.remaining_ticks == 0 {
            self.running = false;
            return true;
        }
        false
    }

    pub fn stop(&mut self) {
        self.remaining_ticks = 0;
        self.running = false;
    }
}
