//! Intents for the step sequencer.

use crate::code_entry::CodeEntryIntent;
use crate::executor::Outcome;
use crate::mvi::Intent;

/// Everything that can move a flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowIntent {
    /// Edit the active code step.
    Code(CodeEntryIntent),

    /// Replace the value of the active identifier step.
    SetText { value: String },

    /// Continue from the active step.
    Advance,

    /// The submit action of `step` resolved.
    SubmissionResolved { step: usize, outcome: Outcome },

    /// Return to the previous step, keeping every entered value.
    Back,

    /// A resend was issued for the active step. Clears its code entry.
    ResendIssued,

    /// The resend action of `step` resolved.
    ResendResolved { step: usize, outcome: Outcome },

    /// Host tore the flow down.
    Cancel,

    /// Host acknowledged the terminal state (e.g. dismissed the success notice).
    Acknowledge,
}

impl Intent for FlowIntent {}
