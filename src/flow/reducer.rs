//! Reducer for the step sequencer.

use crate::code_entry::{CodeEntryIntent, CodeEntryReducer};
use crate::error::{EngineError, ErrorKind};
use crate::executor::Outcome;
use crate::mvi::Reducer;

use super::definition::{FlowDefinition, StepKind, StepSpec};
use super::intent::FlowIntent;
use super::state::{FlowState, StepValue, Terminal};

/// Reducer for flow transitions, bound to one definition.
///
/// Pure: submit actions are invoked by the caller once the state reports
/// `submitting`, and their outcomes come back as `SubmissionResolved`.
pub struct FlowReducer<'a> {
    definition: &'a FlowDefinition,
}

impl<'a> FlowReducer<'a> {
    pub fn new(definition: &'a FlowDefinition) -> Self {
        Self { definition }
    }

    fn active_step(&self, state: &FlowState) -> Result<&'a StepSpec, EngineError> {
        self.definition
            .step(state.current_step)
            .ok_or(EngineError::FlowClosed)
    }

    /// Checks whether `intent` is acceptable in `state` without applying it.
    pub fn validate(&self, state: &FlowState, intent: &FlowIntent) -> Result<(), EngineError> {
        match intent {
            FlowIntent::Cancel => {
                return if state.discarded {
                    Err(EngineError::FlowClosed)
                } else {
                    Ok(())
                };
            }
            FlowIntent::Acknowledge => {
                return match (&state.terminal, state.discarded) {
                    (_, true) => Err(EngineError::FlowClosed),
                    (Terminal::InProgress, false) => {
                        Err(EngineError::invalid("flow has not finished"))
                    }
                    _ => Ok(()),
                };
            }
            _ if !state.is_live() => return Err(EngineError::FlowClosed),
            _ => {}
        }

        let step = self.active_step(state)?;
        match intent {
            FlowIntent::Code(edit) => {
                if state.submitting {
                    return Err(EngineError::SubmissionInFlight);
                }
                let entry = state.code_entry(step.name()).ok_or_else(|| {
                    EngineError::WrongStepKind {
                        step: step.name().to_string(),
                        operation: "code edits",
                    }
                })?;
                let mut probe = entry.clone();
                match edit {
                    CodeEntryIntent::SetCell { index, value } => probe.set_cell(*index, value),
                    CodeEntryIntent::Paste { text } => probe.paste(text),
                    CodeEntryIntent::Focus { index } => probe.focus(*index),
                    CodeEntryIntent::Backspace | CodeEntryIntent::Reset => Ok(()),
                }
            }
            FlowIntent::SetText { .. } => {
                if state.submitting {
                    return Err(EngineError::SubmissionInFlight);
                }
                if step.kind() != StepKind::IdentifierInput {
                    return Err(EngineError::WrongStepKind {
                        step: step.name().to_string(),
                        operation: "text edits",
                    });
                }
                Ok(())
            }
            FlowIntent::Advance => {
                if state.submitting {
                    return Err(EngineError::SubmissionInFlight);
                }
                if !step.can_continue(state) {
                    return Err(EngineError::GuardRejected {
                        step: step.name().to_string(),
                    });
                }
                Ok(())
            }
            FlowIntent::SubmissionResolved { step: index, .. } => {
                if !state.submitting || *index != state.current_step {
                    return Err(EngineError::invalid("stale submission outcome"));
                }
                Ok(())
            }
            FlowIntent::Back => {
                if state.submitting {
                    return Err(EngineError::SubmissionInFlight);
                }
                if state.current_step == 0 {
                    return Err(EngineError::NoPreviousStep);
                }
                Ok(())
            }
            FlowIntent::ResendIssued => {
                if state.submitting {
                    return Err(EngineError::SubmissionInFlight);
                }
                if step.resend_policy().is_none() {
                    return Err(EngineError::ResendUnavailable {
                        step: step.name().to_string(),
                    });
                }
                Ok(())
            }
            FlowIntent::ResendResolved { step: index, .. } => {
                if *index != state.current_step {
                    return Err(EngineError::invalid("stale resend outcome"));
                }
                Ok(())
            }
            FlowIntent::Cancel | FlowIntent::Acknowledge => Ok(()),
        }
    }

    fn move_forward(&self, state: &mut FlowState) {
        state.last_error = None;
        if state.current_step + 1 < self.definition.len() {
            state.current_step += 1;
        } else {
            state.terminal = Terminal::Success;
        }
    }

    fn apply_rejection(&self, state: &mut FlowState, step: &StepSpec, reason: String) {
        let attempts = state.attempts.entry(step.name().to_string()).or_insert(0);
        *attempts += 1;
        let attempts = *attempts;

        state.last_error = Some(ErrorKind::SubmissionRejected { reason });
        if step.clears_on_failure() {
            state.clear_value(step.name());
        }
        if matches!(step.attempt_limit(), Some(limit) if attempts >= limit) {
            state.terminal = Terminal::Failure(ErrorKind::AttemptsExhausted {
                step: step.name().to_string(),
            });
        }
    }
}

impl Reducer for FlowReducer<'_> {
    type State = FlowState;
    type Intent = FlowIntent;

    fn reduce(&self, mut state: Self::State, intent: Self::Intent) -> Self::State {
        if let Err(e) = self.validate(&state, &intent) {
            tracing::trace!(error = %e, intent = ?intent, "Flow intent rejected");
            return state;
        }

        match intent {
            FlowIntent::Cancel => {
                state.discarded = true;
                state.submitting = false;
                return state;
            }
            FlowIntent::Acknowledge => {
                state.discarded = true;
                return state;
            }
            _ => {}
        }

        let Ok(step) = self.active_step(&state) else {
            return state;
        };

        match intent {
            FlowIntent::Code(edit) => {
                if let Some(StepValue::Code(entry)) = state.values.get_mut(step.name()) {
                    *entry = CodeEntryReducer.reduce(std::mem::take(entry), edit);
                }
                state.last_error = None;
            }
            FlowIntent::SetText { value } => {
                state.set_text(step.name(), &value);
                state.last_error = None;
            }
            FlowIntent::Advance => {
                if step.submit_action().is_some() {
                    state.submitting = true;
                    state.last_error = None;
                } else {
                    self.move_forward(&mut state);
                }
            }
            FlowIntent::SubmissionResolved { outcome, .. } => {
                state.submitting = false;
                match outcome {
                    Outcome::Accepted => self.move_forward(&mut state),
                    Outcome::Rejected { reason } => self.apply_rejection(&mut state, step, reason),
                }
            }
            FlowIntent::Back => {
                state.current_step -= 1;
                state.last_error = None;
            }
            FlowIntent::ResendIssued => {
                if let Some(entry) = state.code_entry_mut(step.name()) {
                    entry.reset();
                }
                state.last_error = None;
            }
            FlowIntent::ResendResolved { outcome, .. } => {
                if let Outcome::Rejected { reason } = outcome {
                    state.last_error = Some(ErrorKind::SubmissionRejected { reason });
                }
            }
            FlowIntent::Cancel | FlowIntent::Acknowledge => {}
        }
        state
    }
}
