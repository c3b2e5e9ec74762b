//! Mutable state of a running flow.

use std::collections::HashMap;

use serde::Serialize;

use crate::code_entry::CodeEntry;
use crate::error::ErrorKind;
use crate::mvi::UiState;

use super::definition::FlowDefinition;

/// Current value of one step.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StepValue {
    Text(String),
    Code(CodeEntry),
    #[default]
    Empty,
}

impl StepValue {
    /// Text view of the value: the text itself or the entered code.
    pub fn as_text(&self) -> String {
        match self {
            StepValue::Text(text) => text.clone(),
            StepValue::Code(entry) => entry.code(),
            StepValue::Empty => String::new(),
        }
    }

    pub fn as_code(&self) -> Option<&CodeEntry> {
        match self {
            StepValue::Code(entry) => Some(entry),
            _ => None,
        }
    }

    fn clear(&mut self) {
        match self {
            StepValue::Text(text) => text.clear(),
            StepValue::Code(entry) => entry.reset(),
            StepValue::Empty => {}
        }
    }
}

/// Terminal outcome of a flow.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Terminal {
    #[default]
    InProgress,
    Success,
    Failure(ErrorKind),
}

/// Projection of a flow state onto the sequencer's states.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", content = "detail", rename_all = "snake_case")]
pub enum FlowPhase {
    AtStep(usize),
    Submitting(usize),
    Success,
    Failure(ErrorKind),
    /// Cancelled, or terminal and acknowledged. Accepts no further intents.
    Discarded,
}

impl FlowPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, FlowPhase::Success | FlowPhase::Failure(_))
    }
}

/// Mutable flow state, owned exclusively by the sequencer.
///
/// `current_step < definition.len()` while the flow is in progress. Once a
/// terminal state is reached, only acknowledge or cancel are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FlowState {
    pub(crate) current_step: usize,
    pub(crate) values: HashMap<String, StepValue>,
    pub(crate) attempts: HashMap<String, u32>,
    pub(crate) submitting: bool,
    pub(crate) last_error: Option<ErrorKind>,
    pub(crate) terminal: Terminal,
    pub(crate) discarded: bool,
}

impl UiState for FlowState {}

impl FlowState {
    /// Fresh state at step 0 with an empty value for every step.
    pub fn new(definition: &FlowDefinition) -> Self {
        let values = definition
            .steps()
            .iter()
            .map(|step| (step.name().to_string(), step.empty_value()))
            .collect();

        Self {
            values,
            ..Self::default()
        }
    }

    pub fn current_step_index(&self) -> usize {
        self.current_step
    }

    pub fn value(&self, step: &str) -> Option<&StepValue> {
        self.values.get(step)
    }

    /// Text view of a step's value; empty for unknown steps.
    pub fn text(&self, step: &str) -> String {
        self.values
            .get(step)
            .map(StepValue::as_text)
            .unwrap_or_default()
    }

    pub fn code_entry(&self, step: &str) -> Option<&CodeEntry> {
        self.values.get(step).and_then(StepValue::as_code)
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn last_error(&self) -> Option<&ErrorKind> {
        self.last_error.as_ref()
    }

    pub fn terminal(&self) -> &Terminal {
        &self.terminal
    }

    pub fn is_discarded(&self) -> bool {
        self.discarded
    }

    /// Rejected submissions recorded for a step.
    pub fn attempts(&self, step: &str) -> u32 {
        self.attempts.get(step).copied().unwrap_or(0)
    }

    /// In progress and not discarded.
    pub fn is_live(&self) -> bool {
        !self.discarded && self.terminal == Terminal::InProgress
    }

    pub fn phase(&self) -> FlowPhase {
        if self.discarded {
            return FlowPhase::Discarded;
        }
        match &self.terminal {
            Terminal::Success => FlowPhase::Success,
            Terminal::Failure(kind) => FlowPhase::Failure(kind.clone()),
            Terminal::InProgress if self.submitting => FlowPhase::Submitting(self.current_step),
            Terminal::InProgress => FlowPhase::AtStep(self.current_step),
        }
    }

    pub(crate) fn code_entry_mut(&mut self, step: &str) -> Option<&mut CodeEntry> {
        match self.values.get_mut(step) {
            Some(StepValue::Code(entry)) => Some(entry),
            _ => None,
        }
    }

    pub(crate) fn set_text(&mut self, step: &str, value: &str) {
        self.values
            .insert(step.to_string(), StepValue::Text(value.to_string()));
    }

    pub(crate) fn clear_value(&mut self, step: &str) {
        if let Some(value) = self.values.get_mut(step) {
            value.clear();
        }
    }
}
