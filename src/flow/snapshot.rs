//! Read-only projection hosts render from.

use serde::Serialize;

use crate::error::ErrorKind;
use crate::resend::TimerState;

use super::definition::FlowDefinition;
use super::state::{FlowPhase, FlowState, StepValue};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepView {
    pub index: usize,
    pub name: String,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cells: Option<Vec<String>>,
    pub focused_index: Option<usize>,
    pub can_continue: bool,
    pub can_go_back: bool,
    pub attempts: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResendView {
    pub remaining_ticks: u32,
    pub eligible: bool,
}

/// Everything a screen needs to draw the active step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlowSnapshot {
    pub flow: String,
    pub phase: FlowPhase,
    pub step: Option<StepView>,
    pub last_error: Option<ErrorKind>,
    pub resend: Option<ResendView>,
}

impl FlowSnapshot {
    pub fn capture(definition: &FlowDefinition, state: &FlowState, timer: &TimerState) -> Self {
        let live = state.is_live();
        let index = state.current_step_index();
        let spec = definition.step(index).filter(|_| live);

        let step = spec.map(|spec| {
            let value = state.value(spec.name());
            let (text, cells, focused_index) = match value {
                Some(StepValue::Text(text)) => (Some(text.clone()), None, None),
                Some(StepValue::Code(entry)) => (
                    None,
                    Some(
                        entry
                            .cells()
                            .iter()
                            .copied()
                            .map(|c| c.map(String::from).unwrap_or_default())
                            .collect(),
                    ),
                    entry.focused_index(),
                ),
                _ => (None, None, None),
            };

            StepView {
                index,
                name: spec.name().to_string(),
                kind: spec.kind().label(),
                text,
                cells,
                focused_index,
                can_continue: !state.is_submitting() && spec.can_continue(state),
                can_go_back: !state.is_submitting() && index > 0,
                attempts: state.attempts(spec.name()),
            }
        });

        let resend = spec
            .and_then(|spec| spec.resend_policy())
            .map(|_| ResendView {
                remaining_ticks: timer.remaining_ticks(),
                eligible: timer.is_eligible() && !state.is_submitting(),
            });

        Self {
            flow: definition.name().to_string(),
            phase: state.phase(),
            step,
            last_error: state.last_error().cloned(),
            resend,
        }
    }
}
