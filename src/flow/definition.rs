//! Immutable description of a verification flow.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::code_entry::{CharClass, CodeEntry};
use crate::error::DefinitionError;
use crate::executor::SubmitAction;
use crate::guard::Guard;

use super::state::{FlowState, StepValue};

/// What a step asks the user for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    /// Free text such as a phone number or an email address.
    IdentifierInput,
    /// Segmented code with one character per cell.
    CodeInput { cell_count: usize, class: CharClass },
    /// No input; the user only confirms ("are you sure", "done").
    Confirmation,
}

impl StepKind {
    pub fn label(&self) -> &'static str {
        match self {
            StepKind::IdentifierInput => "identifier-input",
            StepKind::CodeInput { .. } => "code-input",
            StepKind::Confirmation => "confirmation",
        }
    }
}

/// Resend capability of a step: a countdown and the action it unlocks.
#[derive(Clone)]
pub struct ResendPolicy {
    pub duration_ticks: u32,
    pub action: Arc<dyn SubmitAction>,
}

impl fmt::Debug for ResendPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResendPolicy")
            .field("duration_ticks", &self.duration_ticks)
            .field("action", &self.action.name())
            .finish()
    }
}

/// One step of a flow.
#[derive(Clone)]
pub struct StepSpec {
    name: String,
    kind: StepKind,
    guard: Guard,
    on_submit: Option<Arc<dyn SubmitAction>>,
    clear_on_failure: bool,
    max_attempts: Option<u32>,
    resend: Option<ResendPolicy>,
}

impl StepSpec {
    fn with_kind(name: impl Into<String>, kind: StepKind, guard: Guard) -> Self {
        Self {
            name: name.into(),
            kind,
            guard,
            on_submit: None,
            clear_on_failure: false,
            max_attempts: None,
            resend: None,
        }
    }

    /// Text step guarded by a non-empty value.
    pub fn identifier(name: impl Into<String>) -> Self {
        Self::with_kind(name, StepKind::IdentifierInput, Guard::MinLength(1))
    }

    /// Digit code step guarded by a complete entry.
    pub fn code(name: impl Into<String>, cell_count: usize) -> Self {
        Self::with_kind(
            name,
            StepKind::CodeInput {
                cell_count,
                class: CharClass::Digits,
            },
            Guard::CodeComplete,
        )
    }

    pub fn confirmation(name: impl Into<String>) -> Self {
        Self::with_kind(name, StepKind::Confirmation, Guard::Always)
    }

    /// Sets the character class of a code step. Ignored for other kinds.
    pub fn char_class(mut self, class: CharClass) -> Self {
        if let StepKind::CodeInput { cell_count, .. } = self.kind {
            self.kind = StepKind::CodeInput { cell_count, class };
        }
        self
    }

    pub fn guard(mut self, guard: Guard) -> Self {
        self.guard = guard;
        self
    }

    pub fn on_submit(mut self, action: Arc<dyn SubmitAction>) -> Self {
        self.on_submit = Some(action);
        self
    }

    /// Clear the step's value when its submission is rejected.
    pub fn clear_on_failure(mut self, clear: bool) -> Self {
        self.clear_on_failure = clear;
        self
    }

    /// Fail the whole flow after this many rejected submissions.
    pub fn max_attempts(mut self, attempts: Option<u32>) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn resend(mut self, duration_ticks: u32, action: Arc<dyn SubmitAction>) -> Self {
        self.resend = Some(ResendPolicy {
            duration_ticks,
            action,
        });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> StepKind {
        self.kind
    }

    pub fn guard_ref(&self) -> &Guard {
        &self.guard
    }

    pub fn submit_action(&self) -> Option<&Arc<dyn SubmitAction>> {
        self.on_submit.as_ref()
    }

    pub fn clears_on_failure(&self) -> bool {
        self.clear_on_failure
    }

    pub fn attempt_limit(&self) -> Option<u32> {
        self.max_attempts
    }

    pub fn resend_policy(&self) -> Option<&ResendPolicy> {
        self.resend.as_ref()
    }

    /// Evaluates the step's guard against `state`.
    pub fn can_continue(&self, state: &FlowState) -> bool {
        self.guard.evaluate(state, &self.name)
    }

    pub(crate) fn empty_value(&self) -> StepValue {
        match self.kind {
            StepKind::IdentifierInput => StepValue::Text(String::new()),
            StepKind::CodeInput { cell_count, class } => {
                StepValue::Code(CodeEntry::new(cell_count, class))
            }
            StepKind::Confirmation => StepValue::Empty,
        }
    }
}

impl fmt::Debug for StepSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepSpec")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("guard", &self.guard)
            .field("on_submit", &self.on_submit.as_ref().map(|a| a.name().to_string()))
            .field("clear_on_failure", &self.clear_on_failure)
            .field("max_attempts", &self.max_attempts)
            .field("resend", &self.resend)
            .finish()
    }
}

/// Ordered, validated list of steps a screen enacts.
#[derive(Debug, Clone)]
pub struct FlowDefinition {
    name: String,
    steps: Vec<StepSpec>,
}

impl FlowDefinition {
    pub fn builder(name: impl Into<String>) -> FlowDefinitionBuilder {
        FlowDefinitionBuilder {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn steps(&self) -> &[StepSpec] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step(&self, index: usize) -> Option<&StepSpec> {
        self.steps.get(index)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.name == name)
    }
}

pub struct FlowDefinitionBuilder {
    name: String,
    steps: Vec<StepSpec>,
}

impl FlowDefinitionBuilder {
    pub fn step(mut self, step: StepSpec) -> Self {
        self.steps.push(step);
        self
    }

    /// Validates and freezes the definition.
    ///
    /// Checks:
    /// - At least one step
    /// - Step names are unique
    /// - Code steps have at least one cell
    /// - Guards only reference existing steps
    /// - Resend countdowns are positive
    pub fn build(self) -> Result<FlowDefinition, DefinitionError> {
        if self.steps.is_empty() {
            return Err(DefinitionError::Empty { flow: self.name });
        }

        let mut names = HashSet::new();
        for step in &self.steps {
            if !names.insert(step.name.as_str()) {
                return Err(DefinitionError::DuplicateStep {
                    step: step.name.clone(),
                });
            }
            if let StepKind::CodeInput { cell_count: 0, .. } = step.kind {
                return Err(DefinitionError::ZeroCells {
                    step: step.name.clone(),
                });
            }
            if matches!(&step.resend, Some(policy) if policy.duration_ticks == 0) {
                return Err(DefinitionError::ZeroResendDuration {
                    step: step.name.clone(),
                });
            }
        }

        for step in &self.steps {
            for target in step.guard.referenced_steps() {
                if !names.contains(target) {
                    return Err(DefinitionError::UnknownGuardTarget {
                        step: step.name.clone(),
                        target: target.to_string(),
                    });
                }
            }
        }

        Ok(FlowDefinition {
            name: self.name,
            steps: self.steps,
        })
    }
}
