//! Completion guards: pure predicates deciding whether the active step may continue.

use std::fmt;
use std::sync::Arc;

use crate::flow::FlowState;

/// Predicate over the flow state and the name of the step being checked.
pub type GuardFn = Arc<dyn Fn(&FlowState, &str) -> bool + Send + Sync>;

/// Gate on leaving a step.
///
/// Guards hold no state and never perform I/O; they are re-evaluated on
/// every state change.
#[derive(Clone)]
pub enum Guard {
    /// Always satisfied (confirmation steps).
    Always,
    /// Every cell of the step's code entry is filled.
    CodeComplete,
    /// The step's text value, trimmed, has at least this many characters.
    MinLength(usize),
    /// The step's value equals the value stored for another step.
    MatchesStep(String),
    /// The step's value differs from the value stored for another step.
    DiffersFromStep(String),
    /// Every inner guard is satisfied.
    AllOf(Vec<Guard>),
    /// Caller-supplied predicate.
    Custom(GuardFn),
}

impl Guard {
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&FlowState, &str) -> bool + Send + Sync + 'static,
    {
        Guard::Custom(Arc::new(f))
    }

    /// Combines two guards; both must hold.
    pub fn and(self, other: Guard) -> Guard {
        match self {
            Guard::AllOf(mut guards) => {
                guards.push(other);
                Guard::AllOf(guards)
            }
            first => Guard::AllOf(vec![first, other]),
        }
    }

    pub fn evaluate(&self, state: &FlowState, step: &str) -> bool {
        match self {
            Guard::Always => true,
            Guard::CodeComplete => state
                .code_entry(step)
                .map(|entry| entry.is_complete())
                .unwrap_or(false),
            Guard::MinLength(min) => state.text(step).trim().chars().count() >= *min,
            Guard::MatchesStep(other) => state.text(step) == state.text(other),
            Guard::DiffersFromStep(other) => state.text(step) != state.text(other),
            Guard::AllOf(guards) => guards.iter().all(|g| g.evaluate(state, step)),
            Guard::Custom(f) => f(state, step),
        }
    }

    /// Names of other steps this guard reads.
    pub(crate) fn referenced_steps(&self) -> Vec<&str> {
        match self {
            Guard::MatchesStep(other) | Guard::DiffersFromStep(other) => vec![other.as_str()],
            Guard::AllOf(guards) => guards.iter().flat_map(Guard::referenced_steps).collect(),
            _ => Vec::new(),
        }
    }
}

impl fmt::Debug for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Guard::Always => write!(f, "Always"),
            Guard::CodeComplete => write!(f, "CodeComplete"),
            Guard::MinLength(n) => write!(f, "MinLength({})", n),
            Guard::MatchesStep(other) => write!(f, "MatchesStep({:?})", other),
            Guard::DiffersFromStep(other) => write!(f, "DiffersFromStep({:?})", other),
            Guard::AllOf(guards) => f.debug_tuple("AllOf").field(guards).finish(),
            Guard::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}
