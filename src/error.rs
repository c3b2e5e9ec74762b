//! Error types surfaced by the engine.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error recorded on a flow, either as `last_error` on the active step or as
/// the reason of a `Failure` terminal state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ErrorKind {
    /// A guard rejected an attempted advance. Recovered locally.
    InvalidInput,
    /// The backend answered `ok: false` for the active step.
    SubmissionRejected { reason: String },
    /// The flow was cancelled while a call was in flight. Never shown to users.
    SubmissionAbandoned,
    /// The resend countdown was started with a zero duration.
    TimerMisuse,
    /// The active step ran out of submission attempts.
    AttemptsExhausted { step: String },
}

impl ErrorKind {
    pub fn rejected(reason: impl Into<String>) -> Self {
        ErrorKind::SubmissionRejected {
            reason: reason.into(),
        }
    }

    /// Backend reason code, if this is a rejection.
    pub fn reason(&self) -> Option<&str> {
        match self {
            ErrorKind::SubmissionRejected { reason } => Some(reason),
            _ => None,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::InvalidInput => write!(f, "invalid input"),
            ErrorKind::SubmissionRejected { reason } => write!(f, "{}", reason),
            ErrorKind::SubmissionAbandoned => write!(f, "submission abandoned"),
            ErrorKind::TimerMisuse => write!(f, "timer misuse"),
            ErrorKind::AttemptsExhausted { step } => {
                write!(f, "no attempts left for step '{}'", step)
            }
        }
    }
}

/// Errors returned synchronously by engine operations.
///
/// None of these reach the backend: they are rejected before any call is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("Invalid input: {detail}")]
    InvalidInput { detail: String },

    #[error("Step '{step}' is not ready to continue")]
    GuardRejected { step: String },

    #[error("A submission is already in flight")]
    SubmissionInFlight,

    #[error("The flow is finished or discarded")]
    FlowClosed,

    #[error("Already at the first step")]
    NoPreviousStep,

    #[error("Step '{step}' has no resend capability")]
    ResendUnavailable { step: String },

    #[error("Resend not allowed for another {remaining_ticks} ticks")]
    ResendNotEligible { remaining_ticks: u32 },

    #[error("Timer started with a non-positive duration")]
    TimerMisuse,

    #[error("Step '{step}' does not accept {operation}")]
    WrongStepKind {
        step: String,
        operation: &'static str,
    },
}

impl EngineError {
    pub(crate) fn invalid(detail: impl Into<String>) -> Self {
        EngineError::InvalidInput {
            detail: detail.into(),
        }
    }

    /// Maps the error onto the kind recorded in flow state.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::TimerMisuse => ErrorKind::TimerMisuse,
            _ => ErrorKind::InvalidInput,
        }
    }
}

/// Errors raised while building a [`FlowDefinition`](crate::flow::FlowDefinition).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    #[error("Flow '{flow}' has no steps")]
    Empty { flow: String },

    #[error("Step name '{step}' is used more than once")]
    DuplicateStep { step: String },

    #[error("Code step '{step}' must have at least one cell")]
    ZeroCells { step: String },

    #[error("Guard on step '{step}' references unknown step '{target}'")]
    UnknownGuardTarget { step: String, target: String },

    #[error("Resend on step '{step}' must have a positive duration")]
    ZeroResendDuration { step: String },
}
