//! Step-gated verification flows: phone/email code entry, passcode changes,
//! account deletion.
//!
//! A flow is an ordered list of steps. Each step collects a value, is gated by
//! a guard, and may trigger an asynchronous backend call before the next step
//! becomes active. Hosts render from [`FlowSnapshot`] and feed user input back
//! through [`FlowController`].

pub mod backend;
pub mod code_entry;
pub mod config;
pub mod controller;
pub mod error;
pub mod executor;
pub mod flow;
pub mod flows;
pub mod guard;
pub mod logging;
pub mod mvi;
pub mod resend;

pub use controller::{FlowController, FlowControllerBuilder};
pub use error::{DefinitionError, EngineError, ErrorKind};
pub use executor::{submit_fn, Outcome, SubmitAction};
pub use flow::{FlowDefinition, FlowPhase, FlowSnapshot, FlowState, StepSpec};
pub use guard::Guard;
