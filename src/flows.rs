//! Ready-made flows for the common verification screens.
//!
//! Each builder wires step specs to backend calls according to an
//! [`EngineConfig`]. Code steps verified by the backend clear their cells on
//! a rejected attempt and offer a resend countdown.

use std::sync::Arc;

use async_trait::async_trait;

use crate::backend::{AccountBackend, IdentityBackend};
use crate::config::EngineConfig;
use crate::error::DefinitionError;
use crate::executor::{Outcome, SubmitAction};
use crate::flow::{FlowDefinition, FlowState, StepSpec};
use crate::guard::Guard;

pub const PHONE: &str = "phone";
pub const EMAIL: &str = "email";
pub const IDENTIFIER: &str = "identifier";
pub const WARNING: &str = "warning";
pub const CODE: &str = "code";
pub const CURRENT: &str = "current";
pub const NEW: &str = "new";
pub const CONFIRM: &str = "confirm";
pub const DONE: &str = "done";

/// Where a backend call takes its phone number or email address from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentifierSource {
    /// Value entered on an identifier step of the same flow.
    Step(&'static str),
    /// Known up front, e.g. the signed-in account.
    Fixed(String),
}

impl IdentifierSource {
    fn resolve(&self, state: &FlowState) -> String {
        match self {
            IdentifierSource::Step(step) => state.text(step).trim().to_string(),
            IdentifierSource::Fixed(identifier) => identifier.clone(),
        }
    }
}

struct RequestCode {
    backend: Arc<dyn IdentityBackend>,
    identifier: IdentifierSource,
}

#[async_trait]
impl SubmitAction for RequestCode {
    fn name(&self) -> &str {
        "request_code"
    }

    async fn submit(&self, state: &FlowState) -> Outcome {
        let identifier = self.identifier.resolve(state);
        self.backend.request_code(&identifier).await
    }
}

struct VerifyCode {
    backend: Arc<dyn IdentityBackend>,
    identifier: IdentifierSource,
    step: &'static str,
}

#[async_trait]
impl SubmitAction for VerifyCode {
    fn name(&self) -> &str {
        "verify_code"
    }

    async fn submit(&self, state: &FlowState) -> Outcome {
        let identifier = self.identifier.resolve(state);
        self.backend
            .verify_code(&identifier, &state.text(self.step))
            .await
    }
}

struct ResendCode {
    backend: Arc<dyn IdentityBackend>,
    identifier: IdentifierSource,
}

#[async_trait]
impl SubmitAction for ResendCode {
    fn name(&self) -> &str {
        "resend_code"
    }

    async fn submit(&self, state: &FlowState) -> Outcome {
        let identifier = self.identifier.resolve(state);
        self.backend.resend_code(&identifier).await
    }
}

struct VerifyPasscode {
    backend: Arc<dyn AccountBackend>,
    step: &'static str,
}

#[async_trait]
impl SubmitAction for VerifyPasscode {
    fn name(&self) -> &str {
        "verify_passcode"
    }

    async fn submit(&self, state: &FlowState) -> Outcome {
        self.backend.verify_passcode(&state.text(self.step)).await
    }
}

struct SetPasscode {
    backend: Arc<dyn AccountBackend>,
    step: &'static str,
}

#[async_trait]
impl SubmitAction for SetPasscode {
    fn name(&self) -> &str {
        "set_passcode"
    }

    async fn submit(&self, state: &FlowState) -> Outcome {
        self.backend.set_passcode(&state.text(self.step)).await
    }
}

/// Checks the code, then deletes the account it was sent for.
struct DeleteAccount {
    identity: Arc<dyn IdentityBackend>,
    account: Arc<dyn AccountBackend>,
    identifier: IdentifierSource,
    step: &'static str,
}

#[async_trait]
impl SubmitAction for DeleteAccount {
    fn name(&self) -> &str {
        "delete_account"
    }

    async fn submit(&self, state: &FlowState) -> Outcome {
        let identifier = self.identifier.resolve(state);
        match self
            .identity
            .verify_code(&identifier, &state.text(self.step))
            .await
        {
            Outcome::Accepted => self.account.delete_account(&identifier).await,
            rejected => rejected,
        }
    }
}

fn looks_like_email(value: &str) -> bool {
    let value = value.trim();
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .map(|(host, tld)| !host.is_empty() && !tld.is_empty())
                    .unwrap_or(false)
        }
        None => false,
    }
}

/// Optional leading `+`, then digits with spaces, dashes or parentheses.
/// The length floor counts digits only.
fn looks_like_phone(value: &str, min_digits: usize) -> bool {
    let value = value.trim();
    let body = value.strip_prefix('+').unwrap_or(value);
    let digits = body.chars().filter(char::is_ascii_digit).count();
    digits >= min_digits.max(1)
        && body
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '-' | '(' | ')'))
}

fn phone_step(config: &EngineConfig) -> StepSpec {
    let min_digits = config.identifier.min_length;
    StepSpec::identifier(PHONE).guard(Guard::custom(move |state, step| {
        looks_like_phone(&state.text(step), min_digits)
    }))
}

fn email_step(config: &EngineConfig) -> StepSpec {
    StepSpec::identifier(EMAIL).guard(
        Guard::MinLength(config.identifier.min_length)
            .and(Guard::custom(|state, step| looks_like_email(&state.text(step)))),
    )
}

/// Code step verified by the identity backend, with a resend countdown.
fn verified_code_step(
    config: &EngineConfig,
    action: Arc<dyn SubmitAction>,
    identity: &Arc<dyn IdentityBackend>,
    identifier: IdentifierSource,
) -> StepSpec {
    StepSpec::code(CODE, config.code.length)
        .char_class(config.code.charset)
        .on_submit(action)
        .clear_on_failure(true)
        .max_attempts(config.submit.max_attempts)
        .resend(
            config.resend.duration_ticks,
            Arc::new(ResendCode {
                backend: Arc::clone(identity),
                identifier,
            }),
        )
}

fn passcode_step(config: &EngineConfig, name: &'static str) -> StepSpec {
    StepSpec::code(name, config.passcode.length).char_class(config.passcode.charset)
}

fn confirm_step(config: &EngineConfig, account: &Arc<dyn AccountBackend>) -> StepSpec {
    passcode_step(config, CONFIRM)
        .guard(Guard::CodeComplete.and(Guard::MatchesStep(NEW.to_string())))
        .on_submit(Arc::new(SetPasscode {
            backend: Arc::clone(account),
            step: CONFIRM,
        }))
}

fn verification(
    name: &str,
    config: &EngineConfig,
    identity: Arc<dyn IdentityBackend>,
    first: StepSpec,
    source: &'static str,
) -> Result<FlowDefinition, DefinitionError> {
    let identifier = IdentifierSource::Step(source);
    let verify = Arc::new(VerifyCode {
        backend: Arc::clone(&identity),
        identifier: identifier.clone(),
        step: CODE,
    });

    FlowDefinition::builder(name)
        .step(first.on_submit(Arc::new(RequestCode {
            backend: Arc::clone(&identity),
            identifier: identifier.clone(),
        })))
        .step(verified_code_step(config, verify, &identity, identifier))
        .build()
}

/// Phone number, then the SMS code sent to it.
pub fn phone_login(
    config: &EngineConfig,
    identity: Arc<dyn IdentityBackend>,
) -> Result<FlowDefinition, DefinitionError> {
    verification("phone_login", config, identity, phone_step(config), PHONE)
}

/// Email address, then the code mailed to it.
pub fn email_verification(
    config: &EngineConfig,
    identity: Arc<dyn IdentityBackend>,
) -> Result<FlowDefinition, DefinitionError> {
    verification("email_verification", config, identity, email_step(config), EMAIL)
}

/// Warning, code sent to the account's identifier, then deletion.
pub fn account_deletion(
    config: &EngineConfig,
    identity: Arc<dyn IdentityBackend>,
    account: Arc<dyn AccountBackend>,
    identifier: impl Into<String>,
) -> Result<FlowDefinition, DefinitionError> {
    let identifier = IdentifierSource::Fixed(identifier.into());
    let delete = Arc::new(DeleteAccount {
        identity: Arc::clone(&identity),
        account,
        identifier: identifier.clone(),
        step: CODE,
    });

    FlowDefinition::builder("account_deletion")
        .step(StepSpec::confirmation(WARNING).on_submit(Arc::new(RequestCode {
            backend: Arc::clone(&identity),
            identifier: identifier.clone(),
        })))
        .step(verified_code_step(config, delete, &identity, identifier))
        .step(StepSpec::confirmation(DONE))
        .build()
}

/// New passcode, confirmation, done.
pub fn passcode_create(
    config: &EngineConfig,
    account: Arc<dyn AccountBackend>,
) -> Result<FlowDefinition, DefinitionError> {
    FlowDefinition::builder("passcode_create")
        .step(passcode_step(config, NEW))
        .step(confirm_step(config, &account))
        .step(StepSpec::confirmation(DONE))
        .build()
}

/// Current passcode, a different new one, its confirmation, done.
pub fn passcode_update(
    config: &EngineConfig,
    account: Arc<dyn AccountBackend>,
) -> Result<FlowDefinition, DefinitionError> {
    FlowDefinition::builder("passcode_update")
        .step(
            passcode_step(config, CURRENT)
                .on_submit(Arc::new(VerifyPasscode {
                    backend: Arc::clone(&account),
                    step: CURRENT,
                }))
                .clear_on_failure(true)
                .max_attempts(config.submit.max_attempts),
        )
        .step(
            passcode_step(config, NEW)
                .guard(Guard::CodeComplete.and(Guard::DiffersFromStep(CURRENT.to_string()))),
        )
        .step(confirm_step(config, &account))
        .step(StepSpec::confirmation(DONE))
        .build()
}

/// Forgotten passcode: identifier, code sent to it, new passcode, confirmation.
pub fn passcode_reset(
    config: &EngineConfig,
    identity: Arc<dyn IdentityBackend>,
    account: Arc<dyn AccountBackend>,
) -> Result<FlowDefinition, DefinitionError> {
    let identifier = IdentifierSource::Step(IDENTIFIER);
    let verify = Arc::new(VerifyCode {
        backend: Arc::clone(&identity),
        identifier: identifier.clone(),
        step: CODE,
    });

    FlowDefinition::builder("passcode_reset")
        .step(
            StepSpec::identifier(IDENTIFIER)
                .guard(Guard::MinLength(config.identifier.min_length))
                .on_submit(Arc::new(RequestCode {
                    backend: Arc::clone(&identity),
                    identifier: identifier.clone(),
                })),
        )
        .step(verified_code_step(config, verify, &identity, identifier))
        .step(passcode_step(config, NEW))
        .step(confirm_step(config, &account))
        .build()
}
