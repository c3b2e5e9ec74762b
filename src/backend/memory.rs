//! Deterministic in-process backend.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::executor::Outcome;

use super::{AccountBackend, IdentityBackend, UNKNOWN_IDENTIFIER, WRONG_CODE, WRONG_PASSCODE};

/// A call received by [`InMemoryBackend`], in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    RequestCode { identifier: String },
    VerifyCode { identifier: String, code: String },
    ResendCode { identifier: String },
    VerifyPasscode { passcode: String },
    SetPasscode { passcode: String },
    DeleteAccount { identifier: String },
}

struct MemoryState {
    expected_code: String,
    passcode: String,
    unknown: HashSet<String>,
    deleted: Vec<String>,
    calls: Vec<BackendCall>,
}

/// Backend that accepts one fixed code and keeps a single passcode.
pub struct InMemoryBackend {
    state: Mutex<MemoryState>,
    latency: Option<Duration>,
}

impl InMemoryBackend {
    pub fn new(expected_code: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(MemoryState {
                expected_code: expected_code.into(),
                passcode: String::new(),
                unknown: HashSet::new(),
                deleted: Vec::new(),
                calls: Vec::new(),
            }),
            latency: None,
        }
    }

    pub fn with_passcode(self, passcode: impl Into<String>) -> Self {
        self.state.lock().passcode = passcode.into();
        self
    }

    /// Delay every call by `latency` (after it is recorded).
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Make `request_code` reject this identifier.
    pub fn with_unknown_identifier(self, identifier: impl Into<String>) -> Self {
        self.state.lock().unknown.insert(identifier.into());
        self
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.state.lock().calls.clone()
    }

    pub fn passcode(&self) -> String {
        self.state.lock().passcode.clone()
    }

    pub fn deleted_accounts(&self) -> Vec<String> {
        self.state.lock().deleted.clone()
    }

    async fn record<F>(&self, call: BackendCall, answer: F) -> Outcome
    where
        F: FnOnce(&mut MemoryState) -> Outcome + Send,
    {
        let outcome = {
            let mut state = self.state.lock();
            state.calls.push(call);
            answer(&mut *state)
        };
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        outcome
    }
}

#[async_trait]
impl IdentityBackend for InMemoryBackend {
    async fn request_code(&self, identifier: &str) -> Outcome {
        let id = identifier.to_string();
        self.record(
            BackendCall::RequestCode {
                identifier: id.clone(),
            },
            move |state| {
                if state.unknown.contains(&id) {
                    Outcome::rejected(UNKNOWN_IDENTIFIER)
                } else {
                    Outcome::Accepted
                }
            },
        )
        .await
    }

    async fn verify_code(&self, identifier: &str, code: &str) -> Outcome {
        let code = code.to_string();
        self.record(
            BackendCall::VerifyCode {
                identifier: identifier.to_string(),
                code: code.clone(),
            },
            move |state| {
                if state.expected_code == code {
                    Outcome::Accepted
                } else {
                    Outcome::rejected(WRONG_CODE)
                }
            },
        )
        .await
    }

    async fn resend_code(&self, identifier: &str) -> Outcome {
        self.record(
            BackendCall::ResendCode {
                identifier: identifier.to_string(),
            },
            |_| Outcome::Accepted,
        )
        .await
    }
}

#[async_trait]
impl AccountBackend for InMemoryBackend {
    async fn verify_passcode(&self, passcode: &str) -> Outcome {
        let passcode = passcode.to_string();
        self.record(
            BackendCall::VerifyPasscode {
                passcode: passcode.clone(),
            },
            move |state| {
                if state.passcode == passcode {
                    Outcome::Accepted
                } else {
                    Outcome::rejected(WRONG_PASSCODE)
                }
            },
        )
        .await
    }

    async fn set_passcode(&self, passcode: &str) -> Outcome {
        let passcode = passcode.to_string();
        self.record(
            BackendCall::SetPasscode {
                passcode: passcode.clone(),
            },
            move |state| {
                state.passcode = passcode;
                Outcome::Accepted
            },
        )
        .await
    }

    async fn delete_account(&self, identifier: &str) -> Outcome {
        let id = identifier.to_string();
        self.record(
            BackendCall::DeleteAccount {
                identifier: id.clone(),
            },
            move |state| {
                state.deleted.push(id);
                Outcome::Accepted
            },
        )
        .await
    }
}
