//! Transition executor: runs a step's asynchronous side effect and reports
//! exactly one outcome, unless the owning flow is torn down first.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;

use crate::flow::FlowState;

/// Reason reported when a submission exceeds the configured timeout.
pub const TIMEOUT_REASON: &str = "Timeout";

/// Result of a submit action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Accepted,
    Rejected { reason: String },
}

impl Outcome {
    pub fn rejected(reason: impl Into<String>) -> Self {
        Outcome::Rejected {
            reason: reason.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Outcome::Accepted)
    }
}

/// Asynchronous side effect bound to a step (backend call, account mutation).
#[async_trait]
pub trait SubmitAction: Send + Sync {
    /// Returns the name of this action for logging.
    fn name(&self) -> &str;

    /// Performs the side effect against a snapshot of the flow state.
    async fn submit(&self, state: &FlowState) -> Outcome;
}

struct FnAction<F> {
    name: String,
    f: F,
}

#[async_trait]
impl<F, Fut> SubmitAction for FnAction<F>
where
    F: Fn(FlowState) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Outcome> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn submit(&self, state: &FlowState) -> Outcome {
        (self.f)(state.clone()).await
    }
}

/// Wraps an async closure as a submit action.
pub fn submit_fn<F, Fut>(name: impl Into<String>, f: F) -> Arc<dyn SubmitAction>
where
    F: Fn(FlowState) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Outcome> + Send + 'static,
{
    Arc::new(FnAction {
        name: name.into(),
        f,
    })
}

/// One-shot signal marking every in-flight call of a flow as abandoned.
#[derive(Clone, Default)]
pub struct AbandonSignal {
    abandoned: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl AbandonSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abandon(&self) {
        if !self.abandoned.swap(true, Ordering::SeqCst) {
            self.notify.notify_waiters();
        }
    }

    pub fn is_abandoned(&self) -> bool {
        self.abandoned.load(Ordering::SeqCst)
    }

    pub async fn wait(&self) {
        // Register before checking the flag so a concurrent abandon() between
        // the check and the await is not lost.
        let notified = self.notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();
        if self.is_abandoned() {
            return;
        }
        notified.await;
    }
}

/// What happened to a submitted call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Execution {
    Resolved(Outcome),
    /// The flow was cancelled first; the result must not be applied.
    Abandoned,
}

/// Runs submit actions for one flow instance.
#[derive(Clone, Default)]
pub struct TransitionExecutor {
    signal: AbandonSignal,
    timeout: Option<Duration>,
}

impl TransitionExecutor {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            signal: AbandonSignal::new(),
            timeout,
        }
    }

    pub fn abandon(&self) {
        self.signal.abandon();
    }

    pub fn is_abandoned(&self) -> bool {
        self.signal.is_abandoned()
    }

    /// Invokes `action` and waits for its single outcome.
    ///
    /// Abandonment wins over a result that arrives at the same time.
    pub async fn execute(&self, action: &dyn SubmitAction, state: &FlowState) -> Execution {
        if self.signal.is_abandoned() {
            return Execution::Abandoned;
        }

        tracing::debug!(action = action.name(), "Submitting");
        let execution = tokio::select! {
            biased;
            _ = self.signal.wait() => Execution::Abandoned,
            outcome = self.call(action, state) => {
                if self.signal.is_abandoned() {
                    Execution::Abandoned
                } else {
                    Execution::Resolved(outcome)
                }
            }
        };

        match &execution {
            Execution::Resolved(Outcome::Accepted) => {
                tracing::debug!(action = action.name(), "Submission accepted");
            }
            Execution::Resolved(Outcome::Rejected { reason }) => {
                tracing::warn!(action = action.name(), reason = %reason, "Submission rejected");
            }
            Execution::Abandoned => {
                tracing::debug!(action = action.name(), "Submission abandoned");
            }
        }
        execution
    }

    async fn call(&self, action: &dyn SubmitAction, state: &FlowState) -> Outcome {
        match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, action.submit(state)).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    tracing::warn!(
                        action = action.name(),
                        timeout_ms = limit.as_millis() as u64,
                        "Submission timed out"
                    );
                    Outcome::rejected(TIMEOUT_REASON)
                }
            },
            None => action.submit(state).await,
        }
    }
}
