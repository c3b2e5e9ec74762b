//! Shared test utilities and mock infrastructure.

#![allow(dead_code, unused_imports)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Notify;

use stepgate::flow::StepSpec;
use stepgate::{submit_fn, FlowDefinition, FlowState, Outcome, SubmitAction};

/// Submit action that parks until released and counts its invocations.
pub struct GatedAction {
    outcome: Outcome,
    started: Notify,
    release: Notify,
    calls: AtomicUsize,
}

impl GatedAction {
    pub fn new(outcome: Outcome) -> Arc<Self> {
        Arc::new(Self {
            outcome,
            started: Notify::new(),
            release: Notify::new(),
            calls: AtomicUsize::new(0),
        })
    }

    /// Resolves once `submit` has been entered.
    pub async fn started(&self) {
        self.started.notified().await;
    }

    pub fn release(&self) {
        self.release.notify_one();
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SubmitAction for GatedAction {
    fn name(&self) -> &str {
        "gated"
    }

    async fn submit(&self, _state: &FlowState) -> Outcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.started.notify_one();
        self.release.notified().await;
        self.outcome.clone()
    }
}

/// Accepts the code step's value only when it equals `expected`.
pub fn expect_code(step: &'static str, expected: &'static str) -> Arc<dyn SubmitAction> {
    submit_fn("verify", move |state: FlowState| async move {
        if state.text(step) == expected {
            Outcome::Accepted
        } else {
            Outcome::rejected("WrongCode")
        }
    })
}

/// Counts resend invocations.
pub fn counted(counter: Arc<AtomicUsize>) -> Arc<dyn SubmitAction> {
    submit_fn("resend", move |_| {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Outcome::Accepted
        }
    })
}

/// Single 6-cell code step verified against `123456`.
pub fn single_code_flow() -> FlowDefinition {
    FlowDefinition::builder("single_code")
        .step(StepSpec::code("code", 6).on_submit(expect_code("code", "123456")))
        .build()
        .expect("valid flow")
}

/// Gives spawned tasks a chance to run.
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}
