//! Tests for the host-facing flow controller: submissions, cancellation and
//! the resend countdown pump.

mod common;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use common::*;
use stepgate::flow::StepSpec;
use stepgate::Guard;
use stepgate::resend::{ManualClock, TokioClock};
use stepgate::{EngineError, ErrorKind, FlowController, FlowDefinition, FlowPhase, Outcome};

fn resend_flow(duration_ticks: u32, counter: Arc<AtomicUsize>) -> FlowDefinition {
    FlowDefinition::builder("resend")
        .step(
            StepSpec::code("code", 6)
                .on_submit(expect_code("code", "123456"))
                .resend(duration_ticks, counted(counter)),
        )
        .build()
        .expect("valid flow")
}

// -- submissions --------------------------------------------------------------

#[tokio::test]
async fn typed_code_is_accepted() {
    let controller = FlowController::new(single_code_flow());

    for (index, digit) in ["1", "2", "3", "4", "5"].into_iter().enumerate() {
        controller.set_cell(index, digit).unwrap();
        let state = controller.state();
        assert_eq!(state.code_entry("code").unwrap().focused_index(), Some(index + 1));
        assert!(!controller.can_continue());
    }

    controller.set_cell(5, "6").unwrap();
    assert_eq!(controller.state().code_entry("code").unwrap().focused_index(), None);
    assert!(controller.can_continue());

    assert_eq!(controller.advance().await, Ok(FlowPhase::Success));
}

#[tokio::test]
async fn wrong_code_keeps_step_and_reports_reason() {
    let controller = FlowController::new(single_code_flow());
    controller.paste("122221").unwrap();

    assert_eq!(controller.advance().await, Ok(FlowPhase::AtStep(0)));
    let state = controller.state();
    assert_eq!(state.last_error(), Some(&ErrorKind::rejected("WrongCode")));
    assert_eq!(state.text("code"), "122221");
    assert_eq!(state.attempts("code"), 1);

    // Editing clears the error.
    controller.backspace().unwrap();
    assert_eq!(controller.state().last_error(), None);
}

#[tokio::test]
async fn incomplete_code_cannot_advance() {
    let controller = FlowController::new(single_code_flow());
    controller.paste("12345").unwrap();

    assert_eq!(
        controller.advance().await,
        Err(EngineError::GuardRejected {
            step: "code".to_string()
        })
    );
    assert_eq!(controller.phase(), FlowPhase::AtStep(0));
}

#[tokio::test]
async fn second_advance_while_in_flight_is_rejected() {
    let gate = GatedAction::new(Outcome::Accepted);
    let definition = FlowDefinition::builder("gated")
        .step(StepSpec::identifier("phone").on_submit(gate.clone()))
        .step(StepSpec::confirmation("done"))
        .build()
        .unwrap();
    let controller = FlowController::new(definition);
    controller.set_text("5550100").unwrap();

    let background = controller.clone();
    let first = tokio::spawn(async move { background.advance().await });
    gate.started().await;

    assert_eq!(controller.phase(), FlowPhase::Submitting(0));
    assert_eq!(controller.advance().await, Err(EngineError::SubmissionInFlight));
    assert_eq!(controller.set_text("x"), Err(EngineError::SubmissionInFlight));
    assert_eq!(controller.back(), Err(EngineError::SubmissionInFlight));
    assert!(!controller.can_continue());

    gate.release();
    assert_eq!(first.await.unwrap(), Ok(FlowPhase::AtStep(1)));
    assert_eq!(gate.calls(), 1);
    assert_eq!(controller.state().text("phone"), "5550100");
}

#[tokio::test]
async fn cancel_abandons_in_flight_submission() {
    let gate = GatedAction::new(Outcome::Accepted);
    let definition = FlowDefinition::builder("cancelled")
        .step(StepSpec::code("code", 4).on_submit(gate.clone()))
        .build()
        .unwrap();
    let controller = FlowController::new(definition);
    controller.paste("1234").unwrap();

    let background = controller.clone();
    let pending = tokio::spawn(async move { background.advance().await });
    gate.started().await;

    controller.cancel().unwrap();
    assert_eq!(pending.await.unwrap(), Ok(FlowPhase::Discarded));

    // The late outcome never lands and the flow accepts nothing more.
    gate.release();
    settle().await;
    assert_eq!(controller.phase(), FlowPhase::Discarded);
    assert_eq!(controller.paste("1"), Err(EngineError::FlowClosed));
    assert_eq!(controller.cancel(), Err(EngineError::FlowClosed));
}

#[tokio::test(start_paused = true)]
async fn slow_submission_times_out() {
    let definition = FlowDefinition::builder("slow")
        .step(StepSpec::confirmation("confirm").on_submit(stepgate::submit_fn(
            "slow",
            |_| async {
                tokio::time::sleep(Duration::from_secs(120)).await;
                Outcome::Accepted
            },
        )))
        .build()
        .unwrap();
    let controller = FlowController::builder(definition)
        .submit_timeout(Some(Duration::from_secs(10)))
        .build();

    assert_eq!(controller.advance().await, Ok(FlowPhase::AtStep(0)));
    assert_eq!(
        controller.state().last_error(),
        Some(&ErrorKind::rejected("Timeout"))
    );
}

#[tokio::test]
async fn acknowledge_discards_finished_flow() {
    let definition = FlowDefinition::builder("ack")
        .step(StepSpec::confirmation("done"))
        .build()
        .unwrap();
    let controller = FlowController::new(definition);

    assert!(controller.acknowledge().is_err());
    assert_eq!(controller.advance().await, Ok(FlowPhase::Success));
    assert_eq!(controller.advance().await, Err(EngineError::FlowClosed));

    controller.acknowledge().unwrap();
    assert_eq!(controller.phase(), FlowPhase::Discarded);
    assert_eq!(controller.acknowledge(), Err(EngineError::FlowClosed));
}

// -- resend -------------------------------------------------------------------

#[tokio::test]
async fn resend_waits_for_countdown_and_clears_code() {
    let counter = Arc::new(AtomicUsize::new(0));
    let controller = FlowController::new(resend_flow(3, counter.clone()));
    controller.paste("12").unwrap();

    assert_eq!(
        controller.resend().await,
        Err(EngineError::ResendNotEligible { remaining_ticks: 3 })
    );

    controller.tick();
    controller.tick();
    assert_eq!(controller.snapshot().resend.map(|r| r.remaining_ticks), Some(1));
    let timer = controller.tick();
    assert!(timer.is_eligible());

    let timer = controller.resend().await.unwrap();
    assert_eq!(timer.remaining_ticks(), 3);
    assert!(timer.is_running());
    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert_eq!(controller.state().code_entry("code").unwrap().filled_count(), 0);
}

#[tokio::test]
async fn rejected_resend_allows_retry() {
    let definition = FlowDefinition::builder("resend_fails")
        .step(StepSpec::code("code", 6).resend(
            2,
            stepgate::submit_fn("resend", |_| async { Outcome::rejected("RateLimited") }),
        ))
        .build()
        .unwrap();
    let controller = FlowController::new(definition);
    controller.tick();
    controller.tick();

    let timer = controller.resend().await.unwrap();
    assert!(timer.is_eligible());
    assert_eq!(
        controller.state().last_error(),
        Some(&ErrorKind::rejected("RateLimited"))
    );
}

#[tokio::test(start_paused = true)]
async fn tokio_clock_drives_countdown() {
    let counter = Arc::new(AtomicUsize::new(0));
    let controller = FlowController::builder(resend_flow(5, counter))
        .clock(Arc::new(TokioClock::new(Duration::from_secs(1))))
        .build();
    assert_eq!(controller.timer().remaining_ticks(), 5);

    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert_eq!(controller.timer().remaining_ticks(), 3);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(controller.timer().is_eligible());
    assert_eq!(controller.timer().remaining_ticks(), 0);
}

#[tokio::test]
async fn clock_subscription_follows_countdown() {
    let clock = Arc::new(ManualClock::new());
    let counter = Arc::new(AtomicUsize::new(0));
    let controller = FlowController::builder(resend_flow(4, counter))
        .clock(clock.clone())
        .build();
    settle().await;
    assert_eq!(clock.active_subscriptions(), 1);

    clock.advance(2);
    settle().await;
    assert_eq!(controller.timer().remaining_ticks(), 2);

    // Expiry ends the subscription.
    clock.advance(2);
    settle().await;
    assert!(controller.timer().is_eligible());
    assert_eq!(clock.active_subscriptions(), 0);

    // A restart subscribes once; countdowns never stack.
    controller.resend().await.unwrap();
    settle().await;
    assert_eq!(clock.active_subscriptions(), 1);
    assert_eq!(controller.timer().remaining_ticks(), 4);

    controller.cancel().unwrap();
    settle().await;
    assert_eq!(clock.active_subscriptions(), 0);
    assert!(!controller.timer().is_running());
}

#[tokio::test]
async fn dropping_controller_unsubscribes() {
    let clock = Arc::new(ManualClock::new());
    let counter = Arc::new(AtomicUsize::new(0));
    let controller = FlowController::builder(resend_flow(10, counter))
        .clock(clock.clone())
        .build();
    settle().await;
    assert_eq!(clock.active_subscriptions(), 1);

    drop(controller);
    settle().await;
    assert_eq!(clock.active_subscriptions(), 0);
}

#[tokio::test]
async fn leaving_step_stops_countdown() {
    let counter = Arc::new(AtomicUsize::new(0));
    let definition = FlowDefinition::builder("two_steps")
        .step(StepSpec::identifier("email"))
        .step(StepSpec::code("code", 6).resend(30, counted(counter)))
        .build()
        .unwrap();
    let controller = FlowController::new(definition);
    assert!(!controller.timer().is_running());

    controller.set_text("user@example.com").unwrap();
    controller.advance().await.unwrap();
    assert_eq!(controller.timer().remaining_ticks(), 30);
    controller.tick();

    controller.back().unwrap();
    assert!(!controller.timer().is_running());
    assert!(controller.snapshot().resend.is_none());

    // Re-entering restarts from the full duration.
    controller.advance().await.unwrap();
    assert_eq!(controller.timer().remaining_ticks(), 30);
}

#[tokio::test]
async fn resend_outcome_after_leaving_step_is_dropped() {
    let resend = GatedAction::new(Outcome::rejected("RateLimited"));
    let definition = FlowDefinition::builder("late_resend")
        .step(StepSpec::identifier("email"))
        .step(StepSpec::code("code", 6).resend(2, resend.clone()))
        .build()
        .unwrap();
    let controller = FlowController::new(definition);
    controller.set_text("user@example.com").unwrap();
    controller.advance().await.unwrap();
    controller.tick();
    controller.tick();

    let pending = tokio::spawn({
        let controller = controller.clone();
        async move { controller.resend().await }
    });
    resend.started().await;

    // Leave and re-enter the step while the resend is in flight.
    controller.back().unwrap();
    assert_eq!(controller.advance().await, Ok(FlowPhase::AtStep(1)));
    assert_eq!(controller.timer().remaining_ticks(), 2);

    resend.release();
    let timer = pending.await.unwrap().unwrap();
    assert!(timer.is_running());
    assert_eq!(timer.remaining_ticks(), 2);
    assert_eq!(controller.state().last_error(), None);
    assert_eq!(controller.timer().remaining_ticks(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn restarted_countdown_ignores_tick_from_previous_step() {
    let clock = Arc::new(ManualClock::new());
    let counter = Arc::new(AtomicUsize::new(0));
    let armed = Arc::new(AtomicBool::new(false));

    // Emits a tick while `advance` holds the flow lock, so the first step's
    // pump is left waiting on that lock across the step change.
    let guard = {
        let clock = clock.clone();
        let armed = armed.clone();
        Guard::custom(move |_, _| {
            if armed.swap(false, Ordering::SeqCst) {
                clock.advance(1);
                std::thread::sleep(Duration::from_millis(200));
            }
            true
        })
    };
    let definition = FlowDefinition::builder("two_countdowns")
        .step(
            StepSpec::identifier("phone")
                .guard(guard)
                .resend(10, counted(counter.clone())),
        )
        .step(StepSpec::code("code", 6).resend(5, counted(counter)))
        .build()
        .unwrap();
    let controller = FlowController::builder(definition)
        .clock(clock.clone())
        .build();

    while clock.active_subscriptions() == 0 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(controller.timer().remaining_ticks(), 10);

    armed.store(true, Ordering::SeqCst);
    assert_eq!(controller.advance().await, Ok(FlowPhase::AtStep(1)));
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(controller.timer().remaining_ticks(), 5);
    assert_eq!(clock.active_subscriptions(), 1);
}
