//! End-to-end runs of the ready-made flows against the in-memory backend.

use std::sync::Arc;
use std::time::Duration;

use stepgate::backend::{BackendCall, InMemoryBackend, WRONG_CODE, WRONG_PASSCODE};
use stepgate::config::EngineConfig;
use stepgate::flows;
use stepgate::{EngineError, ErrorKind, FlowController, FlowPhase};

const PHONE: &str = "+1 555 010 0100";

#[tokio::test]
async fn phone_login_requests_then_verifies() {
    let backend = Arc::new(InMemoryBackend::new("123456"));
    let definition = flows::phone_login(&EngineConfig::default(), backend.clone()).unwrap();
    let controller = FlowController::new(definition);

    controller.set_text(&format!("  {}  ", PHONE)).unwrap();
    assert_eq!(controller.advance().await, Ok(FlowPhase::AtStep(1)));
    assert_eq!(controller.timer().remaining_ticks(), 120);

    controller.paste("123456").unwrap();
    assert_eq!(controller.advance().await, Ok(FlowPhase::Success));

    assert_eq!(
        backend.calls(),
        vec![
            BackendCall::RequestCode {
                identifier: PHONE.to_string()
            },
            BackendCall::VerifyCode {
                identifier: PHONE.to_string(),
                code: "123456".to_string()
            },
        ]
    );
}

#[tokio::test]
async fn phone_login_rejects_short_number() {
    let backend = Arc::new(InMemoryBackend::new("123456"));
    let controller =
        FlowController::new(flows::phone_login(&EngineConfig::default(), backend.clone()).unwrap());

    controller.set_text("555").unwrap();
    assert!(!controller.can_continue());
    assert!(matches!(
        controller.advance().await,
        Err(EngineError::GuardRejected { .. })
    ));
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn phone_login_rejects_number_without_digits() {
    let backend = Arc::new(InMemoryBackend::new("123456"));
    let controller =
        FlowController::new(flows::phone_login(&EngineConfig::default(), backend.clone()).unwrap());

    for value in ["------", "(( ))", "+ (--) --"] {
        controller.set_text(value).unwrap();
        assert!(!controller.can_continue(), "{value:?} should not continue");
        assert!(matches!(
            controller.advance().await,
            Err(EngineError::GuardRejected { .. })
        ));
    }
    assert_eq!(controller.phase(), FlowPhase::AtStep(0));
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn wrong_code_clears_cells_until_attempts_run_out() {
    let mut config = EngineConfig::default();
    config.submit.max_attempts = Some(2);
    let backend = Arc::new(InMemoryBackend::new("123456"));
    let controller = FlowController::new(flows::phone_login(&config, backend).unwrap());

    controller.set_text(PHONE).unwrap();
    controller.advance().await.unwrap();

    controller.paste("654321").unwrap();
    assert_eq!(controller.advance().await, Ok(FlowPhase::AtStep(1)));
    let state = controller.state();
    assert_eq!(state.last_error(), Some(&ErrorKind::rejected(WRONG_CODE)));
    let entry = state.code_entry(flows::CODE).unwrap();
    assert_eq!(entry.filled_count(), 0);
    assert_eq!(entry.focused_index(), Some(0));

    controller.paste("000000").unwrap();
    assert_eq!(
        controller.advance().await,
        Ok(FlowPhase::Failure(ErrorKind::AttemptsExhausted {
            step: flows::CODE.to_string()
        }))
    );
    assert!(!controller.timer().is_running());
}

#[tokio::test]
async fn email_verification_checks_address_shape() {
    let backend = Arc::new(InMemoryBackend::new("123456"));
    let controller = FlowController::new(
        flows::email_verification(&EngineConfig::default(), backend.clone()).unwrap(),
    );

    controller.set_text("not-an-email").unwrap();
    assert!(!controller.can_continue());

    controller.set_text("user@example.com").unwrap();
    assert_eq!(controller.advance().await, Ok(FlowPhase::AtStep(1)));
    controller.paste("123456").unwrap();
    assert_eq!(controller.advance().await, Ok(FlowPhase::Success));
}

#[tokio::test]
async fn passcode_update_requires_matching_confirmation() {
    let backend = Arc::new(InMemoryBackend::new("123456").with_passcode("1234"));
    let controller = FlowController::new(
        flows::passcode_update(&EngineConfig::default(), backend.clone()).unwrap(),
    );

    controller.paste("9999").unwrap();
    assert_eq!(controller.advance().await, Ok(FlowPhase::AtStep(0)));
    assert_eq!(
        controller.state().last_error(),
        Some(&ErrorKind::rejected(WRONG_PASSCODE))
    );
    assert_eq!(controller.state().text(flows::CURRENT), "");

    controller.paste("1234").unwrap();
    assert_eq!(controller.advance().await, Ok(FlowPhase::AtStep(1)));

    // The new passcode must differ from the current one.
    controller.paste("1234").unwrap();
    assert!(!controller.can_continue());
    controller.focus(0).unwrap();
    controller.paste("5678").unwrap();
    assert_eq!(controller.advance().await, Ok(FlowPhase::AtStep(2)));

    controller.paste("5679").unwrap();
    assert_eq!(
        controller.advance().await,
        Err(EngineError::GuardRejected {
            step: flows::CONFIRM.to_string()
        })
    );
    controller.backspace().unwrap();
    controller.set_cell(3, "8").unwrap();
    assert_eq!(controller.advance().await, Ok(FlowPhase::AtStep(3)));
    assert_eq!(backend.passcode(), "5678");

    assert_eq!(controller.advance().await, Ok(FlowPhase::Success));
}

#[tokio::test]
async fn passcode_create_sets_confirmed_value() {
    let backend = Arc::new(InMemoryBackend::new("123456"));
    let controller = FlowController::new(
        flows::passcode_create(&EngineConfig::default(), backend.clone()).unwrap(),
    );

    controller.paste("2468").unwrap();
    controller.advance().await.unwrap();

    // Going back keeps what was typed.
    controller.back().unwrap();
    assert_eq!(controller.state().text(flows::NEW), "2468");
    controller.advance().await.unwrap();

    controller.paste("2468").unwrap();
    assert_eq!(controller.advance().await, Ok(FlowPhase::AtStep(2)));
    assert_eq!(controller.advance().await, Ok(FlowPhase::Success));
    assert_eq!(backend.passcode(), "2468");
}

#[tokio::test]
async fn passcode_reset_verifies_identifier_first() {
    let backend = Arc::new(InMemoryBackend::new("123456").with_passcode("1111"));
    let controller = FlowController::new(
        flows::passcode_reset(&EngineConfig::default(), backend.clone(), backend.clone()).unwrap(),
    );

    controller.set_text("user@example.com").unwrap();
    controller.advance().await.unwrap();
    controller.paste("123456").unwrap();
    assert_eq!(controller.advance().await, Ok(FlowPhase::AtStep(2)));
    controller.paste("4321").unwrap();
    controller.advance().await.unwrap();
    controller.paste("4321").unwrap();
    assert_eq!(controller.advance().await, Ok(FlowPhase::Success));
    assert_eq!(backend.passcode(), "4321");
}

#[tokio::test]
async fn unknown_identifier_stays_on_first_step() {
    let backend = Arc::new(InMemoryBackend::new("123456").with_unknown_identifier("ghost@example.com"));
    let controller = FlowController::new(
        flows::passcode_reset(&EngineConfig::default(), backend.clone(), backend).unwrap(),
    );

    controller.set_text("ghost@example.com").unwrap();
    assert_eq!(controller.advance().await, Ok(FlowPhase::AtStep(0)));
    assert_eq!(
        controller.state().last_error().and_then(|e| e.reason()),
        Some(stepgate::backend::UNKNOWN_IDENTIFIER)
    );
}

#[tokio::test]
async fn account_deletion_deletes_after_code() {
    let backend = Arc::new(InMemoryBackend::new("123456"));
    let controller = FlowController::new(
        flows::account_deletion(
            &EngineConfig::default(),
            backend.clone(),
            backend.clone(),
            "user@example.com",
        )
        .unwrap(),
    );

    assert_eq!(controller.advance().await, Ok(FlowPhase::AtStep(1)));
    controller.paste("111111").unwrap();
    controller.advance().await.unwrap();
    assert!(backend.deleted_accounts().is_empty());

    controller.paste("123456").unwrap();
    assert_eq!(controller.advance().await, Ok(FlowPhase::AtStep(2)));
    assert_eq!(backend.deleted_accounts(), vec!["user@example.com".to_string()]);
    assert_eq!(controller.advance().await, Ok(FlowPhase::Success));
}

#[tokio::test(start_paused = true)]
async fn slow_backend_times_out_with_config() {
    let mut config = EngineConfig::default();
    config.submit.timeout_seconds = 5;
    let backend = Arc::new(InMemoryBackend::new("123456").with_latency(Duration::from_secs(60)));
    let controller = FlowController::builder(flows::phone_login(&config, backend).unwrap())
        .submit_timeout(config.submit.timeout())
        .build();

    controller.set_text(PHONE).unwrap();
    assert_eq!(controller.advance().await, Ok(FlowPhase::AtStep(0)));
    assert_eq!(
        controller.state().last_error(),
        Some(&ErrorKind::rejected("Timeout"))
    );
}
