use std::time::Duration;

use quicket::config::PaymentConfig;
use quicket::reservation::{PaymentGate, PaymentOutcome};

#[tokio::test(start_paused = true)]
async fn countdown_expiry_succeeds_after_all_ticks() {
    let gate = PaymentGate::from_config(&PaymentConfig::default());
    assert_eq!(gate.countdown(), 20);

    let session = gate.start();
    let mut remaining = session.subscribe();
    assert_eq!(session.remaining(), 20);

    let started = tokio::time::Instant::now();
    let outcome = session.outcome().await;

    assert_eq!(outcome, PaymentOutcome::Succeeded);
    assert_eq!(started.elapsed(), Duration::from_secs(20));
    assert_eq!(*remaining.borrow_and_update(), 0);
}

#[tokio::test(start_paused = true)]
async fn remaining_ticks_are_observable() {
    let session = PaymentGate::new(5, Duration::from_secs(1)).start();
    let mut remaining = session.subscribe();

    remaining.changed().await.unwrap();
    assert_eq!(*remaining.borrow(), 4);
    remaining.changed().await.unwrap();
    assert_eq!(*remaining.borrow(), 3);

    assert!(session.cancel());
    assert_eq!(session.outcome().await, PaymentOutcome::Cancelled);
}

#[tokio::test(start_paused = true)]
async fn manual_confirmation_resolves_early() {
    let session = PaymentGate::new(20, Duration::from_secs(1)).start();
    let control = session.control();

    tokio::time::sleep(Duration::from_secs(3)).await;
    assert!(control.confirm());

    let started = tokio::time::Instant::now();
    assert_eq!(session.outcome().await, PaymentOutcome::Succeeded);
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn resolves_only_once() {
    let session = PaymentGate::new(20, Duration::from_secs(1)).start();
    let control = session.control();

    assert!(control.cancel());
    assert_eq!(session.outcome().await, PaymentOutcome::Cancelled);

    // Сессия уже завершилась: повторные сигналы никуда не доходят.
    assert!(!control.confirm());
    assert!(!control.cancel());
}

#[tokio::test(start_paused = true)]
async fn dropping_the_session_stops_the_countdown() {
    let session = PaymentGate::new(20, Duration::from_secs(1)).start();
    let control = session.control();
    let mut remaining = session.subscribe();
    drop(session);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(!control.confirm());
    assert!(remaining.changed().await.is_err());
}
