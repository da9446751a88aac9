mod common;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use common::{event, grid, logged_in, seat, session, stores, MockBookingApi, Reply, Stores, USER_ID, VENUE_ID};
use quicket::config::{ClientConfig, PaymentConfig};
use quicket::error::{CheckoutError, ErrorKind, SelectionError, StoreError};
use quicket::reservation::{BookingFlow, CheckoutOutcome, CheckoutPhase, PaymentGate, SelectOutcome};
use quicket::seating::SeatState;
use quicket::store::{KeyValueStore, MemoryStore, ReservationStore, SessionStore};

const EVENT_ID: i64 = 1;

async fn flow(stores: &Stores, api: Arc<MockBookingApi>, available: u32) -> BookingFlow {
    BookingFlow::open(
        api,
        stores.reservations.clone(),
        stores.sessions.clone(),
        event(EVENT_ID, 50, available, 1000.0),
        grid(),
    )
    .await
    .unwrap()
    .with_config(&PaymentConfig::default(), &ClientConfig::default())
}

#[tokio::test(start_paused = true)]
async fn submission_without_session_requires_login() {
    let stores = stores();
    let api = MockBookingApi::new(event(EVENT_ID, 50, 50, 1000.0), Reply::Booked(1));
    let flow = flow(&stores, api.clone(), 50).await;
    flow.select(&seat("1-1")).await.unwrap();

    let err = flow.begin_payment().await.unwrap_err();
    assert!(matches!(err, CheckoutError::LoginRequired));
    assert_eq!(err.login_redirect(), Some(Duration::ZERO));
    assert_eq!(api.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn empty_selection_is_blocked_locally() {
    let stores = logged_in().await;
    let api = MockBookingApi::new(event(EVENT_ID, 50, 50, 1000.0), Reply::Booked(1));
    let flow = flow(&stores, api.clone(), 50).await;

    let err = flow.begin_payment().await.unwrap_err();
    assert!(matches!(err, CheckoutError::EmptySelection));
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(flow.phase(), CheckoutPhase::Idle);
    assert_eq!(api.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn two_seats_cost_two_thousand_and_exceed_one_available() {
    let stores = logged_in().await;
    let api = MockBookingApi::new(event(EVENT_ID, 50, 1, 1000.0), Reply::Booked(1));
    let flow = flow(&stores, api.clone(), 1).await;

    flow.select(&seat("3-4")).await.unwrap();
    flow.select(&seat("3-5")).await.unwrap();
    assert_eq!(flow.total_price().await, 2000.0);

    let err = flow.begin_payment().await.unwrap_err();
    assert!(matches!(
        err,
        CheckoutError::NotEnoughSeats {
            requested: 2,
            available: 1
        }
    ));
    assert_eq!(api.calls(), 0);
    assert_eq!(flow.phase(), CheckoutPhase::Idle);
}

#[tokio::test(start_paused = true)]
async fn cancelled_payment_keeps_draft_and_books_nothing() {
    let stores = logged_in().await;
    let api = MockBookingApi::new(event(EVENT_ID, 50, 50, 1000.0), Reply::Booked(1));
    let flow = flow(&stores, api.clone(), 50).await;
    flow.select(&seat("2-1")).await.unwrap();
    flow.select(&seat("2-2")).await.unwrap();

    let payment = flow.begin_payment().await.unwrap();
    assert_eq!(flow.phase(), CheckoutPhase::AwaitingPayment);
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(payment.cancel());

    let outcome = flow.finish(payment).await.unwrap();
    assert_eq!(outcome, CheckoutOutcome::Cancelled);
    assert_eq!(flow.phase(), CheckoutPhase::Idle);
    assert_eq!(flow.selected_seats().await, vec![seat("2-1"), seat("2-2")]);
    assert_eq!(api.calls(), 0);
    assert!(stores.reservations.load_occupancy(VENUE_ID).await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn abandon_payment_returns_to_idle() {
    let stores = logged_in().await;
    let api = MockBookingApi::new(event(EVENT_ID, 50, 50, 1000.0), Reply::Booked(1));
    let flow = flow(&stores, api.clone(), 50).await;
    flow.select(&seat("1-1")).await.unwrap();

    let payment = flow.begin_payment().await.unwrap();
    flow.abandon_payment(payment).unwrap();

    assert_eq!(flow.phase(), CheckoutPhase::Idle);
    assert_eq!(flow.selected_seats().await, vec![seat("1-1")]);
    assert!(matches!(
        flow.complete_payment().await,
        Err(CheckoutError::NotAwaitingPayment)
    ));
    assert_eq!(api.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn selection_is_locked_while_payment_runs() {
    let stores = logged_in().await;
    let api = MockBookingApi::new(event(EVENT_ID, 50, 50, 1000.0), Reply::Booked(1));
    let flow = flow(&stores, api, 50).await;
    flow.select(&seat("1-1")).await.unwrap();

    let _payment = flow.begin_payment().await.unwrap();
    let err = flow.select(&seat("1-2")).await.unwrap_err();
    assert!(matches!(err, CheckoutError::Selection(SelectionError::Locked)));
    assert!(matches!(
        flow.begin_payment().await,
        Err(CheckoutError::PaymentInProgress)
    ));
}

#[tokio::test(start_paused = true)]
async fn successful_payment_books_and_commits_occupancy() {
    let stores = logged_in().await;
    let api = MockBookingApi::new(event(EVENT_ID, 50, 50, 1000.0), Reply::Booked(42));
    let flow = flow(&stores, api.clone(), 50).await;
    flow.select(&seat("4-1")).await.unwrap();
    flow.select(&seat("4-2")).await.unwrap();

    let payment = flow.begin_payment().await.unwrap();
    let outcome = flow.finish(payment).await.unwrap();

    let CheckoutOutcome::Booked(confirmation) = outcome else {
        panic!("expected a booking, got {outcome:?}");
    };
    assert_eq!(confirmation.booking_id, 42);
    assert_eq!(confirmation.seats, vec![seat("4-1"), seat("4-2")]);
    assert_eq!(confirmation.total_price, 2000.0);
    assert_eq!(flow.phase(), CheckoutPhase::Succeeded);
    assert_eq!(api.calls(), 1);

    let request = api.last_request.lock().unwrap().clone().unwrap();
    assert_eq!(request.user_id, USER_ID);
    assert_eq!(request.seats, 2);
    assert_eq!(request.seat_numbers, Some(vec![seat("4-1"), seat("4-2")]));

    let occupied = stores.reservations.load_occupancy(VENUE_ID).await.unwrap();
    assert!(occupied.contains(&seat("4-1")) && occupied.contains(&seat("4-2")));
    assert!(stores.reservations.load_draft(USER_ID, EVENT_ID).await.unwrap().is_empty());
    assert!(flow.selected_seats().await.is_empty());
    assert_eq!(flow.event().await.available_seats, 48);
    assert_eq!(flow.seat_map().await.seat(&seat("4-1")).unwrap().state, SeatState::Occupied);
}

#[tokio::test(start_paused = true)]
async fn rejected_booking_leaves_draft_and_occupancy_untouched() {
    let stores = logged_in().await;
    let api = MockBookingApi::new(
        event(EVENT_ID, 50, 50, 1000.0),
        Reply::Rejected("Not enough seats. Available: 0".to_string()),
    );
    let flow = flow(&stores, api.clone(), 50).await;
    flow.select(&seat("1-1")).await.unwrap();

    let payment = flow.begin_payment().await.unwrap();
    assert!(payment.confirm());
    let err = flow.finish(payment).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Api);
    assert_eq!(err.to_string(), "Not enough seats. Available: 0");
    assert_eq!(flow.phase(), CheckoutPhase::Idle);
    assert_eq!(flow.selected_seats().await, vec![seat("1-1")]);
    assert_eq!(
        stores.reservations.load_draft(USER_ID, EVENT_ID).await.unwrap(),
        vec![seat("1-1")]
    );
    assert!(stores.reservations.load_occupancy(VENUE_ID).await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn expired_session_is_cleared_and_redirects_to_login() {
    let stores = logged_in().await;
    let api = MockBookingApi::new(
        event(EVENT_ID, 50, 50, 1000.0),
        Reply::Unauthorized("token expired".to_string()),
    );
    let flow = flow(&stores, api.clone(), 50).await;
    flow.select(&seat("1-1")).await.unwrap();

    let payment = flow.begin_payment().await.unwrap();
    payment.confirm();
    let err = flow.finish(payment).await.unwrap_err();

    assert!(matches!(err, CheckoutError::SessionExpired { .. }));
    assert_eq!(err.kind(), ErrorKind::Authorization);
    assert_eq!(err.login_redirect(), Some(Duration::from_millis(2000)));
    assert!(stores.sessions.current().await.unwrap().is_none());
    assert_eq!(flow.selected_seats().await, vec![seat("1-1")]);
    assert!(stores.reservations.load_occupancy(VENUE_ID).await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn concurrent_completion_books_once() {
    let stores = logged_in().await;
    let api = MockBookingApi::slow(
        event(EVENT_ID, 50, 50, 1000.0),
        Reply::Booked(7),
        Duration::from_millis(300),
    );
    let flow = flow(&stores, api.clone(), 50).await;
    flow.select(&seat("5-5")).await.unwrap();

    let _payment = flow.begin_payment().await.unwrap();
    let (first, second) = tokio::join!(flow.complete_payment(), flow.complete_payment());

    let results = [first, second];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(CheckoutError::NotAwaitingPayment))));
    assert_eq!(api.calls(), 1);

    let occupied = stores.reservations.load_occupancy(VENUE_ID).await.unwrap();
    assert_eq!(occupied.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn dropped_completion_returns_to_idle() {
    let stores = logged_in().await;
    let api = MockBookingApi::slow(
        event(EVENT_ID, 50, 50, 1000.0),
        Reply::Booked(7),
        Duration::from_secs(10),
    );
    let flow = flow(&stores, api.clone(), 50).await;
    flow.select(&seat("5-5")).await.unwrap();
    let _payment = flow.begin_payment().await.unwrap();

    let timed_out = tokio::time::timeout(Duration::from_secs(1), flow.complete_payment()).await;
    assert!(timed_out.is_err());
    assert_eq!(flow.phase(), CheckoutPhase::Idle);
    assert_eq!(flow.selected_seats().await, vec![seat("5-5")]);
    assert!(stores.reservations.load_occupancy(VENUE_ID).await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn draft_survives_reopening_the_flow() {
    let stores = logged_in().await;
    let api = MockBookingApi::new(event(EVENT_ID, 50, 50, 1000.0), Reply::Booked(1));
    {
        let flow = flow(&stores, api.clone(), 50).await;
        flow.select(&seat("2-2")).await.unwrap();
    }

    let reopened = flow(&stores, api, 50).await;
    assert_eq!(reopened.selected_seats().await, vec![seat("2-2")]);
}

#[tokio::test(start_paused = true)]
async fn shorter_countdown_books_sooner() {
    let stores = logged_in().await;
    let api = MockBookingApi::new(event(EVENT_ID, 50, 50, 1000.0), Reply::Booked(3));
    let flow = flow(&stores, api.clone(), 50)
        .await
        .with_payment_gate(PaymentGate::new(3, Duration::from_millis(500)));
    flow.select(&seat("1-1")).await.unwrap();

    let started = tokio::time::Instant::now();
    let payment = flow.begin_payment().await.unwrap();
    assert_eq!(payment.remaining(), 3);
    let outcome = flow.finish(payment).await.unwrap();

    assert!(matches!(outcome, CheckoutOutcome::Booked(ref c) if c.booking_id == 3));
    assert_eq!(started.elapsed(), Duration::from_millis(1500));
}

#[tokio::test(start_paused = true)]
async fn abandoned_payment_wait_returns_to_idle_without_booking() {
    let stores = logged_in().await;
    let api = MockBookingApi::new(event(EVENT_ID, 50, 50, 1000.0), Reply::Booked(1));
    let flow = flow(&stores, api.clone(), 50).await;
    flow.select(&seat("1-1")).await.unwrap();

    let payment = flow.begin_payment().await.unwrap();
    let waited = tokio::time::timeout(Duration::from_secs(3), flow.finish(payment)).await;
    assert!(waited.is_err());

    assert_eq!(flow.phase(), CheckoutPhase::Idle);
    assert!(matches!(
        flow.complete_payment().await,
        Err(CheckoutError::NotAwaitingPayment)
    ));
    assert_eq!(flow.select(&seat("1-2")).await.unwrap(), SelectOutcome::Added);
    assert_eq!(flow.selected_seats().await, vec![seat("1-1"), seat("1-2")]);

    let payment = flow.begin_payment().await.unwrap();
    flow.abandon_payment(payment).unwrap();
    assert_eq!(api.calls(), 0);
    assert!(stores.reservations.load_occupancy(VENUE_ID).await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn dropped_payment_session_unlocks_selection() {
    let stores = logged_in().await;
    let api = MockBookingApi::new(event(EVENT_ID, 50, 50, 1000.0), Reply::Booked(1));
    let flow = flow(&stores, api.clone(), 50).await;
    flow.select(&seat("1-1")).await.unwrap();

    let payment = flow.begin_payment().await.unwrap();
    assert_eq!(flow.phase(), CheckoutPhase::AwaitingPayment);
    drop(payment);

    assert_eq!(flow.phase(), CheckoutPhase::Idle);
    assert!(matches!(
        flow.complete_payment().await,
        Err(CheckoutError::NotAwaitingPayment)
    ));
    flow.select(&seat("1-2")).await.unwrap();
    assert_eq!(api.calls(), 0);
}

// Память, в которой запись занятости площадки всегда падает.
struct VenueWritesFail(MemoryStore);

#[async_trait]
impl KeyValueStore for VenueWritesFail {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.0.get(key).await
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        if key.starts_with("venue:") {
            return Err(StoreError::Io(std::io::Error::other("disk full")));
        }
        self.0.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.0.remove(key).await
    }
}

#[tokio::test(start_paused = true)]
async fn booking_stands_when_occupancy_cannot_be_saved() {
    let backend: Arc<dyn KeyValueStore> = Arc::new(VenueWritesFail(MemoryStore::new()));
    let stores = Stores {
        reservations: ReservationStore::new(backend.clone()),
        sessions: SessionStore::new(backend.clone()),
        backend,
    };
    stores.sessions.save(&session()).await.unwrap();
    let api = MockBookingApi::new(event(EVENT_ID, 50, 50, 1000.0), Reply::Booked(9));
    let flow = flow(&stores, api.clone(), 50).await;
    flow.select(&seat("1-1")).await.unwrap();

    let payment = flow.begin_payment().await.unwrap();
    let outcome = flow.finish(payment).await.unwrap();

    let CheckoutOutcome::Booked(confirmation) = outcome else {
        panic!("expected a booking, got {outcome:?}");
    };
    assert_eq!(confirmation.booking_id, 9);
    assert!(confirmation
        .storage_warning
        .as_deref()
        .is_some_and(|w| w.contains("disk full")));
    assert_eq!(flow.phase(), CheckoutPhase::Succeeded);
    assert!(flow.selected_seats().await.is_empty());
    assert!(stores.reservations.load_draft(USER_ID, EVENT_ID).await.unwrap().is_empty());
    assert_eq!(flow.seat_map().await.seat(&seat("1-1")).unwrap().state, SeatState::Occupied);

    assert!(matches!(
        flow.begin_payment().await,
        Err(CheckoutError::EmptySelection)
    ));
    assert!(matches!(
        flow.select(&seat("1-1")).await,
        Err(CheckoutError::Selection(SelectionError::SeatTaken(_)))
    ));
    assert_eq!(api.calls(), 1);
}
