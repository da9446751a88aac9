#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use quicket::client::BookingApi;
use quicket::error::ApiError;
use quicket::models::{Booking, BookingReceipt, Event, EventStatus, EventType, NewBooking, User, UserRole};
use quicket::seating::{GridLayout, Layout, SeatId, StadiumLayout};
use quicket::store::{KeyValueStore, MemoryStore, ReservationStore, Session, SessionStore};

pub const USER_ID: i64 = 1;
pub const VENUE_ID: i64 = 5;

pub fn event(id: i64, total_seats: u32, available_seats: u32, price: f64) -> Event {
    Event {
        id,
        title: format!("Event {id}"),
        event_type: EventType::Concert,
        status: EventStatus::Upcoming,
        venue_id: VENUE_ID,
        venue_name: Some("Main Hall".to_string()),
        date: NaiveDate::from_ymd_opt(2026, 12, 1).unwrap(),
        time: "19:00".to_string(),
        duration: 120,
        total_seats,
        available_seats,
        price,
        description: None,
        media: Vec::new(),
    }
}

pub fn grid() -> Layout {
    Layout::Grid(GridLayout::default())
}

pub fn stadium() -> Layout {
    Layout::Stadium(StadiumLayout::astana_arena())
}

pub fn seat(id: &str) -> SeatId {
    id.parse().unwrap()
}

pub fn session() -> Session {
    Session::new(
        User {
            id: USER_ID,
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            role: UserRole::User,
        },
        "token-1".to_string(),
    )
}

/// Хранилище в памяти и обёртки над ним.
pub struct Stores {
    pub backend: Arc<dyn KeyValueStore>,
    pub reservations: ReservationStore,
    pub sessions: SessionStore,
}

pub fn stores() -> Stores {
    let backend: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    Stores {
        reservations: ReservationStore::new(backend.clone()),
        sessions: SessionStore::new(backend.clone()),
        backend,
    }
}

pub async fn logged_in() -> Stores {
    let stores = stores();
    stores.sessions.save(&session()).await.unwrap();
    stores
}

/// Пишет запись занятости площадки напрямую в хранилище.
pub async fn occupy(backend: &Arc<dyn KeyValueStore>, venue_id: i64, seats: &[&str]) {
    let record = serde_json::json!({
        "venue_id": venue_id,
        "occupiedSeats": seats,
        "updated_at": "2026-01-01T00:00:00Z",
    });
    backend
        .set(&ReservationStore::occupancy_key(venue_id), record.to_string())
        .await
        .unwrap();
}

#[derive(Debug, Clone)]
pub enum Reply {
    Booked(i64),
    Rejected(String),
    Unauthorized(String),
}

/// Поддельный API: считает вызовы и отвечает заданным образом.
pub struct MockBookingApi {
    pub create_calls: AtomicUsize,
    pub reply: Mutex<Reply>,
    pub event: Mutex<Event>,
    pub last_request: Mutex<Option<NewBooking>>,
    pub delay: Duration,
}

impl MockBookingApi {
    pub fn new(event: Event, reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            create_calls: AtomicUsize::new(0),
            reply: Mutex::new(reply),
            event: Mutex::new(event),
            last_request: Mutex::new(None),
            delay: Duration::ZERO,
        })
    }

    pub fn slow(event: Event, reply: Reply, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            create_calls: AtomicUsize::new(0),
            reply: Mutex::new(reply),
            event: Mutex::new(event),
            last_request: Mutex::new(None),
            delay,
        })
    }

    pub fn calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BookingApi for MockBookingApi {
    async fn get_event(&self, _event_id: i64) -> Result<Event, ApiError> {
        Ok(self.event.lock().unwrap().clone())
    }

    async fn create_booking(&self, _session: &Session, booking: &NewBooking) -> Result<BookingReceipt, ApiError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(booking.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let reply = self.reply.lock().unwrap().clone();
        match reply {
            Reply::Booked(booking_id) => {
                let mut event = self.event.lock().unwrap();
                event.available_seats = event.available_seats.saturating_sub(booking.seats);
                Ok(BookingReceipt { booking_id })
            }
            Reply::Rejected(message) => Err(ApiError::Rejected { status: 400, message }),
            Reply::Unauthorized(message) => Err(ApiError::Unauthorized(message)),
        }
    }

    async fn cancel_booking(&self, _session: &Session, _booking_id: i64) -> Result<String, ApiError> {
        Ok("Booking cancelled successfully".to_string())
    }

    async fn user_bookings(&self, _session: &Session) -> Result<Vec<Booking>, ApiError> {
        Ok(Vec::new())
    }
}
