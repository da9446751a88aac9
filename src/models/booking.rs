use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use chrono::{NaiveDate, NaiveDateTime};

use super::UnknownVariant;
use crate::database::Database;
use crate::seating::SeatId;

wire_enum! {
    /// Статус бронирования. Переход только `confirmed -> cancelled`.
    BookingStatus {
        Confirmed => "confirmed",
        Cancelled => "cancelled",
    }
}

impl BookingStatus {
    pub fn can_transition_to(self, next: BookingStatus) -> bool {
        matches!((self, next), (BookingStatus::Confirmed, BookingStatus::Cancelled))
    }
}

/// Бронирование из `GET /users/{id}/bookings`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: i64,
    #[serde(default)]
    pub user_id: Option<i64>,
    pub event_id: i64,
    pub seats: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seat_numbers: Option<Vec<SeatId>>,
    pub status: BookingStatus,
    pub total_price: f64,
    #[serde(with = "wire_datetime")]
    pub created_at: NaiveDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue_name: Option<String>,
}

impl Booking {
    pub fn is_active(&self) -> bool {
        self.status == BookingStatus::Confirmed
    }
}

/// Тело `POST /bookings`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBooking {
    pub user_id: i64,
    pub event_id: i64,
    pub seats: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seat_numbers: Option<Vec<SeatId>>,
}

impl NewBooking {
    /// Бронь конкретных мест: количество берётся из списка.
    pub fn for_seats(user_id: i64, event_id: i64, seats: Vec<SeatId>) -> Self {
        Self {
            user_id,
            event_id,
            seats: u32::try_from(seats.len()).unwrap_or(u32::MAX),
            seat_numbers: Some(seats),
        }
    }
}

/// Поле `data` успешного ответа на создание брони.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingReceipt {
    pub booking_id: i64,
}

// Строка выборки броней пользователя вместе с данными мероприятия.
#[derive(Debug, Clone, FromRow)]
pub struct BookingRow {
    pub id: i64,
    pub user_id: i64,
    pub event_id: i64,
    pub seats: i32,
    pub seat_numbers: Option<Vec<String>>,
    pub status: String,
    pub total_price: f64,
    pub created_at: NaiveDateTime,
    pub event_title: String,
    pub event_date: NaiveDate,
    pub event_time: String,
    pub venue_name: String,
}

impl BookingRow {
    pub async fn for_user(user_id: i64, db: &Database) -> Result<Vec<BookingRow>, sqlx::Error> {
        sqlx::query_as::<_, BookingRow>(
            r#"
            SELECT b.id, b.user_id, b.event_id, b.seats, b.seat_numbers, b.status,
                   b.seats * e.price AS total_price, b.created_at,
                   e.title AS event_title, e.date AS event_date, e.time AS event_time,
                   v.name AS venue_name
            FROM bookings b
            JOIN events e ON e.id = b.event_id
            JOIN venues v ON v.id = e.venue_id
            WHERE b.user_id = $1
            ORDER BY e.date, e.time, b.id
            "#,
        )
        .bind(user_id)
        .fetch_all(&db.pool)
        .await
    }

    pub fn into_booking(self) -> Result<Booking, UnknownVariant> {
        // Нераспознанные номера мест пропускаем: бронь от этого не становится недействительной.
        let seat_numbers = self
            .seat_numbers
            .map(|ids| ids.iter().filter_map(|id| id.parse().ok()).collect());

        Ok(Booking {
            id: self.id,
            user_id: Some(self.user_id),
            event_id: self.event_id,
            seats: u32::try_from(self.seats).unwrap_or(0),
            seat_numbers,
            status: self.status.parse()?,
            total_price: self.total_price,
            created_at: self.created_at,
            event_title: Some(self.event_title),
            event_date: Some(self.event_date.format("%Y-%m-%d").to_string()),
            event_time: Some(self.event_time),
            venue_name: Some(self.venue_name),
        })
    }
}

// Формат дат в ответах API: "%Y-%m-%d %H:%M:%S".
pub(crate) mod wire_datetime {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&value.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, FORMAT).map_err(serde::de::Error::custom)
    }
}
