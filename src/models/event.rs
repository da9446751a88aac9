use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Postgres, QueryBuilder};
use chrono::NaiveDate;

use super::UnknownVariant;
use crate::database::Database;

wire_enum! {
    /// Тип мероприятия.
    EventType {
        Sport => "sport",
        Concert => "concert",
        Theater => "theater",
        Exhibition => "exhibition",
        Workshop => "workshop",
        Other => "other",
    }
}

wire_enum! {
    EventStatus {
        Upcoming => "upcoming",
        Ongoing => "ongoing",
        Finished => "finished",
        Cancelled => "cancelled",
    }
}

impl Default for EventStatus {
    fn default() -> Self {
        EventStatus::Upcoming
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMedia {
    pub id: i64,
    #[serde(rename = "type")]
    pub media_type: String,
    pub url: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Мероприятие в том виде, в каком его отдаёт `GET /events/{id}`.
///
/// Инвариант `available_seats <= total_seats` держится конструкторами;
/// неотрицательность обеспечивают беззнаковые счётчики.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    pub title: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    #[serde(default)]
    pub status: EventStatus,
    pub venue_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue_name: Option<String>,
    pub date: NaiveDate,
    pub time: String,
    #[serde(default = "default_duration")]
    pub duration: u32,
    pub total_seats: u32,
    pub available_seats: u32,
    pub price: f64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub media: Vec<EventMedia>,
}

fn default_duration() -> u32 {
    60
}

impl Event {
    /// Можно ли сейчас бронировать места.
    pub fn is_bookable(&self) -> bool {
        matches!(self.status, EventStatus::Upcoming | EventStatus::Ongoing) && self.available_seats > 0
    }

    /// Стоимость `seats` мест по текущей цене.
    pub fn total_price(&self, seats: usize) -> f64 {
        self.price * seats as f64
    }

    /// Приводит счётчик свободных мест к инварианту.
    pub fn normalized(mut self) -> Self {
        self.available_seats = self.available_seats.min(self.total_seats);
        self
    }
}

// Строка выборки для сервера: перечисления лежат в БД текстом.
#[derive(Debug, Clone, FromRow)]
pub struct EventRow {
    pub id: i64,
    pub title: String,
    pub event_type: String,
    pub status: String,
    pub venue_id: i64,
    pub venue_name: String,
    pub date: NaiveDate,
    pub time: String,
    pub duration: i32,
    pub total_seats: i32,
    pub available_seats: i64,
    pub price: f64,
    pub description: Option<String>,
}

impl EventRow {
    pub fn into_event(self, media: Vec<EventMedia>) -> Result<Event, UnknownVariant> {
        let total_seats = u32::try_from(self.total_seats).unwrap_or(0);
        // Перебронирование даёт отрицательный остаток - показываем ноль.
        let available_seats = u32::try_from(self.available_seats.max(0)).unwrap_or(u32::MAX);

        Ok(Event {
            id: self.id,
            title: self.title,
            event_type: self.event_type.parse()?,
            status: self.status.parse()?,
            venue_id: self.venue_id,
            venue_name: Some(self.venue_name),
            date: self.date,
            time: self.time,
            duration: u32::try_from(self.duration).unwrap_or(0),
            total_seats,
            available_seats,
            price: self.price,
            description: self.description,
            media,
        }
        .normalized())
    }
}

// Свободные места считаются по сумме мест подтверждённых броней.
const EVENT_SELECT: &str = r#"
    SELECT e.id, e.title, e.event_type, e.status, e.venue_id, v.name AS venue_name,
           e.date, e.time, e.duration, e.total_seats,
           (e.total_seats - COALESCE(SUM(b.seats) FILTER (WHERE b.status = 'confirmed'), 0))::BIGINT
               AS available_seats,
           e.price, e.description
    FROM events e
    JOIN venues v ON v.id = e.venue_id
    LEFT JOIN bookings b ON b.event_id = e.id
"#;

/// Фильтры списка мероприятий.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventFilter {
    #[serde(rename = "type")]
    pub event_type: Option<EventType>,
    pub status: Option<EventStatus>,
    /// Подстрока в названии мероприятия или площадки.
    pub search: Option<String>,
}

impl EventFilter {
    pub fn is_empty(&self) -> bool {
        self.event_type.is_none() && self.status.is_none() && self.search.is_none()
    }
}

impl EventRow {
    pub async fn find_by_id(id: i64, db: &Database) -> Result<Option<EventRow>, sqlx::Error> {
        sqlx::query_as::<_, EventRow>(&format!("{EVENT_SELECT} WHERE e.id = $1 GROUP BY e.id, v.name"))
            .bind(id)
            .fetch_optional(&db.pool)
            .await
    }

    pub async fn list(filter: &EventFilter, db: &Database) -> Result<Vec<EventRow>, sqlx::Error> {
        let mut query = QueryBuilder::<Postgres>::new(EVENT_SELECT);
        query.push(" WHERE TRUE");
        if let Some(event_type) = filter.event_type {
            query.push(" AND e.event_type = ").push_bind(event_type.as_str());
        }
        if let Some(status) = filter.status {
            query.push(" AND e.status = ").push_bind(status.as_str());
        }
        if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
            let pattern = format!("%{}%", search.trim());
            query
                .push(" AND (e.title ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR v.name ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        query.push(" GROUP BY e.id, v.name ORDER BY e.date, e.time");

        query.build_query_as::<EventRow>().fetch_all(&db.pool).await
    }
}

impl EventMedia {
    pub async fn for_event(event_id: i64, db: &Database) -> Result<Vec<EventMedia>, sqlx::Error> {
        let rows: Vec<(i64, String, String, Option<String>)> = sqlx::query_as(
            "SELECT id, media_type, media_url, description FROM event_media WHERE event_id = $1 ORDER BY id",
        )
        .bind(event_id)
        .fetch_all(&db.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, media_type, url, description)| EventMedia {
                id,
                media_type,
                url,
                description,
            })
            .collect())
    }
}
