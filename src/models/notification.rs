use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use chrono::NaiveDateTime;

use super::booking::wire_datetime;
use super::UnknownVariant;

wire_enum! {
    NotificationType {
        BookingCreated => "booking_created",
        BookingCancelled => "booking_cancelled",
        BookingReminder => "booking_reminder",
        EventUpdated => "event_updated",
        EventCancelled => "event_cancelled",
        SystemMessage => "system_message",
    }
}

/// Уведомление пользователя. Флаг `read` меняется только в одну сторону.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    #[serde(default)]
    pub user_id: Option<i64>,
    pub title: String,
    pub message: String,
    pub notification_type: NotificationType,
    pub read: bool,
    #[serde(default)]
    pub action_link: Option<String>,
    #[serde(default)]
    pub related_id: Option<i64>,
    #[serde(with = "wire_datetime")]
    pub created_at: NaiveDateTime,
}

impl Notification {
    /// Отметить прочитанным. Возвращает `true`, если флаг изменился.
    pub fn mark_read(&mut self) -> bool {
        !std::mem::replace(&mut self.read, true)
    }
}

/// Страница из `GET /users/{id}/notifications`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationPage {
    pub notifications: Vec<Notification>,
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u32,
}

#[derive(Debug, Clone, FromRow)]
pub struct NotificationRow {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub message: String,
    pub notification_type: String,
    pub read: bool,
    pub action_link: Option<String>,
    pub related_id: Option<i64>,
    pub created_at: NaiveDateTime,
}

impl NotificationRow {
    pub fn into_notification(self) -> Result<Notification, UnknownVariant> {
        Ok(Notification {
            id: self.id,
            user_id: Some(self.user_id),
            title: self.title,
            message: self.message,
            notification_type: self.notification_type.parse()?,
            read: self.read,
            action_link: self.action_link,
            related_id: self.related_id,
            created_at: self.created_at,
        })
    }
}

/// Новое уведомление; пишется в той же транзакции, что и событие-источник.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: i64,
    pub title: String,
    pub message: String,
    pub notification_type: NotificationType,
    pub related_id: Option<i64>,
    pub action_link: Option<String>,
}

impl NewNotification {
    pub fn welcome(user_id: i64) -> Self {
        Self {
            user_id,
            title: "Welcome to Quicket!".to_string(),
            message: "Thank you for signing up. You can now book tickets for events.".to_string(),
            notification_type: NotificationType::SystemMessage,
            related_id: None,
            action_link: None,
        }
    }

    pub fn booking_created(user_id: i64, booking_id: i64, seats: u32, event_title: &str) -> Self {
        Self {
            user_id,
            title: "Booking created".to_string(),
            message: format!("You have booked {seats} seats for '{event_title}'."),
            notification_type: NotificationType::BookingCreated,
            related_id: Some(booking_id),
            action_link: Some("/bookings".to_string()),
        }
    }

    pub fn booking_cancelled(user_id: i64, booking_id: i64, event_title: &str) -> Self {
        Self {
            user_id,
            title: "Booking cancelled".to_string(),
            message: format!("Your booking for '{event_title}' has been cancelled."),
            notification_type: NotificationType::BookingCancelled,
            related_id: Some(booking_id),
            action_link: None,
        }
    }

    pub async fn insert<'e, E>(&self, executor: E) -> Result<i64, sqlx::Error>
    where
        E: sqlx::PgExecutor<'e>,
    {
        sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO notifications (user_id, title, message, notification_type, action_link, related_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(self.user_id)
        .bind(&self.title)
        .bind(&self.message)
        .bind(self.notification_type.as_str())
        .bind(&self.action_link)
        .bind(self.related_id)
        .fetch_one(executor)
        .await
    }
}
