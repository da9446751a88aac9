use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::{ApiClient, BookingApi};
use crate::error::ApiError;
use crate::models::{Booking, BookingReceipt, Event, NewBooking};
use crate::store::Session;

// Номер брони приходит в `data` или, у старых версий сервиса, на верхнем уровне.
#[derive(Debug, Deserialize)]
struct CreatedBooking {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    booking_id: Option<i64>,
    #[serde(default)]
    data: Option<BookingReceipt>,
}

#[async_trait]
impl BookingApi for ApiClient {
    async fn get_event(&self, event_id: i64) -> Result<Event, ApiError> {
        let event: Event = self.send(self.get(&format!("/events/{event_id}"))).await?;
        Ok(event.normalized())
    }

    async fn create_booking(&self, session: &Session, booking: &NewBooking) -> Result<BookingReceipt, ApiError> {
        let request = self.post("/bookings").bearer_auth(&session.token).json(booking);
        let created: CreatedBooking = self.send(request).await?;

        let booking_id = created.data.map(|data| data.booking_id).or(created.booking_id);
        let receipt = match booking_id {
            Some(booking_id) if created.success => BookingReceipt { booking_id },
            _ => {
                return Err(ApiError::Rejected {
                    status: 200,
                    message: created
                        .message
                        .unwrap_or_else(|| "booking was not created".to_string()),
                })
            }
        };
        info!("Booking {} created for event {}", receipt.booking_id, booking.event_id);
        Ok(receipt)
    }

    async fn cancel_booking(&self, session: &Session, booking_id: i64) -> Result<String, ApiError> {
        let request = self
            .put(&format!("/bookings/{booking_id}/cancel"))
            .bearer_auth(&session.token)
            .json(&json!({ "user_id": session.user_id }));
        let envelope = self.send_envelope(request).await?;
        Ok(envelope
            .message
            .unwrap_or_else(|| "Booking cancelled successfully".to_string()))
    }

    async fn user_bookings(&self, session: &Session) -> Result<Vec<Booking>, ApiError> {
        let request = self
            .get(&format!("/users/{}/bookings", session.user_id))
            .bearer_auth(&session.token);
        self.send(request).await
    }
}
