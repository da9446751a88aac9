use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;
use validator::Validate;

use super::{ApiRejection, ApiResult};
use crate::middleware::AuthUser;
use crate::models::{Booking, BookingRow, BookingStatus, NewNotification};
use crate::seating::SeatId;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/bookings", post(create_booking))
        .route("/bookings/{id}/cancel", put(cancel_booking))
        .route("/users/{id}/bookings", get(get_user_bookings))
}

fn one_seat() -> u32 {
    1
}

/* ---------- BOOKINGS ---------- */

// POST /api/bookings
#[derive(Debug, Deserialize, Validate)]
struct CreateBookingRequest {
    #[validate(range(min = 1, message = "event_id is required"))]
    event_id: i64,
    #[serde(default = "one_seat")]
    #[validate(range(min = 1, max = 1000))]
    seats: u32,
    #[serde(default)]
    #[validate(length(min = 1))]
    seat_numbers: Option<Vec<SeatId>>,
}

/// Создание брони. Проверяет только число свободных мест: номера мест
/// сохраняются как есть и не блокируются.
async fn create_booking(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<CreateBookingRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate()?;
    if let Some(numbers) = &req.seat_numbers {
        if numbers.len() != req.seats as usize {
            return Err(ApiRejection::bad_request("seats does not match seat_numbers"));
        }
    }

    let fail = |e: sqlx::Error| ApiRejection::internal("creating booking", e);
    let mut tx = state.db.pool.begin().await.map_err(fail)?;

    // Строка мероприятия блокируется до конца транзакции
    let event: Option<(String, i32)> =
        sqlx::query_as("SELECT title, total_seats FROM events WHERE id = $1 FOR UPDATE")
            .bind(req.event_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(fail)?;
    let Some((title, total_seats)) = event else {
        return Err(ApiRejection::not_found("Event not found"));
    };

    let booked: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(seats), 0)::BIGINT FROM bookings WHERE event_id = $1 AND status = 'confirmed'",
    )
    .bind(req.event_id)
    .fetch_one(&mut *tx)
    .await
    .map_err(fail)?;

    let available = (i64::from(total_seats) - booked).max(0);
    if available < i64::from(req.seats) {
        return Err(ApiRejection::bad_request(format!(
            "Not enough seats. Available: {available}"
        )));
    }

    let seat_numbers: Option<Vec<String>> = req
        .seat_numbers
        .as_ref()
        .map(|ids| ids.iter().map(ToString::to_string).collect());
    let booking_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO bookings (user_id, event_id, seats, seat_numbers, status)
        VALUES ($1, $2, $3, $4, 'confirmed')
        RETURNING id
        "#,
    )
    .bind(user.user_id)
    .bind(req.event_id)
    .bind(req.seats as i32)
    .bind(seat_numbers)
    .fetch_one(&mut *tx)
    .await
    .map_err(fail)?;

    NewNotification::booking_created(user.user_id, booking_id, req.seats, &title)
        .insert(&mut *tx)
        .await
        .map_err(fail)?;
    tx.commit().await.map_err(fail)?;

    state.cache.invalidate_event(req.event_id).await;
    info!(
        "Booking {} created: user {} event {} seats {}",
        booking_id, user.user_id, req.event_id, req.seats
    );

    Ok(Json(json!({
        "success": true,
        "message": "Booking created successfully",
        "booking_id": booking_id,
        "data": { "booking_id": booking_id },
    })))
}

// PUT /api/bookings/{id}/cancel
async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(booking_id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let fail = |e: sqlx::Error| ApiRejection::internal("cancelling booking", e);
    let mut tx = state.db.pool.begin().await.map_err(fail)?;

    let booking: Option<(i64, i64, String, String)> = sqlx::query_as(
        r#"
        SELECT b.user_id, b.event_id, b.status, e.title
        FROM bookings b JOIN events e ON e.id = b.event_id
        WHERE b.id = $1
        FOR UPDATE OF b
        "#,
    )
    .bind(booking_id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(fail)?;
    let Some((owner_id, event_id, status, title)) = booking else {
        return Err(ApiRejection::not_found("Booking not found"));
    };

    user.ensure_owner_or_admin(owner_id)
        .map_err(|_| ApiRejection::forbidden("You are not allowed to cancel this booking"))?;

    let status: BookingStatus = status
        .parse()
        .map_err(|e| ApiRejection::internal("cancelling booking", e))?;
    if !status.can_transition_to(BookingStatus::Cancelled) {
        return Err(ApiRejection::bad_request("Booking is already cancelled"));
    }

    sqlx::query("UPDATE bookings SET status = 'cancelled' WHERE id = $1")
        .bind(booking_id)
        .execute(&mut *tx)
        .await
        .map_err(fail)?;
    NewNotification::booking_cancelled(owner_id, booking_id, &title)
        .insert(&mut *tx)
        .await
        .map_err(fail)?;
    tx.commit().await.map_err(fail)?;

    state.cache.invalidate_event(event_id).await;
    info!("Booking {} cancelled by user {}", booking_id, user.user_id);

    Ok(Json(json!({
        "success": true,
        "message": "Booking cancelled successfully",
    })))
}

// GET /api/users/{id}/bookings
async fn get_user_bookings(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(user_id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    user.ensure_owner_or_admin(user_id)?;

    let rows = BookingRow::for_user(user_id, &state.db)
        .await
        .map_err(|e| ApiRejection::internal("loading bookings", e))?;
    let bookings = rows
        .into_iter()
        .map(BookingRow::into_booking)
        .collect::<Result<Vec<Booking>, _>>()
        .map_err(|e| ApiRejection::internal("loading bookings", e))?;

    Ok(Json(bookings))
}
