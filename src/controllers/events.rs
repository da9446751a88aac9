use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use std::sync::Arc;

use super::{ApiRejection, ApiResult};
use crate::models::{EventFilter, Venue};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/events", get(list_events))
        .route("/events/{id}", get(get_event))
        .route("/venues/{id}", get(get_venue))
}

// GET /api/events?type=&status=&search=
async fn list_events(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<EventFilter>,
) -> ApiResult<impl IntoResponse> {
    let events = state
        .cache
        .search_events(&filter)
        .await
        .map_err(|e| ApiRejection::internal("loading events", e))?;
    Ok(Json(events))
}

// GET /api/events/{id}
async fn get_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let event = state
        .cache
        .get_event(id)
        .await
        .map_err(|e| ApiRejection::internal("loading event", e))?
        .ok_or_else(|| ApiRejection::not_found("Event not found"))?;
    Ok(Json(event))
}

// GET /api/venues/{id}
async fn get_venue(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let venue = Venue::find_by_id(id, &state.db)
        .await
        .map_err(|e| ApiRejection::internal("loading venue", e))?
        .ok_or_else(|| ApiRejection::not_found("Venue not found"))?;
    Ok(Json(venue))
}
