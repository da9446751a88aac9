use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{delete, get, patch},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use super::{ApiRejection, ApiResult};
use crate::middleware::AuthUser;
use crate::models::{Notification, NotificationPage, NotificationRow};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users/{id}/notifications", get(list_notifications))
        .route("/users/{id}/notifications/unread-count", get(unread_count))
        .route("/users/{id}/notifications/mark-all-read", patch(mark_all_read))
        .route("/notifications/{id}/read", patch(mark_read))
        .route("/notifications/{id}", delete(delete_notification))
}

#[derive(Debug, Serialize)]
struct PageResponse {
    success: bool,
    #[serde(flatten)]
    page: NotificationPage,
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    limit: Option<u32>,
    page: Option<u32>,
    per_page: Option<u32>,
    #[serde(default)]
    unread_only: bool,
}

// GET /api/users/{id}/notifications
async fn list_notifications(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(user_id): Path<i64>,
    Query(params): Query<ListQuery>,
) -> ApiResult<impl IntoResponse> {
    user.ensure_owner_or_admin(user_id)?;
    let fail = |e: sqlx::Error| ApiRejection::internal("loading notifications", e);

    let page = params.page.unwrap_or(1).max(1);
    let per_page = params.per_page.unwrap_or(10).clamp(1, 100);
    // limit заменяет пагинацию: первые limit записей
    let (take, offset) = match params.limit.filter(|l| *l > 0) {
        Some(limit) => (i64::from(limit), 0),
        None => (i64::from(per_page), i64::from(page - 1) * i64::from(per_page)),
    };

    let matching: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND (NOT $2 OR read = FALSE)",
    )
    .bind(user_id)
    .bind(params.unread_only)
    .fetch_one(&state.db.pool)
    .await
    .map_err(fail)?;

    let rows = sqlx::query_as::<_, NotificationRow>(
        r#"
        SELECT id, user_id, title, message, notification_type, read, action_link, related_id, created_at
        FROM notifications
        WHERE user_id = $1 AND (NOT $2 OR read = FALSE)
        ORDER BY created_at DESC, id DESC
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(user_id)
    .bind(params.unread_only)
    .bind(take)
    .bind(offset)
    .fetch_all(&state.db.pool)
    .await
    .map_err(fail)?;

    let notifications = rows
        .into_iter()
        .map(NotificationRow::into_notification)
        .collect::<Result<Vec<Notification>, _>>()
        .map_err(|e| ApiRejection::internal("loading notifications", e))?;

    let total = match params.limit.filter(|l| *l > 0) {
        Some(limit) => matching.min(i64::from(limit)),
        None => matching,
    };
    let total = u64::try_from(total).unwrap_or(0);
    let total_pages = u32::try_from(total.div_ceil(u64::from(per_page))).unwrap_or(u32::MAX);

    Ok(Json(PageResponse {
        success: true,
        page: NotificationPage {
            notifications,
            total,
            page,
            per_page,
            total_pages,
        },
    }))
}

// GET /api/users/{id}/notifications/unread-count
async fn unread_count(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(user_id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    user.ensure_owner_or_admin(user_id)?;

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND read = FALSE")
        .bind(user_id)
        .fetch_one(&state.db.pool)
        .await
        .map_err(|e| ApiRejection::internal("counting notifications", e))?;

    Ok(Json(json!({ "success": true, "count": count })))
}

// Владелец уведомления, чтобы проверить права
async fn notification_owner(state: &AppState, id: i64) -> ApiResult<i64> {
    sqlx::query_scalar::<_, i64>("SELECT user_id FROM notifications WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db.pool)
        .await
        .map_err(|e| ApiRejection::internal("loading notification", e))?
        .ok_or_else(|| ApiRejection::not_found("Notification not found"))
}

// PATCH /api/notifications/{id}/read
async fn mark_read(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let owner_id = notification_owner(&state, id).await?;
    user.ensure_owner_or_admin(owner_id)?;

    sqlx::query("UPDATE notifications SET read = TRUE WHERE id = $1")
        .bind(id)
        .execute(&state.db.pool)
        .await
        .map_err(|e| ApiRejection::internal("updating notification", e))?;

    Ok(Json(json!({ "success": true, "message": "Notification marked as read" })))
}

// PATCH /api/users/{id}/notifications/mark-all-read
async fn mark_all_read(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(user_id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    user.ensure_owner_or_admin(user_id)?;

    sqlx::query("UPDATE notifications SET read = TRUE WHERE user_id = $1 AND read = FALSE")
        .bind(user_id)
        .execute(&state.db.pool)
        .await
        .map_err(|e| ApiRejection::internal("updating notifications", e))?;

    Ok(Json(json!({ "success": true, "message": "All notifications marked as read" })))
}

// DELETE /api/notifications/{id}
async fn delete_notification(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let owner_id = notification_owner(&state, id).await?;
    user.ensure_owner_or_admin(owner_id)?;

    sqlx::query("DELETE FROM notifications WHERE id = $1")
        .bind(id)
        .execute(&state.db.pool)
        .await
        .map_err(|e| ApiRejection::internal("deleting notification", e))?;

    Ok(Json(json!({ "success": true, "message": "Notification deleted" })))
}
