pub mod auth;
pub mod bookings;
pub mod events;
pub mod notifications;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json, Router,
};
use serde_json::json;
use std::fmt::Debug;
use std::sync::Arc;

pub fn routes() -> Router<Arc<crate::AppState>> {
    Router::new()
        .merge(auth::routes())
        .merge(events::routes())
        .merge(bookings::routes())
        .merge(notifications::routes())
}

/// Отказ обработчика: `{"success": false, "message": ...}` с кодом ответа.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRejection {
    pub status: StatusCode,
    pub message: String,
}

pub type ApiResult<T> = Result<T, ApiRejection>;

impl ApiRejection {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// 500: подробности только в лог.
    pub fn internal(context: &str, err: impl Debug) -> Self {
        tracing::error!("{} failed: {:?}", context, err);
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, format!("{context} failed"))
    }
}

impl From<validator::ValidationErrors> for ApiRejection {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::bad_request(errors.to_string())
    }
}

impl IntoResponse for ApiRejection {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "success": false, "message": self.message }))).into_response()
    }
}
