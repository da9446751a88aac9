//! REST-клиент сервиса бронирования.
//!
//! Все запросы идут через [`CircuitBreaker`]: сетевые сбои и ответы 5xx
//! считаются отказами, отказы 4xx - нормальной работой сервера.

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::{CircuitBreakerConfig, ClientConfig};
use crate::error::ApiError;
use crate::models::{Booking, BookingReceipt, Event, NewBooking, NotificationPage};
use crate::store::Session;

pub mod auth;
pub mod bookings;
pub mod breaker;
pub mod catalog;
pub mod notifications;

pub use breaker::{CircuitBreaker, CircuitState};
pub use notifications::{NotificationQuery, UnreadCounter};

/// Операции API, нужные оформлению брони.
#[async_trait]
pub trait BookingApi: Send + Sync {
    async fn get_event(&self, event_id: i64) -> Result<Event, ApiError>;

    async fn create_booking(&self, session: &Session, booking: &NewBooking) -> Result<BookingReceipt, ApiError>;

    /// Возвращает сообщение сервера.
    async fn cancel_booking(&self, session: &Session, booking_id: i64) -> Result<String, ApiError>;

    async fn user_bookings(&self, session: &Session) -> Result<Vec<Booking>, ApiError>;
}

/// Операции API над уведомлениями пользователя.
#[async_trait]
pub trait NotificationApi: Send + Sync {
    async fn notifications(&self, session: &Session, query: &NotificationQuery) -> Result<NotificationPage, ApiError>;

    async fn unread_count(&self, session: &Session) -> Result<u64, ApiError>;

    async fn mark_read(&self, session: &Session, notification_id: i64) -> Result<(), ApiError>;

    async fn mark_all_read(&self, session: &Session) -> Result<(), ApiError>;

    async fn delete_notification(&self, session: &Session, notification_id: i64) -> Result<(), ApiError>;
}

// Общая оболочка ответов `{success, message}`; полезная нагрузка не читается.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope {
    #[serde(default = "default_success")]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

fn default_success() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
    breaker: Arc<CircuitBreaker>,
}

impl ApiClient {
    pub fn new(config: &ClientConfig, breaker: &CircuitBreakerConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            base_url: config.api_url.trim_end_matches('/').to_string(),
            http,
            breaker: Arc::new(CircuitBreaker::from_config(breaker)),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn breaker_state(&self) -> (CircuitState, u32) {
        (self.breaker.state(), self.breaker.failure_count())
    }

    pub(crate) fn get(&self, path: &str) -> RequestBuilder {
        self.http.get(self.url(path))
    }

    pub(crate) fn post(&self, path: &str) -> RequestBuilder {
        self.http.post(self.url(path))
    }

    pub(crate) fn put(&self, path: &str) -> RequestBuilder {
        self.http.put(self.url(path))
    }

    pub(crate) fn patch(&self, path: &str) -> RequestBuilder {
        self.http.patch(self.url(path))
    }

    pub(crate) fn delete(&self, path: &str) -> RequestBuilder {
        self.http.delete(self.url(path))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Выполняет запрос и разбирает JSON-ответ.
    pub(crate) async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        self.guarded(async {
            let response = request.send().await?;
            let response = Self::check_status(response).await?;
            Ok(response.json::<T>().await?)
        })
        .await
    }

    /// Запрос с ответом-оболочкой: `success: false` превращается в ошибку.
    pub(crate) async fn send_envelope(&self, request: RequestBuilder) -> Result<Envelope, ApiError> {
        let envelope: Envelope = self.send(request).await?;
        if envelope.success {
            Ok(envelope)
        } else {
            Err(ApiError::Rejected {
                status: StatusCode::OK.as_u16(),
                message: envelope.message.unwrap_or_else(|| "request was rejected".to_string()),
            })
        }
    }

    // Пропускает операцию через выключатель.
    async fn guarded<T, F>(&self, operation: F) -> Result<T, ApiError>
    where
        F: Future<Output = Result<T, ApiError>>,
    {
        if !self.breaker.can_execute() {
            warn!("Circuit breaker is OPEN - blocking API request");
            return Err(ApiError::CircuitOpen);
        }

        let result = operation.await;
        match &result {
            Err(ApiError::Transport(e)) => {
                warn!("API request failed: {}", e);
                self.breaker.record_failure();
            }
            Err(ApiError::Rejected { status, .. }) if *status >= 500 => self.breaker.record_failure(),
            _ => self.breaker.record_success(),
        }
        result
    }

    async fn check_status(response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .ok()
            .and_then(|body| body.message.or(body.error))
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
        debug!("API responded {}: {}", status, message);

        Err(match status {
            StatusCode::UNAUTHORIZED => ApiError::Unauthorized(message),
            StatusCode::FORBIDDEN => ApiError::Forbidden(message),
            StatusCode::NOT_FOUND => ApiError::NotFound(message),
            _ => ApiError::Rejected {
                status: status.as_u16(),
                message,
            },
        })
    }
}
