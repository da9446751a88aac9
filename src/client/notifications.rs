use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, warn};

use super::{ApiClient, NotificationApi};
use crate::config::NotificationsConfig;
use crate::error::ApiError;
use crate::models::NotificationPage;
use crate::store::Session;

/// Параметры выборки уведомлений.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NotificationQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub unread_only: bool,
}

impl NotificationQuery {
    pub fn page(page: u32, per_page: u32) -> Self {
        Self {
            page: Some(page),
            per_page: Some(per_page),
            ..Self::default()
        }
    }

    pub fn unread(mut self) -> Self {
        self.unread_only = true;
        self
    }
}

#[derive(Debug, Deserialize)]
struct UnreadCount {
    count: u64,
}

#[async_trait]
impl NotificationApi for ApiClient {
    async fn notifications(&self, session: &Session, query: &NotificationQuery) -> Result<NotificationPage, ApiError> {
        let request = self
            .get(&format!("/users/{}/notifications", session.user_id))
            .bearer_auth(&session.token)
            .query(query);
        self.send(request).await
    }

    async fn unread_count(&self, session: &Session) -> Result<u64, ApiError> {
        let request = self
            .get(&format!("/users/{}/notifications/unread-count", session.user_id))
            .bearer_auth(&session.token);
        let body: UnreadCount = self.send(request).await?;
        Ok(body.count)
    }

    async fn mark_read(&self, session: &Session, notification_id: i64) -> Result<(), ApiError> {
        let request = self
            .patch(&format!("/notifications/{notification_id}/read"))
            .bearer_auth(&session.token);
        self.send_envelope(request).await?;
        Ok(())
    }

    async fn mark_all_read(&self, session: &Session) -> Result<(), ApiError> {
        let request = self
            .patch(&format!("/users/{}/notifications/mark-all-read", session.user_id))
            .bearer_auth(&session.token);
        self.send_envelope(request).await?;
        Ok(())
    }

    async fn delete_notification(&self, session: &Session, notification_id: i64) -> Result<(), ApiError> {
        let request = self
            .delete(&format!("/notifications/{notification_id}"))
            .bearer_auth(&session.token);
        self.send_envelope(request).await?;
        Ok(())
    }
}

/// Фоновый опрос счётчика непрочитанных уведомлений.
///
/// Останавливается при 401 и при удалении счётчика.
pub struct UnreadCounter {
    count: watch::Receiver<u64>,
    task: JoinHandle<()>,
}

impl UnreadCounter {
    pub fn spawn(api: Arc<dyn NotificationApi>, session: Session, every: Duration) -> Self {
        let (tx, count) = watch::channel(0);

        let task = tokio::spawn(async move {
            let mut ticker = time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match api.unread_count(&session).await {
                    Ok(unread) => {
                        tx.send_replace(unread);
                    }
                    Err(e) if e.is_session_expired() => {
                        warn!("Stopping notification polling for user {}: {}", session.user_id, e);
                        break;
                    }
                    Err(e) => debug!("Unread count poll failed: {}", e),
                }
            }
        });

        Self { count, task }
    }

    pub fn from_config(api: Arc<dyn NotificationApi>, session: Session, config: &NotificationsConfig) -> Self {
        Self::spawn(api, session, config.poll_interval())
    }

    pub fn count(&self) -> u64 {
        *self.count.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.count.clone()
    }

    /// Опрос остановлен (сессия истекла).
    pub fn is_stopped(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for UnreadCounter {
    fn drop(&mut self) {
        self.task.abort();
    }
}
