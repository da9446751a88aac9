use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use super::KeyValueStore;
use crate::error::{AuthError, StoreError};
use crate::models::{User, UserRole};

const SESSION_KEY: &str = "session";

/// Текущий пользователь и его токен.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: i64,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    pub role: UserRole,
    pub token: String,
}

impl Session {
    pub fn new(user: User, token: String) -> Self {
        Self {
            user_id: user.id,
            username: user.username,
            email: Some(user.email),
            role: user.role,
            token,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// Держатель сессии: переживает перезапуск клиента.
#[derive(Clone)]
pub struct SessionStore {
    backend: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    pub async fn current(&self) -> Result<Option<Session>, StoreError> {
        let Some(raw) = self.backend.get(SESSION_KEY).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                warn!("Dropping unreadable session record: {}", e);
                self.backend.remove(SESSION_KEY).await?;
                Ok(None)
            }
        }
    }

    pub async fn save(&self, session: &Session) -> Result<(), StoreError> {
        self.backend.set(SESSION_KEY, serde_json::to_string(session)?).await?;
        info!("Session stored for user {}", session.user_id);
        Ok(())
    }

    /// Выход или истечение сессии.
    pub async fn clear(&self) -> Result<(), StoreError> {
        self.backend.remove(SESSION_KEY).await
    }

    /// Защищённые операции: без сессии - на страницу входа.
    pub async fn require(&self) -> Result<Session, AuthError> {
        self.current().await?.ok_or(AuthError::NotAuthenticated)
    }

    /// Административные операции.
    pub async fn require_admin(&self) -> Result<Session, AuthError> {
        let session = self.require().await?;
        if session.is_admin() {
            Ok(session)
        } else {
            Err(AuthError::AdminRequired)
        }
    }
}
