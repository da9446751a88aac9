use serde::{Deserialize, Serialize};
use tracing::info;

use super::{ApiClient, Envelope};
use crate::error::ApiError;
use crate::models::User;
use crate::store::Session;

#[derive(Debug, Serialize)]
struct Credentials<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct Registration<'a> {
    username: &'a str,
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginUser {
    #[serde(flatten)]
    user: User,
    token: String,
}

// Ответ `/login`: пользователь лежит в поле `user`, а не в `data`.
#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    user: Option<LoginUser>,
}

impl ApiClient {
    /// Вход. Вызывающий сам сохраняет сессию в `SessionStore`.
    pub async fn login(&self, username: &str, password: &str) -> Result<Session, ApiError> {
        let request = self.post("/login").json(&Credentials { username, password });
        let response: LoginResponse = self.send(request).await?;

        match response.user {
            Some(LoginUser { user, token }) if response.success => {
                info!("User {} logged in", user.id);
                Ok(Session::new(user, token))
            }
            _ => Err(ApiError::Unauthorized(
                response.message.unwrap_or_else(|| "invalid credentials".to_string()),
            )),
        }
    }

    /// Регистрация. Возвращает сообщение сервера; входить нужно отдельно.
    pub async fn register(&self, username: &str, email: &str, password: &str) -> Result<String, ApiError> {
        let request = self.post("/register").json(&Registration {
            username,
            email,
            password,
        });
        let envelope: Envelope = self.send_envelope(request).await?;
        Ok(envelope
            .message
            .unwrap_or_else(|| "User registered successfully".to_string()))
    }
}
