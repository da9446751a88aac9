use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use std::sync::Arc;

use crate::controllers::ApiRejection;
use crate::models::UserRole;
use crate::services::auth::{verify_token, TokenError};

/// Пользователь из Bearer-токена.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i64,
    pub role: UserRole,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Доступ к чужим данным есть только у администратора.
    pub fn ensure_owner_or_admin(&self, owner_id: i64) -> Result<(), ApiRejection> {
        if self.user_id == owner_id || self.is_admin() {
            Ok(())
        } else {
            Err(ApiRejection::forbidden("Access denied"))
        }
    }
}

// Bearer JWT extractor
impl FromRequestParts<Arc<crate::AppState>> for AuthUser {
    type Rejection = ApiRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<crate::AppState>,
    ) -> Result<Self, Self::Rejection> {
        // Получаем заголовок Authorization
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| ApiRejection::unauthorized("token missing"))?;

        let claims = verify_token(token, &state.config.jwt.secret).map_err(|e| match e {
            TokenError::Expired => ApiRejection::unauthorized("token expired"),
            _ => ApiRejection::unauthorized("invalid token"),
        })?;

        Ok(AuthUser {
            user_id: claims.user_id,
            role: claims.role,
        })
    }
}
