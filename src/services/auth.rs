use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::JwtConfig;
use crate::models::UserRole;

/// Полезная нагрузка токена.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i64,
    pub role: UserRole,
    pub exp: i64,
}

impl Claims {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("invalid token")]
    Invalid,
    #[error("failed to sign token: {0}")]
    Sign(jsonwebtoken::errors::Error),
}

/// Выпускает HS256-токен на `expires_in_hours` часов.
pub fn issue_token(user_id: i64, role: UserRole, config: &JwtConfig) -> Result<String, TokenError> {
    let claims = Claims {
        user_id,
        role,
        exp: (Utc::now() + Duration::hours(config.expires_in_hours)).timestamp(),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
    .map_err(TokenError::Sign)
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, TokenError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Invalid,
    })
}

/// bcrypt-хеш пароля для новой учётной записи.
pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret".to_string(),
            expires_in_hours: 24,
        }
    }

    #[test]
    fn issued_token_verifies() {
        let token = issue_token(7, UserRole::Admin, &config()).unwrap();
        let claims = verify_token(&token, "test-secret").unwrap();
        assert_eq!(claims.user_id, 7);
        assert!(claims.is_admin());
    }

    #[test]
    fn wrong_secret_is_invalid() {
        let token = issue_token(7, UserRole::User, &config()).unwrap();
        assert!(matches!(verify_token(&token, "other"), Err(TokenError::Invalid)));
        assert!(matches!(verify_token("garbage", "test-secret"), Err(TokenError::Invalid)));
    }

    #[test]
    fn expired_token_is_reported() {
        let stale = JwtConfig {
            expires_in_hours: -2,
            ..config()
        };
        let token = issue_token(7, UserRole::User, &stale).unwrap();
        assert!(matches!(verify_token(&token, "test-secret"), Err(TokenError::Expired)));
    }
}
