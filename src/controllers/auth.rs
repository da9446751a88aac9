use axum::{extract::State, response::IntoResponse, routing::post, Json, Router};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;
use validator::Validate;

use super::{ApiRejection, ApiResult};
use crate::models::{NewNotification, UserRecord};
use crate::services::auth::{hash_password, issue_token};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/login", post(login))
        .route("/register", post(register))
}

// POST /api/login
#[derive(Debug, Deserialize, Validate)]
struct LoginRequest {
    #[validate(length(min = 1, message = "username is required"))]
    username: String,
    #[validate(length(min = 1, message = "password is required"))]
    password: String,
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate()?;

    let record = UserRecord::find_by_username(&req.username, &state.db)
        .await
        .map_err(|e| ApiRejection::internal("login", e))?;

    let Some(record) = record.filter(|r| r.verify_password(&req.password)) else {
        return Err(ApiRejection::unauthorized("Invalid username or password"));
    };

    let user = record.to_user();
    let token = issue_token(user.id, user.role, &state.config.jwt)
        .map_err(|e| ApiRejection::internal("login", e))?;
    info!("User {} logged in", user.id);

    Ok(Json(json!({
        "success": true,
        "user": {
            "id": user.id,
            "username": user.username,
            "email": user.email,
            "role": user.role,
            "token": token,
        }
    })))
}

// POST /api/register
#[derive(Debug, Deserialize, Validate)]
struct RegisterRequest {
    #[validate(length(min = 3, max = 100))]
    username: String,
    #[validate(email)]
    email: String,
    #[validate(length(min = 6, max = 128))]
    password: String,
}

async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate()?;

    let taken = UserRecord::exists(&req.username, &req.email, &state.db)
        .await
        .map_err(|e| ApiRejection::internal("registration", e))?;
    if taken {
        return Err(ApiRejection::bad_request(
            "A user with this username or email already exists",
        ));
    }

    let password_hash = hash_password(&req.password).map_err(|e| ApiRejection::internal("registration", e))?;

    let mut tx = state
        .db
        .pool
        .begin()
        .await
        .map_err(|e| ApiRejection::internal("registration", e))?;
    let user_id = UserRecord::create(&req.username, &req.email, &password_hash, &mut *tx)
        .await
        .map_err(|e| ApiRejection::internal("registration", e))?;
    NewNotification::welcome(user_id)
        .insert(&mut *tx)
        .await
        .map_err(|e| ApiRejection::internal("registration", e))?;
    tx.commit().await.map_err(|e| ApiRejection::internal("registration", e))?;

    info!("User {} registered", user_id);
    Ok(Json(json!({
        "success": true,
        "message": "User registered successfully",
    })))
}
