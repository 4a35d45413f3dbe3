//! Registration and login.

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::auth::{hash_password, verify_password};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use haven_core::User;
use haven_db::generate_user_id;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub user_id: String,
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let email = req.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::InvalidRequest("Invalid email address".to_string()));
    }
    if req.password.len() < 8 {
        return Err(ApiError::InvalidRequest(
            "Password must be at least 8 characters".to_string(),
        ));
    }

    let user = User {
        id: generate_user_id(),
        email: email.clone(),
        password_hash: Some(hash_password(&req.password)?),
        created_at: Utc::now(),
    };

    // Duplicate email trips UNIQUE(email) and maps to 409.
    state.db.users().insert(&user).await.map_err(|e| match e {
        haven_db::DbError::UniqueViolation { .. } => {
            ApiError::Conflict("An account with this email already exists".to_string())
        }
        other => other.into(),
    })?;

    info!(user_id = %user.id, "User registered");

    let access_token = state.jwt.generate_access_token(&user.id, &user.email)?;
    Ok(Json(TokenResponse {
        access_token,
        token_type: "Bearer",
        user_id: user.id,
    }))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let email = req.email.trim().to_lowercase();

    let user = state
        .db
        .users()
        .find_by_email(&email)
        .await?
        .ok_or_else(|| ApiError::AuthFailed("Invalid email or password".to_string()))?;

    // OAuth-only accounts carry no hash and cannot password-login.
    let hash = user
        .password_hash
        .as_deref()
        .ok_or_else(|| ApiError::AuthFailed("Invalid email or password".to_string()))?;

    if !verify_password(&req.password, hash)? {
        return Err(ApiError::AuthFailed("Invalid email or password".to_string()));
    }

    let access_token = state.jwt.generate_access_token(&user.id, &user.email)?;
    Ok(Json(TokenResponse {
        access_token,
        token_type: "Bearer",
        user_id: user.id,
    }))
}
