//! User registration and authentication endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use common::UserId;
use serde::{Deserialize, Serialize};
use store::{NewUser, ShopStore, User};

use crate::auth::{AuthUser, hash_password, verify_password};
use crate::error::ApiError;
use crate::routes::AppState;

// -- Request types --

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

// -- Response types --

#[derive(Serialize)]
pub struct UserResponse {
    pub id: UserId,
    pub username: String,
    pub email: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
        }
    }
}

#[derive(Serialize)]
pub struct RegisterResponse {
    pub message: String,
    pub user: UserResponse,
}

#[derive(Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
}

// -- Handlers --

/// POST /auth/register — create a new user account.
#[tracing::instrument(skip(state, req), fields(email = %req.email))]
pub async fn register<S: ShopStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    if req.username.trim().is_empty() || req.email.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::BadRequest(
            "username, email and password are required".to_string(),
        ));
    }

    let password_hash = hash_password(req.password).await?;
    let user = state
        .store
        .insert_user(NewUser {
            username: req.username,
            email: req.email,
            password_hash,
        })
        .await?;

    let response = RegisterResponse {
        message: format!("User {} registered successfully", user.username),
        user: user.into(),
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /auth/login — verify credentials and issue an access token.
#[tracing::instrument(skip(state, req), fields(email = %req.email))]
pub async fn login<S: ShopStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let user = state
        .store
        .find_user_by_email(&req.email)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("invalid credentials".to_string()))?;

    if !verify_password(req.password, user.password_hash).await? {
        return Err(ApiError::Unauthorized("invalid credentials".to_string()));
    }

    Ok(Json(TokenResponse {
        access_token: state.auth.issue(user.id)?,
        token_type: "bearer",
    }))
}

/// GET /auth/me — profile of the authenticated user.
#[tracing::instrument(skip(state))]
pub async fn me<S: ShopStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state
        .store
        .get_user(user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("unknown user".to_string()))?;

    Ok(Json(user.into()))
}
