//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for registration, token issuance, and logout.

use axum::{
    extract::{Extension, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use study_shield_core::{AuthToken, CoreError, PortError, User};
use tracing::{error, info};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::web::middleware::extract_token;
use crate::web::state::AppState;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct TokenRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub email: String,
}

#[derive(Serialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
}

//=========================================================================================
// Helpers
//=========================================================================================

fn hash_password(password: &str) -> ApiResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            ApiError::Internal("Failed to hash password".to_string())
        })
}

fn verify_password(password: &str, hashed: &str) -> ApiResult<bool> {
    let parsed_hash = PasswordHash::new(hashed).map_err(|e| {
        error!("Failed to parse password hash: {:?}", e);
        ApiError::Internal("Authentication error".to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Builds and persists a new opaque token for `user_id`.
async fn issue_token(state: &AppState, user_id: Uuid) -> ApiResult<AuthToken> {
    let token = AuthToken {
        token: Uuid::new_v4().simple().to_string(),
        user_id,
        expires_at: state.clock.now() + Duration::days(state.config.auth_token_ttl_days),
    };
    state
        .store
        .create_auth_token(&token.token, token.user_id, token.expires_at)
        .await?;
    Ok(token)
}

/// The token body plus a matching `session` cookie.
fn token_response(state: &AppState, token: AuthToken) -> impl IntoResponse {
    let cookie = format!(
        "session={}; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={}",
        token.token,
        Duration::days(state.config.auth_token_ttl_days).num_seconds()
    );
    (
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(TokenResponse {
            access_token: token.token,
            token_type: "bearer".to_string(),
            expires_at: token.expires_at,
        }),
    )
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/register - Create a new user account
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created successfully", body = RegisterResponse),
        (status = 400, description = "Invalid request or email already registered"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    let email = req.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::BadRequest("A valid email is required".to_string()));
    }
    if req.password.is_empty() {
        return Err(ApiError::BadRequest("Password must not be empty".to_string()));
    }

    match state.store.get_credentials_by_email(&email).await {
        Ok(_) => return Err(ApiError::BadRequest("Email already registered".to_string())),
        Err(PortError::NotFound(_)) => {}
        Err(e) => return Err(e.into()),
    }

    let password_hash = hash_password(&req.password)?;
    let user = User::new(req.name.trim(), email, state.clock.now());
    let user = state.store.create_user(user, &password_hash).await?;

    info!(user_id = %user.id, "User registered");
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user_id: user.id,
            email: user.email,
        }),
    ))
}

/// POST /auth/token - Exchange credentials for a bearer token
#[utoipa::path(
    post,
    path = "/auth/token",
    request_body = TokenRequest,
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn token_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TokenRequest>,
) -> ApiResult<impl IntoResponse> {
    let creds = match state.store.get_credentials_by_email(req.email.trim()).await {
        Ok(creds) => creds,
        Err(PortError::NotFound(_)) => return Err(CoreError::Unauthorized.into()),
        Err(e) => return Err(e.into()),
    };
    if !verify_password(&req.password, &creds.hashed_password)? {
        return Err(CoreError::Unauthorized.into());
    }

    let mut user = state.store.get_user(creds.user_id).await?;
    user.last_login = Some(state.clock.now());
    state.store.save_user(&user).await?;

    let token = issue_token(&state, creds.user_id).await?;
    info!(user_id = %creds.user_id, "Token issued");
    Ok(token_response(&state, token))
}

/// POST /auth/refresh - Swap the presented token for a fresh one
#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "Token refreshed; the old token is revoked", body = TokenResponse),
        (status = 401, description = "Missing, invalid or expired token"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer" = []))
)]
pub async fn refresh_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    headers: HeaderMap,
) -> ApiResult<impl IntoResponse> {
    let old = extract_token(&headers).ok_or(CoreError::Unauthorized)?;
    let token = issue_token(&state, user_id).await?;
    state.store.delete_auth_token(&old).await?;

    info!(user_id = %user_id, "Token refreshed");
    Ok(token_response(&state, token))
}

/// POST /auth/logout - Revoke the presented token
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logout successful"),
        (status = 401, description = "No token presented")
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<impl IntoResponse> {
    let token = extract_token(&headers).ok_or(CoreError::Unauthorized)?;
    state.store.delete_auth_token(&token).await?;

    let cookie = "session=; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age=0";
    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie.to_string())]))
}
