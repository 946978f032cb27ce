//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::debug;

use crate::error::ApiError;
use crate::web::state::AppState;
use study_shield_core::{CoreError, PortError};

/// Pulls the opaque token from `Authorization: Bearer ...`, falling back to
/// the `session` cookie.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());
    if bearer.is_some() {
        return bearer;
    }

    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())?
        .split(';')
        .find_map(|c| c.trim().strip_prefix("session="))
        .map(str::to_string)
        .filter(|t| !t.is_empty())
}

/// Middleware that validates the caller's token and extracts the user_id.
///
/// If valid, inserts the user_id into request extensions for handlers to use.
/// If invalid or missing, returns 401 Unauthorized.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_token(req.headers()).ok_or(CoreError::Unauthorized)?;

    let user_id = state
        .store
        .validate_auth_token(&token, state.clock.now())
        .await
        .map_err(|e| match e {
            PortError::Unauthorized | PortError::NotFound(_) => {
                debug!("Rejected auth token: {:?}", e);
                ApiError::from(CoreError::Unauthorized)
            }
            other => ApiError::from(other),
        })?;

    req.extensions_mut().insert(user_id);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; session=cookie-token"));
        assert_eq!(extract_token(&headers).as_deref(), Some("cookie-token"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer header-token"));
        assert_eq!(extract_token(&headers).as_deref(), Some("header-token"));
    }

    #[test]
    fn missing_or_empty_token_is_none() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_token(&headers), None);
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(extract_token(&headers), None);
    }
}
