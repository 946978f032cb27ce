pub mod auth;
pub mod catalog;
pub mod middleware;
pub mod rest;
pub mod sessions;
pub mod state;
pub mod users;

use std::sync::Arc;

use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::error::{ApiError, ApiResult};

pub use middleware::require_auth;
pub use rest::ApiDoc;
pub use state::AppState;

/// Builds the complete application router: public routes, token-protected
/// routes, CORS, request tracing and the Swagger UI.
pub fn router(state: Arc<AppState>) -> ApiResult<Router> {
    let origin = HeaderValue::from_str(&state.config.cors_origin)
        .map_err(|e| ApiError::Internal(format!("Invalid CORS origin: {}", e)))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(rest::health_handler))
        .route("/auth/register", post(auth::register_handler))
        .route("/auth/token", post(auth::token_handler))
        .route("/auth/logout", post(auth::logout_handler))
        .route("/challenges", get(catalog::list_challenges_handler))
        .route("/challenges/{id}", get(catalog::get_challenge_handler))
        .route("/milestones", get(catalog::list_milestones_handler))
        .route("/milestones/{id}", get(catalog::get_milestone_handler))
        .route("/shop/items", get(catalog::list_shop_items_handler))
        .route("/shop/items/{id}", get(catalog::get_shop_item_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/auth/refresh", post(auth::refresh_handler))
        .route(
            "/study-sessions",
            get(sessions::list_sessions_handler).post(sessions::start_session_handler),
        )
        .route(
            "/study-sessions/last-active-session",
            get(sessions::last_active_session_handler),
        )
        .route("/study-sessions/{id}", get(sessions::get_session_handler))
        .route("/study-sessions/{id}/heartbeat", post(sessions::heartbeat_handler))
        .route("/study-sessions/{id}/pause", post(sessions::pause_handler))
        .route("/study-sessions/{id}/resume", post(sessions::resume_handler))
        .route("/study-sessions/{id}/complete", post(sessions::complete_handler))
        .route("/users/me", get(users::me_handler))
        .route("/users/{id}/stats", get(users::stats_handler))
        .route("/users/{id}/stats/update-focus", post(users::update_focus_handler))
        .route("/users/{id}/challenges", get(users::user_challenges_handler))
        .route(
            "/users/{id}/challenges/{challenge_id}/progress",
            post(users::challenge_progress_handler),
        )
        .route("/users/{id}/milestones", get(users::user_milestones_handler))
        .route(
            "/users/{id}/milestones/{milestone_id}/progress",
            post(users::milestone_progress_handler),
        )
        .route(
            "/users/{id}/milestones/{milestone_id}/claim-tier",
            post(users::claim_tier_handler),
        )
        .route(
            "/users/{id}/shop/items/{item_id}/purchase",
            post(users::purchase_handler),
        )
        .route("/users/{id}/blocked-websites", get(users::blocked_websites_handler))
        .route(
            "/users/{id}/blocked-websites/add",
            post(users::add_blocked_website_handler),
        )
        .route(
            "/users/{id}/blocked-websites/remove",
            delete(users::remove_blocked_website_handler),
        )
        .layer(axum_middleware::from_fn_with_state(state.clone(), require_auth));

    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    // Merge the API router with the Swagger UI router for a complete application.
    Ok(Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())))
}
