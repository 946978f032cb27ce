//! services/api/src/web/rest.rs
//!
//! Contains the health endpoint and the master definition for the OpenAPI
//! specification.

use axum::response::Json;
use serde::Serialize;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, ToSchema};

use crate::web::{auth, catalog, sessions, users};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        auth::register_handler,
        auth::token_handler,
        auth::logout_handler,
        auth::refresh_handler,
        sessions::list_sessions_handler,
        sessions::start_session_handler,
        sessions::last_active_session_handler,
        sessions::get_session_handler,
        sessions::heartbeat_handler,
        sessions::pause_handler,
        sessions::resume_handler,
        sessions::complete_handler,
        users::me_handler,
        users::stats_handler,
        users::update_focus_handler,
        users::user_challenges_handler,
        users::challenge_progress_handler,
        users::user_milestones_handler,
        users::milestone_progress_handler,
        users::claim_tier_handler,
        users::purchase_handler,
        users::blocked_websites_handler,
        users::add_blocked_website_handler,
        users::remove_blocked_website_handler,
        catalog::list_challenges_handler,
        catalog::get_challenge_handler,
        catalog::list_milestones_handler,
        catalog::get_milestone_handler,
        catalog::list_shop_items_handler,
        catalog::get_shop_item_handler,
    ),
    components(
        schemas(
            HealthResponse,
            auth::RegisterRequest,
            auth::RegisterResponse,
            auth::TokenRequest,
            auth::TokenResponse,
            sessions::TaskInput,
            sessions::CreateSessionRequest,
            sessions::CompleteSessionRequest,
            users::FocusTimeRequest,
            users::ProgressRequest,
            users::ClaimTierRequest,
            users::WebsiteRequest,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Study Shield API", description = "Focus sessions, streaks and rewards.")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

//=========================================================================================
// Health
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    status: String,
}

/// Liveness check.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_lists_routes_and_bearer_scheme() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/study-sessions/{id}/complete"));
        assert!(doc.paths.paths.contains_key("/users/{id}/milestones/{milestone_id}/claim-tier"));
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer"));
    }
}
