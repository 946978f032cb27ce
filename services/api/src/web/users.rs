//! services/api/src/web/users.rs
//!
//! Handlers for the `/users` resource: profile, stats, rewards, purchases and
//! the blocked-website list. Every `/users/{id}` route is restricted to the
//! caller's own id.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use study_shield_core::progression::{ChallengeOutcome, ClaimOutcome, PurchaseReceipt};
use study_shield_core::{parse_id, ChallengeProgress, MilestoneProgress, StudyStat, User};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::web::state::AppState;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct FocusTimeRequest {
    pub minutes: u32,
}

#[derive(Deserialize, ToSchema)]
pub struct ProgressRequest {
    pub progress: i64,
}

#[derive(Deserialize, ToSchema)]
pub struct ClaimTierRequest {
    /// One of bronze, silver, gold, platinum.
    pub tier_name: String,
}

#[derive(Deserialize, ToSchema)]
pub struct WebsiteRequest {
    pub website: String,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct WebsiteQuery {
    pub website: String,
}

/// Streak and focus-time figures for one user.
#[derive(Serialize)]
pub struct StatsView {
    pub coins: i64,
    pub day_streak: u32,
    pub longest_streak: u32,
    pub streak_multiplier: f64,
    pub total_focus_time: u64,
    pub weekly_focus_time: u64,
    pub today_focus_time: u64,
    pub monthly_focus_time: u64,
    pub study_stats: Vec<StudyStat>,
}

impl From<User> for StatsView {
    fn from(user: User) -> Self {
        Self {
            coins: user.coins,
            day_streak: user.day_streak,
            longest_streak: user.longest_streak,
            streak_multiplier: user.streak_multiplier,
            total_focus_time: user.total_focus_time,
            weekly_focus_time: user.weekly_focus_time,
            today_focus_time: user.today_focus_time,
            monthly_focus_time: user.monthly_focus_time,
            study_stats: user.study_stats,
        }
    }
}

#[derive(Serialize)]
pub struct BlockedWebsites {
    pub blocked_websites: Vec<String>,
}

//=========================================================================================
// Profile and Stats
//=========================================================================================

/// The caller's profile, with streak and rollups recomputed.
#[utoipa::path(
    get,
    path = "/users/me",
    responses(
        (status = 200, description = "The caller's profile"),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer" = []))
)]
pub async fn me_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Uuid>,
) -> ApiResult<Json<User>> {
    Ok(Json(state.progression.profile(caller).await?))
}

#[utoipa::path(
    get,
    path = "/users/{id}/stats",
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "Streak and focus-time figures"),
        (status = 403, description = "Not the caller's own id")
    ),
    security(("bearer" = []))
)]
pub async fn stats_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Uuid>,
    Path(id): Path<String>,
) -> ApiResult<Json<StatsView>> {
    let user_id = parse_id(&id, "user")?;
    let user = state.ledger.load_own(caller, user_id).await?;
    Ok(Json(user.into()))
}

/// Add focus minutes to today's stat and refresh the streak.
#[utoipa::path(
    post,
    path = "/users/{id}/stats/update-focus",
    params(("id" = String, Path, description = "User id")),
    request_body = FocusTimeRequest,
    responses(
        (status = 200, description = "Updated figures"),
        (status = 403, description = "Not the caller's own id")
    ),
    security(("bearer" = []))
)]
pub async fn update_focus_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Uuid>,
    Path(id): Path<String>,
    Json(req): Json<FocusTimeRequest>,
) -> ApiResult<Json<StatsView>> {
    let user_id = parse_id(&id, "user")?;
    let user = state
        .progression
        .update_focus_time(caller, user_id, req.minutes)
        .await?;
    Ok(Json(user.into()))
}

//=========================================================================================
// Challenges and Milestones
//=========================================================================================

#[utoipa::path(
    get,
    path = "/users/{id}/challenges",
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "The user's challenge progress"),
        (status = 403, description = "Not the caller's own id")
    ),
    security(("bearer" = []))
)]
pub async fn user_challenges_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Uuid>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<ChallengeProgress>>> {
    let user_id = parse_id(&id, "user")?;
    let user = state.ledger.load_own(caller, user_id).await?;
    Ok(Json(user.challenges))
}

#[utoipa::path(
    post,
    path = "/users/{id}/challenges/{challenge_id}/progress",
    params(
        ("id" = String, Path, description = "User id"),
        ("challenge_id" = String, Path, description = "Challenge id")
    ),
    request_body = ProgressRequest,
    responses(
        (status = 200, description = "Updated progress and any coins awarded"),
        (status = 403, description = "Not the caller's own id"),
        (status = 404, description = "Challenge not found")
    ),
    security(("bearer" = []))
)]
pub async fn challenge_progress_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Uuid>,
    Path((id, challenge_id)): Path<(String, String)>,
    Json(req): Json<ProgressRequest>,
) -> ApiResult<Json<ChallengeOutcome>> {
    let user_id = parse_id(&id, "user")?;
    let challenge_id = parse_id(&challenge_id, "challenge")?;
    let outcome = state
        .progression
        .update_challenge_progress(caller, user_id, challenge_id, req.progress)
        .await?;
    Ok(Json(outcome))
}

#[utoipa::path(
    get,
    path = "/users/{id}/milestones",
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "The user's milestone progress"),
        (status = 403, description = "Not the caller's own id")
    ),
    security(("bearer" = []))
)]
pub async fn user_milestones_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Uuid>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<MilestoneProgress>>> {
    let user_id = parse_id(&id, "user")?;
    let user = state.ledger.load_own(caller, user_id).await?;
    Ok(Json(user.milestones))
}

#[utoipa::path(
    post,
    path = "/users/{id}/milestones/{milestone_id}/progress",
    params(
        ("id" = String, Path, description = "User id"),
        ("milestone_id" = String, Path, description = "Milestone id")
    ),
    request_body = ProgressRequest,
    responses(
        (status = 200, description = "Updated milestone progress"),
        (status = 403, description = "Not the caller's own id"),
        (status = 404, description = "Milestone not found")
    ),
    security(("bearer" = []))
)]
pub async fn milestone_progress_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Uuid>,
    Path((id, milestone_id)): Path<(String, String)>,
    Json(req): Json<ProgressRequest>,
) -> ApiResult<Json<MilestoneProgress>> {
    let user_id = parse_id(&id, "user")?;
    let milestone_id = parse_id(&milestone_id, "milestone")?;
    let progress = state
        .progression
        .update_milestone_progress(caller, user_id, milestone_id, req.progress)
        .await?;
    Ok(Json(progress))
}

#[utoipa::path(
    post,
    path = "/users/{id}/milestones/{milestone_id}/claim-tier",
    params(
        ("id" = String, Path, description = "User id"),
        ("milestone_id" = String, Path, description = "Milestone id")
    ),
    request_body = ClaimTierRequest,
    responses(
        (status = 200, description = "Tier claimed"),
        (status = 400, description = "Requirements not met or tier already claimed"),
        (status = 403, description = "Not the caller's own id"),
        (status = 404, description = "Milestone or tier not found")
    ),
    security(("bearer" = []))
)]
pub async fn claim_tier_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Uuid>,
    Path((id, milestone_id)): Path<(String, String)>,
    Json(req): Json<ClaimTierRequest>,
) -> ApiResult<Json<ClaimOutcome>> {
    let user_id = parse_id(&id, "user")?;
    let milestone_id = parse_id(&milestone_id, "milestone")?;
    let outcome = state
        .progression
        .claim_milestone_tier(caller, user_id, milestone_id, &req.tier_name)
        .await?;
    Ok(Json(outcome))
}

//=========================================================================================
// Shop
//=========================================================================================

#[utoipa::path(
    post,
    path = "/users/{id}/shop/items/{item_id}/purchase",
    params(
        ("id" = String, Path, description = "User id"),
        ("item_id" = String, Path, description = "Shop item id")
    ),
    responses(
        (status = 200, description = "Purchase receipt"),
        (status = 400, description = "Not enough coins"),
        (status = 403, description = "Not the caller's own id"),
        (status = 404, description = "Item not found")
    ),
    security(("bearer" = []))
)]
pub async fn purchase_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Uuid>,
    Path((id, item_id)): Path<(String, String)>,
) -> ApiResult<Json<PurchaseReceipt>> {
    let user_id = parse_id(&id, "user")?;
    let item_id = parse_id(&item_id, "item")?;
    let receipt = state
        .progression
        .purchase_item(caller, user_id, item_id)
        .await?;
    Ok(Json(receipt))
}

//=========================================================================================
// Blocked Websites
//=========================================================================================

#[utoipa::path(
    get,
    path = "/users/{id}/blocked-websites",
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "The blocked-website list"),
        (status = 403, description = "Not the caller's own id")
    ),
    security(("bearer" = []))
)]
pub async fn blocked_websites_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Uuid>,
    Path(id): Path<String>,
) -> ApiResult<Json<BlockedWebsites>> {
    let user_id = parse_id(&id, "user")?;
    let user = state.ledger.load_own(caller, user_id).await?;
    Ok(Json(BlockedWebsites {
        blocked_websites: user.blocked_websites,
    }))
}

#[utoipa::path(
    post,
    path = "/users/{id}/blocked-websites/add",
    params(("id" = String, Path, description = "User id")),
    request_body = WebsiteRequest,
    responses(
        (status = 200, description = "The updated list"),
        (status = 400, description = "Website already blocked"),
        (status = 403, description = "Not the caller's own id")
    ),
    security(("bearer" = []))
)]
pub async fn add_blocked_website_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Uuid>,
    Path(id): Path<String>,
    Json(req): Json<WebsiteRequest>,
) -> ApiResult<Json<BlockedWebsites>> {
    let user_id = parse_id(&id, "user")?;
    let blocked_websites = state
        .ledger
        .block_website(caller, user_id, &req.website)
        .await?;
    Ok(Json(BlockedWebsites { blocked_websites }))
}

#[utoipa::path(
    delete,
    path = "/users/{id}/blocked-websites/remove",
    params(("id" = String, Path, description = "User id"), WebsiteQuery),
    responses(
        (status = 200, description = "The updated list"),
        (status = 403, description = "Not the caller's own id"),
        (status = 404, description = "Website not in blocked list")
    ),
    security(("bearer" = []))
)]
pub async fn remove_blocked_website_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Uuid>,
    Path(id): Path<String>,
    Query(query): Query<WebsiteQuery>,
) -> ApiResult<Json<BlockedWebsites>> {
    let user_id = parse_id(&id, "user")?;
    let blocked_websites = state
        .ledger
        .unblock_website(caller, user_id, &query.website)
        .await?;
    Ok(Json(BlockedWebsites { blocked_websites }))
}
