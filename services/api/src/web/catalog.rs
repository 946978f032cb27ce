//! services/api/src/web/catalog.rs
//!
//! Public read-only endpoints over the reward catalog.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use study_shield_core::{parse_id, Challenge, ChallengeType, CoreError, Milestone, PortError, ShopItem};
use utoipa::IntoParams;

use crate::error::{ApiError, ApiResult};
use crate::web::state::AppState;

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ChallengeFilter {
    /// One of daily, special, milestone.
    pub challenge_type: Option<String>,
}

fn not_found(message: &'static str) -> impl Fn(PortError) -> ApiError {
    move |e| match e {
        PortError::NotFound(_) => CoreError::NotFound(message.to_string()).into(),
        other => other.into(),
    }
}

#[utoipa::path(
    get,
    path = "/challenges",
    params(ChallengeFilter),
    responses(
        (status = 200, description = "Challenges, optionally filtered by type"),
        (status = 400, description = "Unknown challenge type")
    )
)]
pub async fn list_challenges_handler(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<ChallengeFilter>,
) -> ApiResult<Json<Vec<Challenge>>> {
    let kind = filter
        .challenge_type
        .as_deref()
        .map(str::parse::<ChallengeType>)
        .transpose()
        .map_err(ApiError::BadRequest)?;
    Ok(Json(state.store.list_challenges(kind).await?))
}

#[utoipa::path(
    get,
    path = "/challenges/{id}",
    params(("id" = String, Path, description = "Challenge id")),
    responses(
        (status = 200, description = "The challenge"),
        (status = 404, description = "Challenge not found")
    )
)]
pub async fn get_challenge_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Challenge>> {
    let challenge_id = parse_id(&id, "challenge")?;
    let challenge = state
        .store
        .get_challenge(challenge_id)
        .await
        .map_err(not_found("Challenge not found"))?;
    Ok(Json(challenge))
}

#[utoipa::path(
    get,
    path = "/milestones",
    responses((status = 200, description = "All milestones"))
)]
pub async fn list_milestones_handler(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<Milestone>>> {
    Ok(Json(state.store.list_milestones().await?))
}

#[utoipa::path(
    get,
    path = "/milestones/{id}",
    params(("id" = String, Path, description = "Milestone id")),
    responses(
        (status = 200, description = "The milestone"),
        (status = 404, description = "Milestone not found")
    )
)]
pub async fn get_milestone_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Milestone>> {
    let milestone_id = parse_id(&id, "milestone")?;
    let milestone = state
        .store
        .get_milestone(milestone_id)
        .await
        .map_err(not_found("Milestone not found"))?;
    Ok(Json(milestone))
}

#[utoipa::path(
    get,
    path = "/shop/items",
    responses((status = 200, description = "All shop items"))
)]
pub async fn list_shop_items_handler(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<ShopItem>>> {
    Ok(Json(state.store.list_shop_items().await?))
}

#[utoipa::path(
    get,
    path = "/shop/items/{id}",
    params(("id" = String, Path, description = "Shop item id")),
    responses(
        (status = 200, description = "The item"),
        (status = 404, description = "Item not found")
    )
)]
pub async fn get_shop_item_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<ShopItem>> {
    let item_id = parse_id(&id, "item")?;
    let item = state
        .store
        .get_shop_item(item_id)
        .await
        .map_err(not_found("Item not found"))?;
    Ok(Json(item))
}
