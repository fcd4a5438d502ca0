use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::{
    api::{ApiError, ApiResult},
    db::repositories::{FollowRepository, UserRepository},
    middleware::RequestContext,
    state::AppState,
};
use chirp_types::FollowResponse;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowQuery {
    #[serde(default)]
    pub follower_id: Option<String>,
}

/// GET /follow/:username - Follow if not following, unfollow otherwise
pub async fn toggle_follow(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(username): Path<String>,
    Query(query): Query<FollowQuery>,
) -> ApiResult<Json<FollowResponse>> {
    let follower_id = ctx.acting_user(query.follower_id.as_deref(), "Follower ID is required")?;

    let pool = state.db.pool.clone();
    let user_repo = UserRepository::new(pool.clone());
    let follow_repo = FollowRepository::new(pool);

    let target = user_repo
        .get_by_username(&username)?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    if !user_repo.exists(&follower_id)? {
        return Err(ApiError::NotFound("Follower not found".to_string()));
    }

    let action = follow_repo.toggle(&follower_id, &target.id)?;
    tracing::info!("{} {} @{}", follower_id, action.as_str(), target.username);

    Ok(Json(FollowResponse {
        success: true,
        action,
    }))
}
