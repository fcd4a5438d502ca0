use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::{
    api::ApiResult,
    feed::{assemble_feed, FEED_LIMIT},
    middleware::RequestContext,
    state::AppState,
};
use chirp_types::PostsResponse;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedQuery {
    #[serde(default)]
    pub user_id: Option<String>,
}

/// GET /feed - Latest posts from the user and everyone they follow
pub async fn get_feed(
    State(state): State<AppState>,
    ctx: RequestContext,
    Query(query): Query<FeedQuery>,
) -> ApiResult<Json<PostsResponse>> {
    let user_id = ctx.acting_user(query.user_id.as_deref(), "User ID is required")?;
    let posts = assemble_feed(&state.db.pool, &user_id, FEED_LIMIT)?;

    Ok(Json(PostsResponse {
        success: true,
        posts,
    }))
}
