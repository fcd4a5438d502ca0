use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    api::{ApiError, ApiResult},
    db::{
        is_unique_violation,
        repositories::{NewUser, ProfileImage, UserRepository},
    },
    images::{decode_base64, extension_for},
    middleware::RequestContext,
    state::AppState,
};
use chirp_types::{CreateUserRequest, ProfileResponse, UserId, UserIdsResponse, UserResponse};

const USERNAME_TAKEN: &str = "Username is already taken";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileQuery {
    #[serde(default)]
    pub current_user_id: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// POST /user - Sign up a new user
pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> ApiResult<Json<UserResponse>> {
    let Json(payload) = payload?;

    let name = payload.name.trim().to_string();
    let username = payload.username.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::BadRequest("Name is required".to_string()));
    }
    if username.is_empty() {
        return Err(ApiError::BadRequest("Username is required".to_string()));
    }

    let user_repo = UserRepository::new(state.db.pool.clone());
    if user_repo.get_by_username(&username)?.is_some() {
        return Err(ApiError::Conflict(USERNAME_TAKEN.to_string()));
    }

    let profile_picture = match (
        non_blank(payload.profile_picture),
        non_blank(payload.mime_type),
    ) {
        (Some(data), Some(mime_type)) => {
            extension_for(&mime_type)?;
            Some(ProfileImage {
                bytes: decode_base64(&data)?,
                mime_type: mime_type.trim().to_string(),
            })
        }
        (Some(_), None) => {
            return Err(ApiError::BadRequest(
                "mimeType is required with profilePicture".to_string(),
            ));
        }
        (None, _) => state.placeholder.fetch().await,
    };

    let new_user = NewUser {
        name,
        username,
        bio: non_blank(payload.bio),
        profile_picture,
        super_user: payload.super_user.unwrap_or(false),
    };

    let created = user_repo.create_with_follows(&new_user).map_err(|e| {
        if is_unique_violation(&e) {
            ApiError::Conflict(USERNAME_TAKEN.to_string())
        } else {
            e.into()
        }
    })?;

    tracing::info!(
        "Created user @{} (superuser: {}, followers seeded: {}, superusers followed: {})",
        created.user.username,
        created.user.super_user,
        created.followers_seeded,
        created.following_seeded
    );

    Ok(Json(UserResponse {
        success: true,
        user: created.user,
    }))
}

/// GET /user/:username - Profile with counts and follow status
pub async fn get_user_by_username(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(username): Path<String>,
    Query(query): Query<ProfileQuery>,
) -> ApiResult<Json<ProfileResponse>> {
    let viewer_id = ctx.viewer(query.current_user_id.as_deref())?;

    let user_repo = UserRepository::new(state.db.pool.clone());
    let profile = user_repo
        .get_profile_by_username(&username, viewer_id.as_ref())?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(ProfileResponse {
        success: true,
        user: profile,
    }))
}

/// GET /userById/:id - Same as above, keyed by id
pub async fn get_user_by_id(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(user_id): Path<String>,
    Query(query): Query<ProfileQuery>,
) -> ApiResult<Json<ProfileResponse>> {
    let viewer_id = ctx.viewer(query.current_user_id.as_deref())?;

    let user_id = Uuid::parse_str(&user_id)
        .map_err(|_| ApiError::NotFound("User not found".to_string()))?;

    let user_repo = UserRepository::new(state.db.pool.clone());
    let profile = user_repo
        .get_profile_by_id(&user_id, viewer_id.as_ref())?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(ProfileResponse {
        success: true,
        user: profile,
    }))
}

/// GET /users - Ids of all ordinary (non-superuser) users
pub async fn list_user_ids(State(state): State<AppState>) -> ApiResult<Json<UserIdsResponse>> {
    let user_repo = UserRepository::new(state.db.pool.clone());
    let users = user_repo
        .list_ordinary_ids()?
        .into_iter()
        .map(|id| UserId { id })
        .collect();

    Ok(Json(UserIdsResponse {
        success: true,
        users,
    }))
}
