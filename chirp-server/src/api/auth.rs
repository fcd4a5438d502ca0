use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Serialize;

use crate::{
    api::{ApiError, ApiResult},
    db::repositories::UserRepository,
    middleware::RequestContext,
    state::AppState,
};
use chirp_types::{LoginRequest, LoginResponse, ProfileResponse};

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub success: bool,
}

/// POST /auth/login - Start a session for an existing user
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<LoginResponse>> {
    let Json(payload) = payload?;
    let username = payload.username.trim();
    if username.is_empty() {
        return Err(ApiError::BadRequest("Username is required".to_string()));
    }

    let user = UserRepository::new(state.db.pool.clone())
        .get_by_username(username)?
        .ok_or_else(|| ApiError::NotFound(format!("User '{}' not found", username)))?;

    let session_token = state.session_manager.create_session(user.id)?;
    tracing::info!("@{} logged in", user.username);

    Ok(Json(LoginResponse {
        success: true,
        user,
        session_token,
    }))
}

/// POST /auth/logout - Delete the session named by the session header
pub async fn logout(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> ApiResult<Json<LogoutResponse>> {
    let token = ctx
        .session_token
        .ok_or_else(|| ApiError::Unauthorized("Missing session token".to_string()))?;

    if !state.session_manager.delete_session(&token)? {
        return Err(ApiError::Unauthorized("Invalid session token".to_string()));
    }

    Ok(Json(LogoutResponse { success: true }))
}

/// GET /auth/me - Profile of the session's user
pub async fn me(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> ApiResult<Json<ProfileResponse>> {
    let viewer_id = ctx
        .viewer_id
        .ok_or_else(|| ApiError::Unauthorized("Not logged in".to_string()))?;

    let profile = UserRepository::new(state.db.pool.clone())
        .get_profile_by_id(&viewer_id, Some(&viewer_id))?
        .ok_or_else(|| ApiError::Unauthorized("Session user no longer exists".to_string()))?;

    Ok(Json(ProfileResponse {
        success: true,
        user: profile,
    }))
}
