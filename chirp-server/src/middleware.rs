use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use std::convert::Infallible;
use uuid::Uuid;

use crate::api::{ApiError, ApiResult};
use crate::state::AppState;

pub const SESSION_HEADER: &str = "X-Session-Token";

/// Who is making the request, resolved once per request from the session header
#[derive(Clone, Debug, Default)]
pub struct RequestContext {
    /// User behind a valid session token
    pub viewer_id: Option<Uuid>,
    /// Raw token as sent, valid or not
    pub session_token: Option<String>,
}

impl RequestContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// The user a write acts on behalf of
    ///
    /// An explicit id from the request wins when it agrees with the session;
    /// without one the session viewer is used. `missing` is the validation
    /// message when neither is present.
    pub fn acting_user(&self, explicit: Option<&str>, missing: &str) -> ApiResult<Uuid> {
        self.resolve(explicit)?
            .ok_or_else(|| ApiError::BadRequest(missing.to_string()))
    }

    /// Same rules as [`acting_user`](Self::acting_user), but nobody is fine
    pub fn viewer(&self, explicit: Option<&str>) -> ApiResult<Option<Uuid>> {
        self.resolve(explicit)
    }

    fn resolve(&self, explicit: Option<&str>) -> ApiResult<Option<Uuid>> {
        let explicit = explicit.map(str::trim).filter(|s| !s.is_empty());
        match (explicit, self.viewer_id) {
            (Some(raw), viewer) => {
                let id = Uuid::parse_str(raw)
                    .map_err(|_| ApiError::BadRequest(format!("Invalid user ID: {}", raw)))?;
                match viewer {
                    Some(viewer) if viewer != id => Err(ApiError::Forbidden(
                        "Requested user does not match the session".to_string(),
                    )),
                    _ => Ok(Some(id)),
                }
            }
            (None, viewer) => Ok(viewer),
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .unwrap_or_default())
    }
}

/// Resolve the session header into a [`RequestContext`] extension
///
/// Unknown or expired tokens leave the request anonymous.
pub async fn request_context_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let session_token = request
        .headers()
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let viewer_id = match session_token.as_deref() {
        Some(token) => match state.session_manager.validate_session(token) {
            Ok(viewer) => viewer,
            Err(e) => {
                tracing::warn!("Session lookup failed: {:#}", e);
                None
            }
        },
        None => None,
    };

    request.extensions_mut().insert(RequestContext {
        viewer_id,
        session_token,
    });

    next.run(request).await
}
