use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{api, middleware::request_context_middleware, state::AppState};

/// Build the application router over a fully constructed [`AppState`]
pub fn create_router(state: AppState, max_body_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Authentication routes
        .route("/auth/login", post(api::auth::login))
        .route("/auth/logout", post(api::auth::logout))
        .route("/auth/me", get(api::auth::me))
        // User routes
        .route("/user", post(api::users::create_user))
        .route("/user/:username", get(api::users::get_user_by_username))
        .route("/userById/:id", get(api::users::get_user_by_id))
        .route("/users", get(api::users::list_user_ids))
        .route("/follow/:username", get(api::follows::toggle_follow))
        // Post routes
        .route("/post", post(api::posts::create_post))
        .route("/post/:id", get(api::posts::get_post))
        .route("/post/:id/comment", post(api::posts::create_comment))
        .route("/posts/:username", get(api::posts::get_posts_by_user))
        .route("/feed", get(api::feed::get_feed))
        // Stored images
        .route("/uploads/:file", get(api::uploads::get_upload))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            request_context_middleware,
        ))
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

async fn health_check() -> &'static str {
    "OK"
}
