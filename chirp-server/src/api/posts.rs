use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use uuid::Uuid;

use crate::{
    api::{ApiError, ApiResult},
    db::repositories::{CommentRepository, PostRepository, UserRepository},
    middleware::RequestContext,
    state::AppState,
};
use chirp_types::{
    Author, CommentResponse, CreatePostRequest, PostDetail, PostDetailResponse, PostResponse,
    PostsResponse,
};

/// Text of a post or comment; may only be blank when an image is attached
fn validated_text(text: Option<String>, has_image: bool) -> ApiResult<String> {
    let text = text.unwrap_or_default();
    if text.trim().is_empty() && !has_image {
        return Err(ApiError::BadRequest("Text is required".to_string()));
    }
    Ok(text)
}

fn author_for(state: &AppState, user_id: &Uuid) -> ApiResult<Author> {
    let user = UserRepository::new(state.db.pool.clone())
        .get_by_id(user_id)?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    Ok(Author {
        id: user.id,
        name: user.name,
        username: user.username,
    })
}

/// Image payload of a request; blank counts as none
fn attached_image(image: Option<String>) -> Option<String> {
    image.filter(|i| !i.trim().is_empty())
}

/// Write an attached image to the store, returning its retrieval path
async fn store_attachment(
    state: &AppState,
    image: Option<String>,
    mime_type: Option<String>,
) -> ApiResult<Option<String>> {
    match (image, mime_type) {
        (Some(data), Some(mime_type)) => Ok(Some(state.images.save(&data, &mime_type).await?)),
        (Some(_), None) => Err(ApiError::BadRequest(
            "mimeType is required with image".to_string(),
        )),
        (None, _) => Ok(None),
    }
}

/// Post ids that do not parse cannot exist
fn parse_post_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| ApiError::NotFound("Post not found".to_string()))
}

/// POST /post - Create a new post
pub async fn create_post(
    State(state): State<AppState>,
    ctx: RequestContext,
    payload: Result<Json<CreatePostRequest>, JsonRejection>,
) -> ApiResult<Json<PostResponse>> {
    let Json(payload) = payload?;
    let image = attached_image(payload.image);
    let text = validated_text(payload.text, image.is_some())?;
    let author_id = ctx.acting_user(payload.user_id.as_deref(), "User ID is required")?;
    let author = author_for(&state, &author_id)?;

    let image_url = store_attachment(&state, image, payload.mime_type).await?;

    let post_repo = PostRepository::new(state.db.pool.clone());
    let post = post_repo.create(&author, &text, image_url.as_deref())?;
    tracing::info!("@{} created post {}", author.username, post.id);

    Ok(Json(PostResponse {
        success: true,
        post,
    }))
}

/// POST /post/:id/comment - Comment on a post
pub async fn create_comment(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(post_id): Path<String>,
    payload: Result<Json<CreatePostRequest>, JsonRejection>,
) -> ApiResult<Json<CommentResponse>> {
    let Json(payload) = payload?;
    let post_id = parse_post_id(&post_id)?;
    let image = attached_image(payload.image);
    let text = validated_text(payload.text, image.is_some())?;
    let author_id = ctx.acting_user(payload.user_id.as_deref(), "User ID is required")?;
    let author = author_for(&state, &author_id)?;

    let pool = state.db.pool.clone();
    let post_repo = PostRepository::new(pool.clone());
    let comment_repo = CommentRepository::new(pool);

    if !post_repo.exists(&post_id)? {
        return Err(ApiError::NotFound("Post not found".to_string()));
    }

    let image_url = store_attachment(&state, image, payload.mime_type).await?;
    let comment = comment_repo.create(&post_id, &author, &text, image_url.as_deref())?;
    tracing::info!("@{} commented on post {}", author.username, post_id);

    Ok(Json(CommentResponse {
        success: true,
        comment,
    }))
}

/// GET /post/:id - A post with its comments, newest first
pub async fn get_post(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> ApiResult<Json<PostDetailResponse>> {
    let post_id = parse_post_id(&post_id)?;

    let pool = state.db.pool.clone();
    let post_repo = PostRepository::new(pool.clone());
    let comment_repo = CommentRepository::new(pool);

    let post = post_repo
        .get_by_id(&post_id)?
        .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))?;
    let comments = comment_repo.get_by_post(&post_id)?;

    Ok(Json(PostDetailResponse {
        success: true,
        post: PostDetail { post, comments },
    }))
}

/// GET /posts/:username - All posts by a user, newest first
pub async fn get_posts_by_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> ApiResult<Json<PostsResponse>> {
    let pool = state.db.pool.clone();
    let user_repo = UserRepository::new(pool.clone());
    let post_repo = PostRepository::new(pool);

    let user = user_repo
        .get_by_username(&username)?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    let posts = post_repo.get_by_author(&user.id)?;

    Ok(Json(PostsResponse {
        success: true,
        posts,
    }))
}
