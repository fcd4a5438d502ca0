use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::error::{ClientError, ClientResult};
use chirp_types::*;

/// Thin HTTP client for the Chirp server
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Decode a success body, or turn the error envelope into a [`ClientError`]
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> ClientResult<T> {
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            return Ok(serde_json::from_str(&body)?);
        }

        let message = serde_json::from_str::<ErrorResponse>(&body)
            .map(|e| e.error)
            .unwrap_or_else(|_| format!("Server returned {}", status.as_u16()));

        Err(match status {
            StatusCode::NOT_FOUND => ClientError::NotFound(message),
            StatusCode::BAD_REQUEST => ClientError::BadRequest(message),
            StatusCode::CONFLICT => ClientError::Conflict(message),
            _ => ClientError::Api(message),
        })
    }

    /// Sign up a user
    pub async fn create_user(&self, request: &CreateUserRequest) -> ClientResult<User> {
        let url = format!("{}/user", self.base_url);
        let response = self.client.post(&url).json(request).send().await?;
        let body: UserResponse = self.handle_response(response).await?;
        Ok(body.user)
    }

    pub async fn get_user_by_id(&self, user_id: Uuid) -> ClientResult<UserProfile> {
        let url = format!("{}/userById/{}", self.base_url, user_id);
        let response = self.client.get(&url).send().await?;
        let body: ProfileResponse = self.handle_response(response).await?;
        Ok(body.user)
    }

    /// Ids of every ordinary user
    pub async fn list_user_ids(&self) -> ClientResult<Vec<Uuid>> {
        let url = format!("{}/users", self.base_url);
        let response = self.client.get(&url).send().await?;
        let body: UserIdsResponse = self.handle_response(response).await?;
        Ok(body.users.into_iter().map(|u| u.id).collect())
    }

    pub async fn create_post(&self, user_id: Uuid, text: &str) -> ClientResult<Post> {
        let url = format!("{}/post", self.base_url);
        let request = CreatePostRequest {
            text: Some(text.to_string()),
            user_id: Some(user_id.to_string()),
            ..Default::default()
        };
        let response = self.client.post(&url).json(&request).send().await?;
        let body: PostResponse = self.handle_response(response).await?;
        Ok(body.post)
    }

    pub async fn get_post(&self, post_id: Uuid) -> ClientResult<PostDetail> {
        let url = format!("{}/post/{}", self.base_url, post_id);
        let response = self.client.get(&url).send().await?;
        let body: PostDetailResponse = self.handle_response(response).await?;
        Ok(body.post)
    }

    pub async fn create_comment(
        &self,
        post_id: Uuid,
        user_id: Uuid,
        text: &str,
    ) -> ClientResult<Comment> {
        let url = format!("{}/post/{}/comment", self.base_url, post_id);
        let request = CreatePostRequest {
            text: Some(text.to_string()),
            user_id: Some(user_id.to_string()),
            ..Default::default()
        };
        let response = self.client.post(&url).json(&request).send().await?;
        let body: CommentResponse = self.handle_response(response).await?;
        Ok(body.comment)
    }
}
