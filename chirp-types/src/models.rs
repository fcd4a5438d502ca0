use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// Custom serde module for DateTime to ensure RFC3339 string format
mod datetime_format {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let s = date.to_rfc3339_opts(SecondsFormat::Micros, true);
        serializer.serialize_str(&s)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse::<DateTime<Utc>>().map_err(serde::de::Error::custom)
    }
}

/// A registered account. `profile_picture` is base64 on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub profile_picture: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    pub super_user: bool,
    #[serde(with = "datetime_format")]
    pub created_at: DateTime<Utc>,
}

/// Author fields embedded in posts and comments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub id: Uuid,
    pub name: String,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Uuid,
    pub text: String,
    /// Retrieval path under `/uploads` when an image was attached
    #[serde(default)]
    pub image_url: Option<String>,
    pub user_id: Uuid,
    #[serde(with = "datetime_format")]
    pub created_at: DateTime<Utc>,
    pub author: Author,
    #[serde(default)]
    pub comment_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub text: String,
    #[serde(default)]
    pub image_url: Option<String>,
    pub user_id: Uuid,
    #[serde(with = "datetime_format")]
    pub created_at: DateTime<Utc>,
    pub author: Author,
}

/// A post together with its comments, newest first
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDetail {
    #[serde(flatten)]
    pub post: Post,
    pub comments: Vec<Comment>,
}

/// Profile view with follow counts relative to an optional viewer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    pub bio: Option<String>,
    pub profile_picture: Option<String>,
    pub mime_type: Option<String>,
    #[serde(with = "datetime_format")]
    pub created_at: DateTime<Utc>,
    pub follower_count: i64,
    pub following_count: i64,
    pub post_count: i64,
    pub is_following: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FollowAction {
    Followed,
    Unfollowed,
}

impl FollowAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            FollowAction::Followed => "followed",
            FollowAction::Unfollowed => "unfollowed",
        }
    }
}

// Request types for API

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub super_user: Option<bool>,
}

/// Body shared by post and comment creation
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
}

// Response envelopes. Every success body carries `success: true`.

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub success: bool,
    pub user: User,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub success: bool,
    pub user: UserProfile,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserId {
    pub id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserIdsResponse {
    pub success: bool,
    pub users: Vec<UserId>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FollowResponse {
    pub success: bool,
    pub action: FollowAction,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PostResponse {
    pub success: bool,
    pub post: Post,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PostDetailResponse {
    pub success: bool,
    pub post: PostDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PostsResponse {
    pub success: bool,
    pub posts: Vec<Post>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CommentResponse {
    pub success: bool,
    pub comment: Comment,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub success: bool,
    pub user: User,
    pub session_token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_detail_flattens_post_fields() {
        let author = Author {
            id: Uuid::new_v4(),
            name: "Alice".to_string(),
            username: "alice".to_string(),
        };
        let detail = PostDetail {
            post: Post {
                id: Uuid::new_v4(),
                text: "hello".to_string(),
                image_url: None,
                user_id: author.id,
                created_at: Utc::now(),
                author,
                comment_count: 0,
            },
            comments: vec![],
        };

        let value = serde_json::to_value(&detail).unwrap();
        assert_eq!(value["text"], "hello");
        assert_eq!(value["commentCount"], 0);
        assert!(value["comments"].as_array().unwrap().is_empty());
        assert!(value.get("post").is_none());
    }

    #[test]
    fn test_created_at_keeps_microseconds() {
        let created_at: DateTime<Utc> = "2024-01-01T00:00:00.123456Z".parse().unwrap();
        let comment = Comment {
            id: Uuid::new_v4(),
            post_id: Uuid::new_v4(),
            text: "first".to_string(),
            image_url: None,
            user_id: Uuid::new_v4(),
            created_at,
            author: Author {
                id: Uuid::new_v4(),
                name: "Alice".to_string(),
                username: "alice".to_string(),
            },
        };

        let value = serde_json::to_value(&comment).unwrap();
        assert_eq!(value["createdAt"], "2024-01-01T00:00:00.123456Z");

        let back: Comment = serde_json::from_value(value).unwrap();
        assert_eq!(back.created_at, created_at);
    }

    #[test]
    fn test_follow_action_wire_format() {
        assert_eq!(
            serde_json::to_string(&FollowAction::Unfollowed).unwrap(),
            "\"unfollowed\""
        );
        assert_eq!(FollowAction::Followed.as_str(), "followed");
    }

    #[test]
    fn test_create_user_request_accepts_missing_fields() {
        let req: CreateUserRequest =
            serde_json::from_str(r#"{"username": "bob", "superUser": true}"#).unwrap();
        assert_eq!(req.username, "bob");
        assert!(req.name.is_empty());
        assert_eq!(req.super_user, Some(true));
        assert!(req.profile_picture.is_none());
    }
}
