use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// -- JWT Claims --

/// Session claims shared between the login handler (minting) and the session
/// middleware (verification). Canonical definition lives here in agora-types
/// to eliminate duplication.
///
/// The token intentionally carries no `exp` claim: session lifetime is bounded
/// by the cookie's Max-Age alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub username: String,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// User record as serialized to clients. The password hash never appears here.
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: UserResponse,
    pub token: String,
}

// -- Subs --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateSubRequest {
    pub name: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Serialize)]
pub struct SubResponse {
    pub id: Uuid,
    pub name: String,
    pub title: String,
    pub description: String,
    pub owner: String,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One row of the top-communities aggregation. `image_url` falls back to the
/// default avatar when the sub has no custom image, so it is never absent.
#[derive(Debug, Serialize, Deserialize)]
pub struct TopSubEntry {
    pub title: String,
    pub name: String,
    pub image_url: String,
    pub post_count: i64,
}

// -- Posts --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreatePostRequest {
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    pub sub: String,
}

#[derive(Debug, Serialize)]
pub struct PostResponse {
    pub id: Uuid,
    pub title: String,
    pub body: Option<String>,
    pub sub: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
    /// Derived on read by summing vote rows; never stored.
    pub vote_score: i64,
    /// The requesting viewer's own vote, if authenticated and voted.
    pub user_vote: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct PostDetailResponse {
    pub post: PostResponse,
    pub comments: Vec<CommentResponse>,
}

// -- Comments --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCommentRequest {
    pub body: String,
}

#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub id: Uuid,
    pub post_id: Uuid,
    pub body: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub vote_score: i64,
    pub user_vote: Option<i32>,
}

// -- Votes --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VoteRequest {
    /// Exactly one of `post_id` / `comment_id` must be set.
    #[serde(default)]
    pub post_id: Option<Uuid>,
    #[serde(default)]
    pub comment_id: Option<Uuid>,
    /// -1, 0 or +1; 0 retracts a previous vote.
    pub value: i32,
}

// -- User activity --

/// Public user summary: only username and join date leave the server.
#[derive(Debug, Serialize)]
pub struct UserSummary {
    pub username: String,
    pub created_at: DateTime<Utc>,
}

/// A merged activity entry, tagged so clients can tell posts from comments.
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum ActivityItem {
    Post(PostResponse),
    Comment(CommentResponse),
}

impl ActivityItem {
    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            ActivityItem::Post(p) => p.created_at,
            ActivityItem::Comment(c) => c.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserActivityResponse {
    pub user: UserSummary,
    pub user_data: Vec<ActivityItem>,
}
