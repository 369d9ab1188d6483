//! Data Transfer Objects - request/response types for the API.

use serde::{Deserialize, Serialize};

/// Credentials for `/signup` and `/login`. `username` is only read on signup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub username: Option<String>,
}

/// Body of `POST /posts/{post_id}/like`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LikeRequest {
    pub user_id: String,
}

/// Body of `POST /posts/{post_id}/comment`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentRequest {
    pub user_id: String,
    pub text: String,
}

/// Query string of `GET /posts`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListPostsQuery {
    pub limit: Option<usize>,
    /// Cursor from a previous page's `X-Next-Cursor` header.
    pub after: Option<String>,
}

/// Payload of a successful comment creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentCreated {
    pub comment_id: String,
}
