use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Username stored on a comment when the commenter has no user record.
pub const UNKNOWN_USERNAME: &str = "Unknown";

/// Comment entity - a reply attached to a post.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    pub user_id: String,
    /// Denormalized commenter username. Stored null reads as "Unknown".
    #[serde(deserialize_with = "unknown_if_null")]
    pub username: String,
    pub text: String,
    /// Server-assigned creation time.
    pub timestamp: Option<DateTime<Utc>>,
}

/// A comment as submitted; the store assigns `id` and `timestamp`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewComment {
    pub post_id: String,
    pub user_id: String,
    pub username: String,
    pub text: String,
}

fn unknown_if_null<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(|| UNKNOWN_USERNAME.to_string()))
}

impl NewComment {
    pub fn new(
        post_id: impl Into<String>,
        user_id: impl Into<String>,
        username: Option<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            post_id: post_id.into(),
            user_id: user_id.into(),
            username: username.unwrap_or_else(|| UNKNOWN_USERNAME.to_string()),
            text: text.into(),
        }
    }
}
