use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::Comment;

/// Post entity - a stored blog post.
///
/// Reading is lenient: documents written by older clients (or the partial
/// document a like on a missing post leaves behind) still decode, with absent
/// fields taking their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Post {
    pub id: String,
    pub title: String,
    pub content: String,
    pub author_uid: String,
    /// Denormalized author display name.
    pub author: Option<String>,
    #[serde(rename = "type")]
    pub post_type: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub file_urls: Vec<String>,
    pub tags: Vec<String>,
    #[serde(deserialize_with = "lenient_count")]
    pub likes_count: u64,
}

/// A post as submitted for creation; the store assigns `id` and `timestamp`.
///
/// Carries no `likes_count`; the first like creates the counter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub author_uid: String,
    pub author: Option<String>,
    #[serde(rename = "type")]
    pub post_type: String,
    pub file_urls: Vec<String>,
    pub tags: Vec<String>,
}

/// A post enriched with its comment thread, as returned by reads.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostView {
    #[serde(flatten)]
    pub post: Post,
    pub comments: Vec<Comment>,
}

/// Reads a counter that may be missing, null, a float or not a number at all.
/// Anything non-numeric counts as zero.
fn lenient_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_i64().map(|v| v.max(0) as u64))
            .or_else(|| n.as_f64().map(|v| v.max(0.0) as u64))
            .unwrap_or(0),
        _ => 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_likes_count_reads_as_zero() {
        let post: Post = serde_json::from_value(json!({
            "title": "t",
            "content": "c",
            "author_uid": "u1",
            "type": "blog"
        }))
        .unwrap();

        assert_eq!(post.likes_count, 0);
        assert!(post.file_urls.is_empty());
        assert!(post.tags.is_empty());
    }

    #[test]
    fn test_non_numeric_likes_count_reads_as_zero() {
        let post: Post = serde_json::from_value(json!({ "likes_count": "lots" })).unwrap();
        assert_eq!(post.likes_count, 0);

        let post: Post = serde_json::from_value(json!({ "likes_count": null })).unwrap();
        assert_eq!(post.likes_count, 0);
    }

    #[test]
    fn test_float_likes_count_is_truncated() {
        let post: Post = serde_json::from_value(json!({ "likes_count": 4.0 })).unwrap();
        assert_eq!(post.likes_count, 4);
    }

    #[test]
    fn test_view_flattens_post_fields() {
        let view = PostView {
            post: Post {
                id: "p1".to_string(),
                post_type: "blog".to_string(),
                tags: vec!["a".to_string()],
                ..Default::default()
            },
            comments: vec![],
        };

        let value = serde_json::to_value(&view).unwrap();
        assert_eq!(value["id"], "p1");
        assert_eq!(value["type"], "blog");
        assert_eq!(value["tags"], json!(["a"]));
        assert_eq!(value["comments"], json!([]));
        assert_eq!(value["likes_count"], 0);
    }
}
