//! Like counting.

use std::sync::Arc;

use serde::Serialize;

use crate::error::DomainError;
use crate::ports::PostRepository;

/// Result of a like: the post and its counter as read after commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LikeOutcome {
    pub post_id: String,
    pub likes: u64,
}

/// Increments post like counters.
///
/// The increment itself is atomic in the store. The count reported back comes
/// from a separate read after commit and can already be stale when several
/// users like the same post at once.
pub struct LikeCounter {
    posts: Arc<dyn PostRepository>,
}

impl LikeCounter {
    pub fn new(posts: Arc<dyn PostRepository>) -> Self {
        Self { posts }
    }

    /// Add one like from `user_id`. The same user may like a post repeatedly.
    pub async fn like(&self, post_id: &str, user_id: &str) -> Result<LikeOutcome, DomainError> {
        tracing::debug!(post_id = %post_id, user_id = %user_id, "Liking post");

        let outcome = self.posts.increment_likes(post_id).await?;
        if !outcome.existed {
            tracing::warn!(post_id = %post_id, "Like created a partial document for a missing post");
        } else if !outcome.was_numeric {
            tracing::debug!(post_id = %post_id, "Initialized likes_count before increment");
        }

        let likes = self
            .posts
            .find_by_id(post_id)
            .await?
            .map(|post| post.likes_count)
            .unwrap_or(0);

        tracing::info!(post_id = %post_id, likes, "Post liked");

        Ok(LikeOutcome {
            post_id: post_id.to_string(),
            likes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Post;
    use crate::services::testing::FakeStore;

    #[tokio::test]
    async fn test_first_like_sets_count_to_one() {
        let store = FakeStore::default().with_posts(vec![Post {
            id: "p1".to_string(),
            ..Default::default()
        }]);

        let outcome = store.like_counter().like("p1", "u1").await.unwrap();
        assert_eq!(outcome, LikeOutcome { post_id: "p1".to_string(), likes: 1 });
    }

    #[tokio::test]
    async fn test_like_ignores_user_identity() {
        let store = FakeStore::default().with_posts(vec![Post {
            id: "p1".to_string(),
            likes_count: 7,
            ..Default::default()
        }]);
        let counter = store.like_counter();

        assert_eq!(counter.like("p1", "u1").await.unwrap().likes, 8);
        assert_eq!(counter.like("p1", "u1").await.unwrap().likes, 9);
        assert_eq!(counter.like("p1", "u2").await.unwrap().likes, 10);
    }

    #[tokio::test]
    async fn test_store_failure_is_internal() {
        let store = FakeStore::default().failing();

        let result = store.like_counter().like("p1", "u1").await;
        assert!(matches!(result, Err(DomainError::Internal(_))));
    }
}
