use async_trait::async_trait;

use crate::domain::{Comment, NewComment, NewPost, Page, PageRequest, Post, User};
use crate::error::RepoError;

/// User profile repository.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find a user by subject id.
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, RepoError>;

    /// Fetch every listed user in one round trip. Unknown ids are skipped.
    async fn find_many(&self, ids: &[String]) -> Result<Vec<User>, RepoError>;

    /// Store (or overwrite) the user under `user.id`, stamping `created_at`.
    async fn save(&self, user: User) -> Result<User, RepoError>;
}

/// What a like increment found before it committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IncrementOutcome {
    /// False when the increment materialized a brand new partial document.
    pub existed: bool,
    /// False when the counter was missing or non-numeric and was reset to 0.
    pub was_numeric: bool,
}

/// Post repository.
#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<Post>, RepoError>;

    /// Insert a post under a store-assigned id with a server timestamp.
    async fn create(&self, post: NewPost) -> Result<Post, RepoError>;

    /// All posts written by the given author, in store order.
    async fn find_by_author(&self, author_uid: &str) -> Result<Vec<Post>, RepoError>;

    /// Posts ordered by id, one page at a time.
    async fn list(&self, page: &PageRequest) -> Result<Page<Post>, RepoError>;

    /// Atomically add one to `likes_count` inside a store transaction.
    ///
    /// A missing or non-numeric counter is first reset to 0 (merged into the
    /// existing fields). A missing document is created holding only the
    /// counter.
    async fn increment_likes(&self, id: &str) -> Result<IncrementOutcome, RepoError>;
}

/// Comment repository.
#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// Insert a comment under a store-assigned id with a server timestamp.
    async fn create(&self, comment: NewComment) -> Result<Comment, RepoError>;

    /// Comments of one post, in store order.
    async fn find_by_post(&self, post_id: &str) -> Result<Vec<Comment>, RepoError>;

    /// Every comment, ordered by timestamp ascending.
    async fn list_by_timestamp(&self) -> Result<Vec<Comment>, RepoError>;
}
