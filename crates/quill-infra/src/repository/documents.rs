//! Repository implementations over a document store.

use async_trait::async_trait;
use serde_json::json;

use quill_core::domain::{Comment, NewComment, NewPost, Page, PageRequest, Post, User};
use quill_core::error::RepoError;
use quill_core::ports::{CommentRepository, IncrementOutcome, PostRepository, UserRepository};

use super::base::{DocumentRepository, Entity, to_fields};
use crate::store::{OrderBy, Query};

/// Document-store user repository.
pub type DocumentUserRepository = DocumentRepository<User>;

/// Document-store post repository.
pub type DocumentPostRepository = DocumentRepository<Post>;

/// Document-store comment repository.
pub type DocumentCommentRepository = DocumentRepository<Comment>;

const LIKES_FIELD: &str = "likes_count";

#[async_trait]
impl UserRepository for DocumentUserRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, RepoError> {
        self.get(id).await
    }

    async fn find_many(&self, ids: &[String]) -> Result<Vec<User>, RepoError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let docs = self.store.get_many(User::COLLECTION, ids).await?;
        Ok(self.decode_all(docs))
    }

    async fn save(&self, user: User) -> Result<User, RepoError> {
        tracing::debug!(user_id = %user.id, "Saving user profile");

        let fields = to_fields(&json!({
            "username": user.username,
            "email": user.email,
        }))?;
        let stored = self
            .store
            .set(User::COLLECTION, &user.id, fields, Some("created_at"))
            .await?;
        self.decode(stored)
    }
}

#[async_trait]
impl PostRepository for DocumentPostRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Post>, RepoError> {
        self.get(id).await
    }

    async fn create(&self, post: NewPost) -> Result<Post, RepoError> {
        let fields = to_fields(&post)?;
        let stored = self
            .store
            .insert(Post::COLLECTION, fields, Some("timestamp"))
            .await?;
        tracing::debug!(post_id = %stored.id, author_uid = %post.author_uid, "Post stored");
        self.decode(stored)
    }

    async fn find_by_author(&self, author_uid: &str) -> Result<Vec<Post>, RepoError> {
        let docs = self
            .store
            .query(
                Post::COLLECTION,
                &Query::all().where_eq("author_uid", author_uid),
            )
            .await?;
        Ok(self.decode_all(docs))
    }

    async fn list(&self, page: &PageRequest) -> Result<Page<Post>, RepoError> {
        let query = Query::all()
            .order_by(OrderBy::Id)
            .after(page.after.clone())
            .limit(page.limit);
        let docs = self.store.query(Post::COLLECTION, &query).await?;
        // The cursor follows the raw documents, so a skipped one cannot end paging early.
        let raw = Page::from_items(docs, page, |doc| doc.id.clone());
        Ok(Page {
            items: self.decode_all(raw.items),
            next_cursor: raw.next_cursor,
        })
    }

    async fn increment_likes(&self, id: &str) -> Result<IncrementOutcome, RepoError> {
        self.store
            .increment(Post::COLLECTION, id, LIKES_FIELD, 1)
            .await
    }
}

#[async_trait]
impl CommentRepository for DocumentCommentRepository {
    async fn create(&self, comment: NewComment) -> Result<Comment, RepoError> {
        let fields = to_fields(&comment)?;
        let stored = self
            .store
            .insert(Comment::COLLECTION, fields, Some("timestamp"))
            .await?;
        self.decode(stored)
    }

    async fn find_by_post(&self, post_id: &str) -> Result<Vec<Comment>, RepoError> {
        let docs = self
            .store
            .query(Comment::COLLECTION, &Query::all().where_eq("post_id", post_id))
            .await?;
        Ok(self.decode_all(docs))
    }

    async fn list_by_timestamp(&self) -> Result<Vec<Comment>, RepoError> {
        let docs = self
            .store
            .query(
                Comment::COLLECTION,
                &Query::all().order_by(OrderBy::Field("timestamp".to_string())),
            )
            .await?;
        Ok(self.decode_all(docs))
    }
}
