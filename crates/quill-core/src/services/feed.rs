//! Feed aggregation - posts joined with their authors and comment threads.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::domain::{Comment, Page, PageRequest, Post, PostView};
use crate::error::{DomainError, RepoError};
use crate::ports::{CommentRepository, PostRepository, UserRepository};

/// Display name used when a post's author has no resolvable username.
pub const ANONYMOUS_AUTHOR: &str = "Anonymous";

/// Builds the denormalized "all posts" view.
///
/// Every call reads the full comment collection, one page of posts and one
/// batch of users. Cost grows with the total number of comments.
pub struct FeedReader {
    posts: Arc<dyn PostRepository>,
    comments: Arc<dyn CommentRepository>,
    users: Arc<dyn UserRepository>,
}

impl FeedReader {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        comments: Arc<dyn CommentRepository>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            posts,
            comments,
            users,
        }
    }

    /// Read one page of enriched posts.
    ///
    /// Any store failure aborts the whole read; no partial page is returned.
    pub async fn read(&self, page: &PageRequest) -> Result<Page<PostView>, DomainError> {
        let comments = self
            .comments
            .list_by_timestamp()
            .await
            .map_err(unavailable)?;
        let mut threads = group_comments(comments);

        let posts = self.posts.list(page).await.map_err(unavailable)?;

        let author_ids = distinct_authors(&posts.items);
        let authors: HashMap<String, String> = if author_ids.is_empty() {
            HashMap::new()
        } else {
            self.users
                .find_many(&author_ids)
                .await
                .map_err(unavailable)?
                .into_iter()
                .filter_map(|user| user.username.map(|name| (user.id, name)))
                .collect()
        };

        tracing::debug!(
            posts = posts.items.len(),
            authors = authors.len(),
            threads = threads.len(),
            "Assembled feed page"
        );

        Ok(posts.map(|mut post| {
            post.author = Some(
                authors
                    .get(&post.author_uid)
                    .cloned()
                    .unwrap_or_else(|| ANONYMOUS_AUTHOR.to_string()),
            );
            let comments = threads.remove(&post.id).unwrap_or_default();
            PostView { post, comments }
        }))
    }
}

/// Group comments by post id, each group ordered by timestamp ascending.
///
/// The sort is stable, so comments sharing a timestamp keep their input order.
pub fn group_comments(comments: Vec<Comment>) -> HashMap<String, Vec<Comment>> {
    let mut threads: HashMap<String, Vec<Comment>> = HashMap::new();
    for comment in comments {
        threads
            .entry(comment.post_id.clone())
            .or_default()
            .push(comment);
    }
    for thread in threads.values_mut() {
        thread.sort_by_key(|c| c.timestamp);
    }
    threads
}

fn distinct_authors(posts: &[Post]) -> Vec<String> {
    posts
        .iter()
        .map(|p| p.author_uid.as_str())
        .filter(|uid| !uid.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(String::from)
        .collect()
}

fn unavailable(err: RepoError) -> DomainError {
    tracing::error!(error = %err, "Feed read failed");
    DomainError::Unavailable(err.to_string())
}
