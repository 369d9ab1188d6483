//! Hand-rolled repository double for service tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::domain::{Comment, NewComment, NewPost, Page, PageRequest, Post, User};
use crate::error::RepoError;
use crate::ports::{CommentRepository, IncrementOutcome, PostRepository, UserRepository};
use crate::services::{FeedReader, LikeCounter};

#[derive(Default)]
struct Data {
    posts: Vec<Post>,
    comments: Vec<Comment>,
    users: Vec<User>,
}

#[derive(Clone, Default)]
pub struct FakeStore {
    data: Arc<Mutex<Data>>,
    failing: bool,
}

impl FakeStore {
    pub fn with_posts(self, posts: Vec<Post>) -> Self {
        self.data.lock().unwrap().posts.extend(posts);
        self
    }

    pub fn with_comments(self, comments: Vec<Comment>) -> Self {
        self.data.lock().unwrap().comments.extend(comments);
        self
    }

    pub fn with_user(self, id: &str, username: Option<&str>) -> Self {
        self.data.lock().unwrap().users.push(User::new(
            id,
            format!("{id}@example.com"),
            username.map(String::from),
        ));
        self
    }

    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    pub fn feed_reader(&self) -> FeedReader {
        let shared = Arc::new(self.clone());
        FeedReader::new(shared.clone(), shared.clone(), shared)
    }

    pub fn like_counter(&self) -> LikeCounter {
        LikeCounter::new(Arc::new(self.clone()))
    }

    fn check(&self) -> Result<(), RepoError> {
        if self.failing {
            Err(RepoError::Connection("store offline".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl UserRepository for FakeStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, RepoError> {
        self.check()?;
        let data = self.data.lock().unwrap();
        Ok(data.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_many(&self, ids: &[String]) -> Result<Vec<User>, RepoError> {
        self.check()?;
        let data = self.data.lock().unwrap();
        Ok(data
            .users
            .iter()
            .filter(|u| ids.contains(&u.id))
            .cloned()
            .collect())
    }

    async fn save(&self, user: User) -> Result<User, RepoError> {
        self.check()?;
        self.data.lock().unwrap().users.push(user.clone());
        Ok(user)
    }
}

#[async_trait]
impl PostRepository for FakeStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<Post>, RepoError> {
        self.check()?;
        let data = self.data.lock().unwrap();
        Ok(data.posts.iter().find(|p| p.id == id).cloned())
    }

    async fn create(&self, post: NewPost) -> Result<Post, RepoError> {
        self.check()?;
        let mut data = self.data.lock().unwrap();
        let stored = Post {
            id: format!("p{}", data.posts.len() + 1),
            title: post.title,
            content: post.content,
            author_uid: post.author_uid,
            author: post.author,
            post_type: post.post_type,
            timestamp: None,
            file_urls: post.file_urls,
            tags: post.tags,
            likes_count: 0,
        };
        data.posts.push(stored.clone());
        Ok(stored)
    }

    async fn find_by_author(&self, author_uid: &str) -> Result<Vec<Post>, RepoError> {
        self.check()?;
        let data = self.data.lock().unwrap();
        Ok(data
            .posts
            .iter()
            .filter(|p| p.author_uid == author_uid)
            .cloned()
            .collect())
    }

    async fn list(&self, page: &PageRequest) -> Result<Page<Post>, RepoError> {
        self.check()?;
        let data = self.data.lock().unwrap();
        let mut posts: Vec<Post> = data
            .posts
            .iter()
            .filter(|p| page.after.as_deref().is_none_or(|after| p.id.as_str() > after))
            .cloned()
            .collect();
        posts.sort_by(|a, b| a.id.cmp(&b.id));
        if let Some(limit) = page.limit {
            posts.truncate(limit);
        }
        Ok(Page::from_items(posts, page, |p| p.id.clone()))
    }

    async fn increment_likes(&self, id: &str) -> Result<IncrementOutcome, RepoError> {
        self.check()?;
        let mut data = self.data.lock().unwrap();
        match data.posts.iter_mut().find(|p| p.id == id) {
            Some(post) => {
                post.likes_count += 1;
                Ok(IncrementOutcome {
                    existed: true,
                    was_numeric: true,
                })
            }
            None => {
                data.posts.push(Post {
                    id: id.to_string(),
                    likes_count: 1,
                    ..Default::default()
                });
                Ok(IncrementOutcome {
                    existed: false,
                    was_numeric: false,
                })
            }
        }
    }
}

#[async_trait]
impl CommentRepository for FakeStore {
    async fn create(&self, comment: NewComment) -> Result<Comment, RepoError> {
        self.check()?;
        let mut data = self.data.lock().unwrap();
        let stored = Comment {
            id: format!("c{}", data.comments.len() + 1),
            post_id: comment.post_id,
            user_id: comment.user_id,
            username: comment.username,
            text: comment.text,
            timestamp: None,
        };
        data.comments.push(stored.clone());
        Ok(stored)
    }

    async fn find_by_post(&self, post_id: &str) -> Result<Vec<Comment>, RepoError> {
        self.check()?;
        let data = self.data.lock().unwrap();
        Ok(data
            .comments
            .iter()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect())
    }

    async fn list_by_timestamp(&self) -> Result<Vec<Comment>, RepoError> {
        self.check()?;
        let data = self.data.lock().unwrap();
        let mut comments = data.comments.clone();
        comments.sort_by_key(|c| c.timestamp);
        Ok(comments)
    }
}
