use std::sync::Arc;

use serde_json::{Value, json};

use quill_core::domain::{NewComment, NewPost, PageRequest, UNKNOWN_USERNAME, User};
use quill_core::ports::{CommentRepository, PostRepository, UserRepository};
use quill_core::services::{ANONYMOUS_AUTHOR, FeedReader, LikeCounter};

use crate::repository::{DocumentCommentRepository, DocumentPostRepository, DocumentUserRepository};
use crate::store::{Document, DocumentStore, MemoryDocumentStore};

struct Fixture {
    store: Arc<MemoryDocumentStore>,
    users: Arc<DocumentUserRepository>,
    posts: Arc<DocumentPostRepository>,
    comments: Arc<DocumentCommentRepository>,
}

impl Fixture {
    fn new() -> Self {
        let store = Arc::new(MemoryDocumentStore::new());
        let shared: Arc<dyn DocumentStore> = store.clone();
        Self {
            store,
            users: Arc::new(DocumentUserRepository::new(shared.clone())),
            posts: Arc::new(DocumentPostRepository::new(shared.clone())),
            comments: Arc::new(DocumentCommentRepository::new(shared)),
        }
    }

    fn feed(&self) -> FeedReader {
        FeedReader::new(self.posts.clone(), self.comments.clone(), self.users.clone())
    }

    fn likes(&self) -> LikeCounter {
        LikeCounter::new(self.posts.clone())
    }

    async fn post(&self, title: &str, author_uid: &str) -> String {
        self.posts
            .create(new_post(title, author_uid))
            .await
            .unwrap()
            .id
    }
}

fn new_post(title: &str, author_uid: &str) -> NewPost {
    NewPost {
        title: title.to_string(),
        content: format!("{title} body"),
        author_uid: author_uid.to_string(),
        author: None,
        post_type: "text".to_string(),
        file_urls: Vec::new(),
        tags: Vec::new(),
    }
}

fn fields(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        _ => Document::new(),
    }
}

#[tokio::test]
async fn test_create_post_assigns_id_and_timestamp() {
    let fx = Fixture::new();
    let mut post = new_post("Tagged", "u1");
    post.tags = vec!["a".to_string(), "b".to_string()];

    let created = fx.posts.create(post).await.unwrap();
    assert!(!created.id.is_empty());
    assert!(created.timestamp.is_some());
    assert_eq!(created.likes_count, 0);

    let stored = fx.posts.find_by_id(&created.id).await.unwrap().unwrap();
    assert_eq!(stored.tags, vec!["a", "b"]);
    assert!(stored.file_urls.is_empty());

    // No counter until the first like.
    let raw = fx.store.get("posts", &created.id).await.unwrap().unwrap();
    assert!(!raw.contains_key("likes_count"));
}

#[tokio::test]
async fn test_find_by_author_filters() {
    let fx = Fixture::new();
    fx.post("mine", "u1").await;
    fx.post("theirs", "u2").await;
    fx.post("mine too", "u1").await;

    let mine = fx.posts.find_by_author("u1").await.unwrap();
    assert_eq!(mine.len(), 2);
    assert!(mine.iter().all(|p| p.author_uid == "u1"));

    assert!(fx.posts.find_by_author("nobody").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_user_save_and_batch_lookup() {
    let fx = Fixture::new();
    fx.users
        .save(User::new("u1", "a@x.com", Some("alice".to_string())))
        .await
        .unwrap();
    fx.users.save(User::new("u2", "b@x.com", None)).await.unwrap();

    let found = fx.users.find_by_id("u1").await.unwrap().unwrap();
    assert_eq!(found.username.as_deref(), Some("alice"));
    assert!(found.created_at.is_some());

    let ids = vec!["u2".to_string(), "missing".to_string(), "u1".to_string()];
    let batch = fx.users.find_many(&ids).await.unwrap();
    assert_eq!(batch.len(), 2);
}

#[tokio::test]
async fn test_comments_by_post_and_timestamp() {
    let fx = Fixture::new();
    fx.comments
        .create(NewComment::new("p1", "u1", None, "first"))
        .await
        .unwrap();
    fx.comments
        .create(NewComment::new("p2", "u1", Some("alice".to_string()), "other"))
        .await
        .unwrap();
    fx.comments
        .create(NewComment::new("p1", "u2", Some("bob".to_string()), "second"))
        .await
        .unwrap();

    let thread = fx.comments.find_by_post("p1").await.unwrap();
    assert_eq!(thread.len(), 2);
    assert!(thread.iter().any(|c| c.username == "Unknown"));

    let all = fx.comments.list_by_timestamp().await.unwrap();
    let texts: Vec<_> = all.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(texts, vec!["first", "other", "second"]);
}

#[tokio::test]
async fn test_feed_attaches_threads_and_authors() {
    let fx = Fixture::new();
    fx.users
        .save(User::new("u1", "a@x.com", Some("alice".to_string())))
        .await
        .unwrap();
    let p1 = fx.post("Hello", "u1").await;
    let p2 = fx.post("Ghost", "u-gone").await;

    for text in ["one", "two", "three"] {
        fx.comments
            .create(NewComment::new(p1.clone(), "u2", Some("bob".to_string()), text))
            .await
            .unwrap();
    }

    let page = fx.feed().read(&PageRequest::all()).await.unwrap();
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.next_cursor, None);

    let hello = page.items.iter().find(|v| v.post.id == p1).unwrap();
    assert_eq!(hello.post.author.as_deref(), Some("alice"));
    let texts: Vec<_> = hello.comments.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(texts, vec!["one", "two", "three"]);

    let ghost = page.items.iter().find(|v| v.post.id == p2).unwrap();
    assert_eq!(ghost.post.author.as_deref(), Some(ANONYMOUS_AUTHOR));
    assert!(ghost.comments.is_empty());
}

#[tokio::test]
async fn test_feed_pages_are_disjoint() {
    let fx = Fixture::new();
    for i in 0..5 {
        fx.post(&format!("post {i}"), "u1").await;
    }

    let feed = fx.feed();
    let first = feed.read(&PageRequest::first(2)).await.unwrap();
    assert_eq!(first.items.len(), 2);
    let cursor = first.next_cursor.clone().unwrap();

    let second = feed
        .read(&PageRequest::first(2).after(cursor))
        .await
        .unwrap();
    assert_eq!(second.items.len(), 2);

    let last = feed
        .read(&PageRequest::first(2).after(second.next_cursor.clone().unwrap()))
        .await
        .unwrap();
    assert_eq!(last.items.len(), 1);
    assert_eq!(last.next_cursor, None);

    let mut ids: Vec<_> = first
        .items
        .iter()
        .chain(&second.items)
        .chain(&last.items)
        .map(|v| v.post.id.clone())
        .collect();
    ids.dedup();
    assert_eq!(ids.len(), 5);
    assert!(ids.windows(2).all(|w| w[0] < w[1]));
}

#[tokio::test]
async fn test_first_like_materializes_counter() {
    let fx = Fixture::new();
    let id = fx.post("Fresh", "u1").await;

    let outcome = fx.likes().like(&id, "u2").await.unwrap();
    assert_eq!(outcome.likes, 1);

    let raw = fx.store.get("posts", &id).await.unwrap().unwrap();
    assert_eq!(raw.get("likes_count"), Some(&json!(1)));
    assert_eq!(raw.get("title"), Some(&json!("Fresh")));
}

#[tokio::test]
async fn test_like_adds_one_per_call() {
    let fx = Fixture::new();
    let id = fx.post("Popular", "u1").await;
    let likes = fx.likes();

    for expected in 1..=3 {
        let outcome = likes.like(&id, "same-user").await.unwrap();
        assert_eq!(outcome.likes, expected);
    }
}

#[tokio::test]
async fn test_like_resets_mistyped_counter() {
    let fx = Fixture::new();
    fx.store
        .set(
            "posts",
            "p1",
            fields(json!({ "title": "Odd", "author_uid": "u1", "likes_count": "lots" })),
            None,
        )
        .await
        .unwrap();

    let outcome = fx.likes().like("p1", "u2").await.unwrap();
    assert_eq!(outcome.likes, 1);

    let post = fx.posts.find_by_id("p1").await.unwrap().unwrap();
    assert_eq!(post.title, "Odd");
}

#[tokio::test]
async fn test_like_on_missing_post_leaves_readable_document() {
    let fx = Fixture::new();

    let outcome = fx.likes().like("ghost", "u1").await.unwrap();
    assert_eq!(outcome.likes, 1);

    // The partial document must not break the feed.
    let page = fx.feed().read(&PageRequest::all()).await.unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].post.id, "ghost");
    assert_eq!(page.items[0].post.likes_count, 1);
    assert_eq!(page.items[0].post.author.as_deref(), Some(ANONYMOUS_AUTHOR));
}

#[tokio::test]
async fn test_null_comment_username_reads_as_unknown() {
    let fx = Fixture::new();
    let id = fx.post("Legacy", "u1").await;
    fx.store
        .set(
            "comments",
            "c1",
            fields(json!({
                "post_id": id,
                "user_id": "u9",
                "username": null,
                "text": "hi",
                "timestamp": "2024-01-01T00:00:00Z"
            })),
            None,
        )
        .await
        .unwrap();

    let thread = fx.comments.find_by_post(&id).await.unwrap();
    assert_eq!(thread.len(), 1);
    assert_eq!(thread[0].username, UNKNOWN_USERNAME);

    let page = fx.feed().read(&PageRequest::all()).await.unwrap();
    assert_eq!(page.items[0].comments.len(), 1);
    assert_eq!(page.items[0].comments[0].username, UNKNOWN_USERNAME);
}

#[tokio::test]
async fn test_undecodable_documents_are_skipped_on_reads() {
    let fx = Fixture::new();
    let id = fx.post("Good", "u1").await;
    fx.store
        .set("posts", "broken", fields(json!({ "title": 42, "author_uid": "u1" })), None)
        .await
        .unwrap();
    fx.store
        .set(
            "comments",
            "bad",
            fields(json!({ "post_id": id, "text": ["not", "text"] })),
            None,
        )
        .await
        .unwrap();
    fx.comments
        .create(NewComment::new(id.clone(), "u2", None, "fine"))
        .await
        .unwrap();

    let by_author = fx.posts.find_by_author("u1").await.unwrap();
    assert_eq!(by_author.len(), 1);
    assert_eq!(by_author[0].id, id);

    let thread = fx.comments.find_by_post(&id).await.unwrap();
    assert_eq!(thread.len(), 1);
    assert_eq!(thread[0].text, "fine");

    let page = fx.feed().read(&PageRequest::all()).await.unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].post.id, id);
}

#[tokio::test]
async fn test_skipped_document_does_not_end_paging() {
    let fx = Fixture::new();
    for id in ["a", "c", "d"] {
        fx.store
            .set("posts", id, fields(json!({ "title": id, "author_uid": "u1" })), None)
            .await
            .unwrap();
    }
    fx.store
        .set("posts", "b", fields(json!({ "title": 7 })), None)
        .await
        .unwrap();

    let first = fx.posts.list(&PageRequest::first(2)).await.unwrap();
    assert_eq!(first.items.len(), 1);
    assert_eq!(first.next_cursor.as_deref(), Some("b"));

    let rest = fx
        .posts
        .list(&PageRequest::first(2).after("b"))
        .await
        .unwrap();
    let ids: Vec<_> = rest.items.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["c", "d"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_likes_are_not_lost() {
    let fx = Fixture::new();
    let id = fx.post("Viral", "u1").await;
    let likes = Arc::new(fx.likes());

    let tasks = (0..50).map(|i| {
        let likes = likes.clone();
        let id = id.clone();
        tokio::spawn(async move { likes.like(&id, &format!("user-{i}")).await })
    });
    for result in futures::future::join_all(tasks).await {
        result.unwrap().unwrap();
    }

    let post = fx.posts.find_by_id(&id).await.unwrap().unwrap();
    assert_eq!(post.likes_count, 50);
}
