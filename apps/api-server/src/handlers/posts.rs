//! Post, comment and like handlers.

use actix_multipart::Multipart;
use actix_web::{HttpResponse, web};
use futures::StreamExt;
use serde::Serialize;

use quill_core::domain::{NewComment, NewPost, PageRequest, Post, PostView};
use quill_core::ports::MediaUpload;
use quill_shared::MessageResponse;
use quill_shared::dto::{CommentCreated, CommentRequest, LikeRequest, ListPostsQuery};

use super::NEXT_CURSOR_HEADER;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

/// Cap for each non-file form field.
const MAX_TEXT_FIELD_BYTES: usize = 64 * 1024;

#[derive(Serialize)]
struct PostCreated {
    post_data: Post,
}

#[derive(Serialize)]
struct UserPosts {
    posts: Vec<Post>,
}

/// The multipart body of `POST /posts`.
#[derive(Debug, Default)]
struct PostForm {
    title: Option<String>,
    content: Option<String>,
    author_uid: Option<String>,
    post_type: Option<String>,
    tags: Option<String>,
    files: Vec<MediaUpload>,
}

impl PostForm {
    async fn read(mut payload: Multipart, max_file_bytes: usize) -> AppResult<Self> {
        let mut form = PostForm::default();

        while let Some(field) = payload.next().await {
            let mut field =
                field.map_err(|e| AppError::BadRequest(format!("Multipart error: {}", e)))?;

            let name = field.name().unwrap_or_default().to_string();
            let filename = field
                .content_disposition()
                .and_then(|cd| cd.get_filename())
                .map(str::to_string);
            let content_type = field.content_type().map(|mime| mime.to_string());

            let limit = if filename.is_some() {
                max_file_bytes
            } else {
                MAX_TEXT_FIELD_BYTES
            };
            let mut bytes = Vec::new();
            while let Some(chunk) = field.next().await {
                let data = chunk
                    .map_err(|e| AppError::BadRequest(format!("Multipart read error: {}", e)))?;
                if bytes.len() + data.len() > limit {
                    return Err(AppError::PayloadTooLarge(format!(
                        "Field `{}` exceeds {} bytes",
                        name, limit
                    )));
                }
                bytes.extend_from_slice(&data);
            }

            match (name.as_str(), filename) {
                ("files" | "files[]" | "file", Some(filename)) => {
                    // Browsers send an empty part when no file was picked.
                    if filename.is_empty() || bytes.is_empty() {
                        continue;
                    }
                    form.files.push(MediaUpload {
                        filename,
                        content_type,
                        bytes,
                    });
                }
                (_, Some(_)) => {
                    tracing::debug!(field = %name, "Ignoring unexpected file field");
                }
                (name, None) => {
                    let text = String::from_utf8(bytes).map_err(|_| {
                        AppError::BadRequest(format!("Field `{}` is not valid UTF-8", name))
                    })?;
                    match name {
                        "title" => form.title = Some(text),
                        "content" => form.content = Some(text),
                        "author_uid" => form.author_uid = Some(text),
                        "post_type" => form.post_type = Some(text),
                        "tags" => form.tags = Some(text),
                        _ => tracing::debug!(field = %name, "Ignoring unexpected form field"),
                    }
                }
            }
        }

        Ok(form)
    }
}

fn required(value: Option<String>, field: &str) -> AppResult<String> {
    value.ok_or_else(|| AppError::BadRequest(format!("Missing form field: {}", field)))
}

/// A post id from the path must name exactly one document.
fn post_id(path: web::Path<String>) -> AppResult<String> {
    checked_post_id(path.into_inner())
}

fn checked_post_id(id: String) -> AppResult<String> {
    if id.is_empty() || id == "." || id == ".." || id.contains('/') {
        return Err(AppError::BadRequest(format!("Invalid post id: {id}")));
    }
    Ok(id)
}

/// Tags arrive as a JSON-encoded string array; anything else means no tags.
fn parse_tags(raw: Option<&str>) -> Vec<String> {
    match raw {
        None => Vec::new(),
        Some(raw) => serde_json::from_str(raw).unwrap_or_else(|e| {
            tracing::debug!(error = %e, "Ignoring malformed tags");
            Vec::new()
        }),
    }
}

/// POST /posts
pub async fn create_post(state: web::Data<AppState>, payload: Multipart) -> AppResult<HttpResponse> {
    let form = PostForm::read(payload, state.max_upload_bytes).await?;

    let title = required(form.title, "title")?;
    let content = required(form.content, "content")?;
    let author_uid = required(form.author_uid, "author_uid")?;
    let post_type = required(form.post_type, "post_type")?;
    let tags = parse_tags(form.tags.as_deref());

    let author = state
        .users
        .find_by_id(&author_uid)
        .await?
        .and_then(|user| user.username);

    // Already-uploaded files are not removed if a later step fails.
    let mut file_urls = Vec::with_capacity(form.files.len());
    for file in form.files {
        file_urls.push(state.media.upload(file).await?);
    }

    let post = state
        .posts
        .create(NewPost {
            title,
            content,
            author_uid,
            author,
            post_type,
            file_urls,
            tags,
        })
        .await?;

    tracing::info!(post_id = %post.id, files = post.file_urls.len(), "Post created");

    Ok(HttpResponse::Ok().json(MessageResponse::new(
        "Post created successfully",
        PostCreated { post_data: post },
    )))
}

/// GET /users/{user_uid}/posts
pub async fn user_posts(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let posts = state.posts.find_by_author(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(UserPosts { posts }))
}

/// GET /posts
pub async fn list_posts(
    state: web::Data<AppState>,
    query: web::Query<ListPostsQuery>,
) -> AppResult<HttpResponse> {
    let query = query.into_inner();
    if query.limit == Some(0) {
        return Err(AppError::BadRequest("limit must be positive".to_string()));
    }

    let page = state
        .feed
        .read(&PageRequest {
            limit: query.limit,
            after: query.after,
        })
        .await?;

    let mut response = HttpResponse::Ok();
    if let Some(cursor) = &page.next_cursor {
        response.insert_header((NEXT_CURSOR_HEADER, cursor.as_str()));
    }
    Ok(response.json(page.items))
}

/// GET /posts/{post_id}
pub async fn get_post(state: web::Data<AppState>, path: web::Path<String>) -> AppResult<HttpResponse> {
    let post_id = post_id(path)?;

    let post = state
        .posts
        .find_by_id(&post_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Post {} not found", post_id)))?;
    let comments = state.comments.find_by_post(&post_id).await?;

    Ok(HttpResponse::Ok().json(PostView { post, comments }))
}

/// POST /posts/{post_id}/like
pub async fn like_post(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<LikeRequest>,
) -> AppResult<HttpResponse> {
    let outcome = state.likes.like(&post_id(path)?, &body.user_id).await?;
    Ok(HttpResponse::Ok().json(MessageResponse::new("Post liked successfully", outcome)))
}

/// POST /posts/{post_id}/comment
pub async fn comment_on_post(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<CommentRequest>,
) -> AppResult<HttpResponse> {
    let post_id = post_id(path)?;
    let CommentRequest { user_id, text } = body.into_inner();

    let username = state
        .users
        .find_by_id(&user_id)
        .await?
        .and_then(|user| user.username);

    let comment = state
        .comments
        .create(NewComment::new(post_id, user_id, username, text))
        .await?;

    tracing::info!(comment_id = %comment.id, post_id = %comment.post_id, "Comment posted");

    Ok(HttpResponse::Ok().json(MessageResponse::new(
        "Comment posted successfully",
        CommentCreated {
            comment_id: comment.id,
        },
    )))
}
