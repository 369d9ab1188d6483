//! HTTP handlers and route configuration.

mod auth;
mod health;
mod posts;


use actix_web::web;

use crate::middleware::error::AppError;

/// Response header carrying the cursor for the next page of `GET /posts`.
pub const NEXT_CURSOR_HEADER: &str = "X-Next-Cursor";

/// Configure all application routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()),
    )
    .route("/health", web::get().to(health::health_check))
    // Accounts
    .route("/signup", web::post().to(auth::signup))
    .route("/login", web::post().to(auth::login))
    // Posts
    .route("/posts", web::post().to(posts::create_post))
    .route("/posts", web::get().to(posts::list_posts))
    .route("/posts/{post_id}", web::get().to(posts::get_post))
    .route("/posts/{post_id}/like", web::post().to(posts::like_post))
    .route("/posts/{post_id}/comment", web::post().to(posts::comment_on_post))
    .route("/users/{user_uid}/posts", web::get().to(posts::user_posts));
}
