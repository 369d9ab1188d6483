//! Authentication handlers - signup and login proxied to the identity provider.

use actix_web::{HttpResponse, web};
use serde::Serialize;

use quill_core::domain::User;
use quill_core::ports::{IdentityError, IdentitySession};
use quill_shared::dto::AuthRequest;

use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

/// The provider's session, passed through, plus the stored username.
#[derive(Serialize)]
struct SessionResponse {
    #[serde(flatten)]
    session: IdentitySession,
    username: Option<String>,
}

/// POST /signup
pub async fn signup(state: web::Data<AppState>, body: web::Json<AuthRequest>) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    let session = state.identity.sign_up(&req.email, &req.password).await?;

    state
        .users
        .save(User::new(
            session.local_id.clone(),
            req.email,
            req.username.clone(),
        ))
        .await?;

    tracing::info!(local_id = %session.local_id, "Account created");

    Ok(HttpResponse::Ok().json(SessionResponse {
        session,
        username: req.username,
    }))
}

/// POST /login
pub async fn login(state: web::Data<AppState>, body: web::Json<AuthRequest>) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    let session = state
        .identity
        .sign_in(&req.email, &req.password)
        .await
        .map_err(|e| match e {
            IdentityError::Rejected(reason) => {
                tracing::debug!(reason = %reason, "Login rejected");
                AppError::Unauthorized("Invalid credentials".to_string())
            }
            other => AppError::from(other),
        })?;

    let username = state
        .users
        .find_by_id(&session.local_id)
        .await?
        .and_then(|user| user.username);

    Ok(HttpResponse::Ok().json(SessionResponse { session, username }))
}
