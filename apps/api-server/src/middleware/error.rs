//! Error handling middleware - RFC 7807 compliant responses.

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use quill_core::error::{DomainError, RepoError};
use quill_core::ports::{IdentityError, MediaError};
use quill_shared::ErrorResponse;
use std::fmt;

/// Application-level error type that converts to RFC 7807 responses.
///
/// `Internal`, `BadGateway` and `ServiceUnavailable` carry the underlying
/// failure for the log only; clients get a fixed description.
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    BadRequest(String),
    Unauthorized(String),
    PayloadTooLarge(String),
    Internal(String),
    BadGateway(String),
    ServiceUnavailable(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::PayloadTooLarge(msg) => write!(f, "Payload too large: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
            AppError::BadGateway(msg) => write!(f, "Upstream error: {}", msg),
            AppError::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let error = match self {
            AppError::NotFound(detail) => ErrorResponse::not_found(detail),
            AppError::BadRequest(detail) => ErrorResponse::bad_request(detail),
            AppError::Unauthorized(detail) => ErrorResponse::unauthorized(detail),
            AppError::PayloadTooLarge(detail) => ErrorResponse::payload_too_large(detail),
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                ErrorResponse::internal_error()
            }
            AppError::BadGateway(detail) => {
                tracing::error!("Upstream service error: {}", detail);
                ErrorResponse::bad_gateway("An upstream service failed")
            }
            AppError::ServiceUnavailable(detail) => {
                tracing::error!("Read aborted: {}", detail);
                ErrorResponse::service_unavailable("Unable to load posts, try again later")
            }
        };

        HttpResponse::build(self.status_code()).json(error)
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::NotFound { entity_type, id } => {
                AppError::NotFound(format!("{} not found: {}", entity_type, id))
            }
            DomainError::Validation(msg) => AppError::BadRequest(msg),
            DomainError::Unavailable(msg) => AppError::ServiceUnavailable(msg),
            DomainError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound => AppError::NotFound("Resource not found".to_string()),
            other => AppError::Internal(format!("Store error: {}", other)),
        }
    }
}

/// Transport and provider faults only; rejections are mapped per route.
impl From<IdentityError> for AppError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::Rejected(msg) => AppError::BadRequest(msg),
            other => AppError::BadGateway(other.to_string()),
        }
    }
}

impl From<MediaError> for AppError {
    fn from(err: MediaError) -> Self {
        AppError::BadGateway(err.to_string())
    }
}

/// Result type alias for handlers.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    async fn body_of(err: AppError) -> serde_json::Value {
        let bytes = to_bytes(err.error_response().into_body()).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[actix_web::test]
    async fn test_internal_details_are_not_leaked() {
        let err = AppError::from(RepoError::Connection("10.0.0.3:443 refused".to_string()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_of(err).await;
        assert_eq!(body["status"], 500);
        assert!(!body.to_string().contains("10.0.0.3"));
    }

    #[actix_web::test]
    async fn test_unavailable_maps_to_503() {
        let err = AppError::from(DomainError::Unavailable("timeout".to_string()));
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);

        let body = body_of(err).await;
        assert_eq!(body["title"], "Service Unavailable");
        assert!(!body.to_string().contains("timeout"));
    }

    #[actix_web::test]
    async fn test_provider_rejection_is_passed_through() {
        let err = AppError::from(IdentityError::Rejected("EMAIL_EXISTS".to_string()));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(body_of(err).await["detail"], "EMAIL_EXISTS");
    }

    #[test]
    fn test_media_failure_is_bad_gateway() {
        let err = AppError::from(MediaError::Transport("dns".to_string()));
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
    }
}
