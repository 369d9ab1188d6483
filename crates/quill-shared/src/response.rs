//! Standardized API response types (RFC 7807 compliant for errors).

use serde::{Deserialize, Serialize};

/// Success envelope: a human-readable message next to the payload fields.
///
/// The payload is flattened, so `MessageResponse::new("Post liked", like)`
/// serializes as `{"message": "Post liked", "post_id": ..., "likes": ...}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse<T> {
    pub message: String,
    #[serde(flatten)]
    pub data: T,
}

impl<T> MessageResponse<T> {
    pub fn new(message: impl Into<String>, data: T) -> Self {
        Self {
            message: message.into(),
            data,
        }
    }
}

/// RFC 7807 Problem Details for HTTP APIs.
///
/// See: https://datatracker.ietf.org/doc/html/rfc7807
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// A URI reference that identifies the problem type.
    #[serde(rename = "type")]
    pub error_type: String,

    /// A short, human-readable summary of the problem type.
    pub title: String,

    /// The HTTP status code.
    pub status: u16,

    /// A human-readable explanation specific to this occurrence.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ErrorResponse {
    pub fn new(status: u16, title: impl Into<String>) -> Self {
        Self {
            error_type: "about:blank".to_string(),
            title: title.into(),
            status,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    // Common error constructors
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(400, "Bad Request").with_detail(detail)
    }

    pub fn unauthorized(detail: impl Into<String>) -> Self {
        Self::new(401, "Unauthorized").with_detail(detail)
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new(404, "Not Found").with_detail(detail)
    }

    pub fn payload_too_large(detail: impl Into<String>) -> Self {
        Self::new(413, "Payload Too Large").with_detail(detail)
    }

    pub fn internal_error() -> Self {
        Self::new(500, "Internal Server Error")
    }

    pub fn bad_gateway(detail: impl Into<String>) -> Self {
        Self::new(502, "Bad Gateway").with_detail(detail)
    }

    pub fn service_unavailable(detail: impl Into<String>) -> Self {
        Self::new(503, "Service Unavailable").with_detail(detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_response_flattens_payload() {
        let body = MessageResponse::new("Post liked successfully", json!({ "likes": 3 }));
        let value = serde_json::to_value(body).unwrap();
        assert_eq!(value, json!({ "message": "Post liked successfully", "likes": 3 }));
    }

    #[test]
    fn test_error_response_skips_empty_fields() {
        let value = serde_json::to_value(ErrorResponse::internal_error()).unwrap();
        assert_eq!(value["status"], 500);
        assert_eq!(value["type"], "about:blank");
        assert!(value.get("detail").is_none());
    }
}
