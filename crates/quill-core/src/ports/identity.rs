//! Identity provider port - password sign-up and sign-in.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// The provider's answer to a successful sign-up or sign-in.
///
/// Field names follow the provider wire format so the response can be handed
/// back to clients as-is. Fields this service does not interpret are kept in
/// `extra` and round-trip untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentitySession {
    /// Stable subject id.
    pub local_id: String,
    /// Bearer token.
    pub id_token: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub refresh_token: String,
    /// Token lifetime in seconds, as a decimal string.
    #[serde(default)]
    pub expires_in: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create an account.
    async fn sign_up(&self, email: &str, password: &str) -> Result<IdentitySession, IdentityError>;

    /// Authenticate an existing account.
    async fn sign_in(&self, email: &str, password: &str) -> Result<IdentitySession, IdentityError>;
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// The provider refused the request (bad credentials, duplicate email...).
    #[error("{0}")]
    Rejected(String),

    #[error("Identity provider unreachable: {0}")]
    Transport(String),

    #[error("Identity provider error: {0}")]
    Internal(String),
}
