//! Firebase Identity Toolkit REST client.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use quill_core::ports::{IdentityError, IdentityProvider, IdentitySession};

const DEFAULT_BASE_URL: &str = "https://identitytoolkit.googleapis.com/v1";

/// Email/password accounts through the Identity Toolkit `accounts:*` endpoints.
pub struct FirebaseIdentityProvider {
    api_key: String,
    base_url: String,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl FirebaseIdentityProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            http: reqwest::Client::new(),
        }
    }

    /// Point at another endpoint, e.g. the local auth emulator.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/accounts:{}?key={}", self.base_url, method, self.api_key)
    }

    async fn call(
        &self,
        method: &str,
        email: &str,
        password: &str,
        fallback: &str,
    ) -> Result<IdentitySession, IdentityError> {
        tracing::debug!(method, email = %email, "Calling identity provider");

        let response = self
            .http
            .post(self.endpoint(method))
            .json(&json!({
                "email": email,
                "password": password,
                "returnSecureToken": true,
            }))
            .send()
            .await
            .map_err(|e| IdentityError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<IdentitySession>()
                .await
                .map_err(|e| IdentityError::Internal(format!("unexpected response: {e}")));
        }

        let body = response.text().await.unwrap_or_default();
        if status.is_server_error() {
            tracing::error!(method, %status, body = %body, "Identity provider failed");
            return Err(IdentityError::Internal(format!("{status}: {body}")));
        }

        let message = provider_message(&body).unwrap_or_else(|| fallback.to_string());
        tracing::info!(method, %status, reason = %message, "Identity provider rejected request");
        Err(IdentityError::Rejected(message))
    }
}

/// Extract `error.message` from a provider error body.
fn provider_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .map(|envelope| envelope.error.message)
}

#[async_trait]
impl IdentityProvider for FirebaseIdentityProvider {
    async fn sign_up(&self, email: &str, password: &str) -> Result<IdentitySession, IdentityError> {
        self.call("signUp", email, password, "Signup failed").await
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<IdentitySession, IdentityError> {
        self.call("signInWithPassword", email, password, "Invalid credentials")
            .await
    }
}
