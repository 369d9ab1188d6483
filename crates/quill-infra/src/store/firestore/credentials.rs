//! Service-account credentials and OAuth2 access tokens.
//!
//! A signed RS256 assertion is exchanged at the account's token endpoint for
//! a short-lived bearer token, which is cached until shortly before it
//! expires.

use std::path::{Path, PathBuf};

use chrono::{TimeDelta, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use quill_core::error::RepoError;

const DATASTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Refresh this long before the provider-stated expiry.
const REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Debug, thiserror::Error)]
pub enum CredentialsError {
    #[error("Credential file not found: {0}")]
    NotFound(PathBuf),

    #[error("Credential file unreadable: {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Credential file is not a service account: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid private key: {0}")]
    Key(String),
}

/// The subset of a service-account key file this crate needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccount {
    pub project_id: String,
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccount {
    /// Load a key file, expanding a leading `~`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CredentialsError> {
        let path = expand_home(path.as_ref());
        if !path.is_file() {
            return Err(CredentialsError::NotFound(path));
        }
        let raw = std::fs::read_to_string(&path).map_err(|source| CredentialsError::Io {
            path: path.clone(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, CredentialsError> {
        Ok(serde_json::from_str(raw)?)
    }
}

fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), std::env::var_os("HOME")) {
        (Ok(rest), Some(home)) => PathBuf::from(home).join(rest),
        _ => path.to_path_buf(),
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

struct CachedToken {
    value: String,
    refresh_at: chrono::DateTime<Utc>,
}

/// Mints and caches access tokens for one service account.
pub struct TokenSource {
    account: ServiceAccount,
    key: EncodingKey,
    http: reqwest::Client,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenSource {
    /// Fails if the account's private key is not a valid RSA PEM.
    pub fn new(account: ServiceAccount, http: reqwest::Client) -> Result<Self, CredentialsError> {
        let key = EncodingKey::from_rsa_pem(account.private_key.as_bytes())
            .map_err(|e| CredentialsError::Key(e.to_string()))?;

        Ok(Self {
            account,
            key,
            http,
            cached: Mutex::new(None),
        })
    }

    pub fn project_id(&self) -> &str {
        &self.account.project_id
    }

    /// A bearer token valid for at least the refresh margin.
    pub async fn access_token(&self) -> Result<String, RepoError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if Utc::now() < token.refresh_at {
                return Ok(token.value.clone());
            }
        }

        let assertion = self.assertion()?;
        tracing::debug!(client_email = %self.account.client_email, "Requesting access token");

        let response = self
            .http
            .post(&self.account.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await
            .map_err(|e| RepoError::Connection(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(%status, "Token exchange rejected");
            return Err(RepoError::Connection(format!(
                "token exchange failed ({status}): {body}"
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| RepoError::Connection(e.to_string()))?;

        let lifetime = (token.expires_in - REFRESH_MARGIN_SECS).max(0);
        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            refresh_at: Utc::now() + TimeDelta::seconds(lifetime),
        });

        Ok(token.access_token)
    }

    fn assertion(&self) -> Result<String, RepoError> {
        let now = Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: &self.account.client_email,
            scope: DATASTORE_SCOPE,
            aud: &self.account.token_uri,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };

        encode(&Header::new(Algorithm::RS256), &claims, &self.key)
            .map_err(|e| RepoError::Connection(format!("cannot sign assertion: {e}")))
    }
}

#[cfg(test)]
impl TokenSource {
    /// A source that is never asked for a token.
    pub(crate) fn for_tests() -> Self {
        Self {
            account: ServiceAccount {
                project_id: "p".to_string(),
                client_email: "svc@p.iam.gserviceaccount.com".to_string(),
                private_key: String::new(),
                token_uri: default_token_uri(),
            },
            key: EncodingKey::from_secret(b"unused"),
            http: reqwest::Client::new(),
            cached: Mutex::new(None),
        }
    }
}
