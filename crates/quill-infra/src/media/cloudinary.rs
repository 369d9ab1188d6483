//! Cloudinary signed uploads.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha2::{Digest, Sha256};

use quill_core::ports::{MediaError, MediaHost, MediaUpload};

const API_BASE: &str = "https://api.cloudinary.com/v1_1";

#[derive(Debug, thiserror::Error)]
pub enum CloudinaryConfigError {
    #[error("CLOUDINARY_URL must look like cloudinary://<api_key>:<api_secret>@<cloud_name>")]
    Malformed,
}

/// Account settings, usually parsed from `CLOUDINARY_URL`.
#[derive(Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

impl std::fmt::Debug for CloudinaryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudinaryConfig")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"***")
            .finish()
    }
}

impl CloudinaryConfig {
    /// Parse `cloudinary://<api_key>:<api_secret>@<cloud_name>`.
    pub fn from_url(url: &str) -> Result<Self, CloudinaryConfigError> {
        let rest = url
            .trim()
            .strip_prefix("cloudinary://")
            .ok_or(CloudinaryConfigError::Malformed)?;
        let (credentials, cloud_name) = rest
            .rsplit_once('@')
            .ok_or(CloudinaryConfigError::Malformed)?;
        let (api_key, api_secret) = credentials
            .split_once(':')
            .ok_or(CloudinaryConfigError::Malformed)?;
        // Query parameters on the URL are not supported.
        let cloud_name = cloud_name.split(['?', '/']).next().unwrap_or_default();

        if api_key.is_empty() || api_secret.is_empty() || cloud_name.is_empty() {
            return Err(CloudinaryConfigError::Malformed);
        }

        Ok(Self {
            cloud_name: cloud_name.to_string(),
            api_key: api_key.to_string(),
            api_secret: api_secret.to_string(),
        })
    }
}

/// Hex SHA-256 over the sorted signed parameters followed by the secret.
fn sign(timestamp: i64, api_secret: &str) -> String {
    hex::encode(Sha256::digest(format!("timestamp={timestamp}{api_secret}").as_bytes()))
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Uploads to Cloudinary with automatic resource-type detection.
pub struct CloudinaryMediaHost {
    config: CloudinaryConfig,
    http: reqwest::Client,
}

impl CloudinaryMediaHost {
    pub fn new(config: CloudinaryConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    fn upload_url(&self) -> String {
        format!("{API_BASE}/{}/auto/upload", self.config.cloud_name)
    }
}

#[async_trait]
impl MediaHost for CloudinaryMediaHost {
    async fn upload(&self, file: MediaUpload) -> Result<String, MediaError> {
        let timestamp = chrono::Utc::now().timestamp();
        let size = file.bytes.len();

        let mut part = Part::bytes(file.bytes).file_name(file.filename.clone());
        if let Some(content_type) = file.content_type.as_deref() {
            part = part
                .mime_str(content_type)
                .map_err(|e| MediaError::Rejected(format!("bad content type: {e}")))?;
        }

        let form = Form::new()
            .part("file", part)
            .text("api_key", self.config.api_key.clone())
            .text("timestamp", timestamp.to_string())
            .text("signature_algorithm", "sha256")
            .text("signature", sign(timestamp, &self.config.api_secret));

        tracing::debug!(filename = %file.filename, size, "Uploading media");

        let response = self
            .http
            .post(self.upload_url())
            .multipart(form)
            .send()
            .await
            .map_err(|e| MediaError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|envelope| envelope.error.message)
                .unwrap_or(body);
            tracing::error!(%status, filename = %file.filename, reason = %message, "Media upload rejected");
            return Err(MediaError::Rejected(format!("{status}: {message}")));
        }

        let uploaded: UploadResponse = response
            .json()
            .await
            .map_err(|e| MediaError::Transport(format!("unexpected response: {e}")))?;

        tracing::info!(filename = %file.filename, url = %uploaded.secure_url, "Media uploaded");
        Ok(uploaded.secure_url)
    }
}
