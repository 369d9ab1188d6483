//! Media host port - stores uploaded files and hands back public URLs.

use async_trait::async_trait;

/// A file received from a client, fully buffered.
#[derive(Debug, Clone)]
pub struct MediaUpload {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[async_trait]
pub trait MediaHost: Send + Sync {
    /// Upload one file and return its publicly addressable URL.
    async fn upload(&self, file: MediaUpload) -> Result<String, MediaError>;
}

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("Media host unreachable: {0}")]
    Transport(String),

    #[error("Media host rejected upload: {0}")]
    Rejected(String),
}
