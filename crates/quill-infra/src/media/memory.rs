//! In-memory media host.

use async_trait::async_trait;
use tokio::sync::Mutex;

use quill_core::ports::{MediaError, MediaHost, MediaUpload};

/// Keeps uploads in memory and hands out `memory://media/<id>/<filename>` URLs.
#[derive(Default)]
pub struct MemoryMediaHost {
    uploads: Mutex<Vec<(String, MediaUpload)>>,
}

impl MemoryMediaHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// URLs handed out so far, in upload order.
    pub async fn urls(&self) -> Vec<String> {
        let uploads = self.uploads.lock().await;
        uploads.iter().map(|(url, _)| url.clone()).collect()
    }
}

#[async_trait]
impl MediaHost for MemoryMediaHost {
    async fn upload(&self, file: MediaUpload) -> Result<String, MediaError> {
        let name = file
            .filename
            .rsplit(['/', '\\'])
            .next()
            .filter(|name| !name.is_empty())
            .unwrap_or("upload")
            .to_string();
        let url = format!("memory://media/{}/{}", uuid::Uuid::new_v4().simple(), name);

        tracing::debug!(url = %url, size = file.bytes.len(), "Stored media in memory");
        self.uploads.lock().await.push((url.clone(), file));
        Ok(url)
    }
}
