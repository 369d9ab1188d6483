//! Application state - shared across all handlers.

use std::sync::Arc;

use quill_core::ports::{CommentRepository, IdentityProvider, MediaHost, PostRepository, UserRepository};
use quill_core::services::{FeedReader, LikeCounter};
use quill_infra::{
    Argon2PasswordService, DocumentCommentRepository, DocumentPostRepository, DocumentStore,
    DocumentUserRepository, JwtConfig, JwtTokenService, MemoryDocumentStore,
    MemoryIdentityProvider, MemoryMediaHost,
};

#[cfg(feature = "full")]
use quill_infra::{CloudinaryMediaHost, FirebaseIdentityProvider, FirestoreStore};

use crate::config::{AppConfig, Backend, ConfigError};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub identity: Arc<dyn IdentityProvider>,
    pub users: Arc<dyn UserRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub comments: Arc<dyn CommentRepository>,
    pub media: Arc<dyn MediaHost>,
    pub feed: Arc<FeedReader>,
    pub likes: Arc<LikeCounter>,
    pub max_upload_bytes: usize,
}

impl AppState {
    /// Build the application state with the configured backend.
    pub fn new(config: &AppConfig) -> Result<Self, ConfigError> {
        let state = match &config.backend {
            #[cfg(feature = "full")]
            Backend::Firebase(settings) => {
                let store = FirestoreStore::new(settings.service_account.clone())?;
                tracing::info!(
                    project_id = %settings.service_account.project_id,
                    cloud_name = %settings.cloudinary.cloud_name,
                    "Using Firestore, Firebase Auth and Cloudinary"
                );
                Self::from_parts(
                    Arc::new(store),
                    Arc::new(FirebaseIdentityProvider::new(settings.web_api_key.clone())),
                    Arc::new(CloudinaryMediaHost::new(settings.cloudinary.clone())),
                    config.max_upload_bytes,
                )
            }
            Backend::Memory { jwt } => {
                tracing::warn!("Running with the in-memory backend; data is lost on restart");
                Self::in_memory(jwt.clone(), config.max_upload_bytes)
            }
        };

        tracing::info!(backend = config.backend.name(), "Application state initialized");
        Ok(state)
    }

    /// Everything in process, as used for local development and tests.
    pub fn in_memory(jwt: JwtConfig, max_upload_bytes: usize) -> Self {
        let identity = MemoryIdentityProvider::new(
            Arc::new(Argon2PasswordService::new()),
            Arc::new(JwtTokenService::new(jwt)),
        );

        Self::from_parts(
            Arc::new(MemoryDocumentStore::new()),
            Arc::new(identity),
            Arc::new(MemoryMediaHost::new()),
            max_upload_bytes,
        )
    }

    /// Wire repositories and services over a store and the two outside services.
    pub fn from_parts(
        store: Arc<dyn DocumentStore>,
        identity: Arc<dyn IdentityProvider>,
        media: Arc<dyn MediaHost>,
        max_upload_bytes: usize,
    ) -> Self {
        let users: Arc<dyn UserRepository> = Arc::new(DocumentUserRepository::new(store.clone()));
        let posts: Arc<dyn PostRepository> = Arc::new(DocumentPostRepository::new(store.clone()));
        let comments: Arc<dyn CommentRepository> =
            Arc::new(DocumentCommentRepository::new(store));

        Self {
            feed: Arc::new(FeedReader::new(posts.clone(), comments.clone(), users.clone())),
            likes: Arc::new(LikeCounter::new(posts.clone())),
            identity,
            users,
            posts,
            comments,
            media,
            max_upload_bytes,
        }
    }
}
