//! # Quill Infrastructure
//!
//! Concrete implementations of the ports defined in `quill-core`.
//! This crate contains the document stores, the repositories built on them,
//! and the identity-provider and media-host integrations.
//!
//! ## Feature Flags
//!
//! - `full` (default) - All features enabled
//! - `minimal` - No external services, in-memory only
//! - `firebase` - Cloud Firestore store and Firebase identity provider
//! - `cloudinary` - Cloudinary media host

pub mod auth;
pub mod identity;
pub mod media;
pub mod repository;
pub mod store;

// Re-exports - In-Memory
pub use auth::{Argon2PasswordService, JwtConfig, JwtTokenService};
pub use identity::MemoryIdentityProvider;
pub use media::MemoryMediaHost;
pub use repository::{DocumentCommentRepository, DocumentPostRepository, DocumentUserRepository};
pub use store::{DocumentStore, MemoryDocumentStore};

// Re-exports - Hosted services
#[cfg(feature = "firebase")]
pub use identity::FirebaseIdentityProvider;
#[cfg(feature = "cloudinary")]
pub use media::{CloudinaryConfig, CloudinaryConfigError, CloudinaryMediaHost};
#[cfg(feature = "firebase")]
pub use store::{CredentialsError, FirestoreStore, ServiceAccount};
