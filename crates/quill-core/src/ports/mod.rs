//! Ports - trait definitions for external dependencies.
//! These are the "interfaces" that infrastructure must implement.

mod auth;
mod identity;
mod media;
mod repository;

pub use auth::{AuthError, PasswordService, TokenClaims, TokenService};
pub use identity::{IdentityError, IdentityProvider, IdentitySession};
pub use media::{MediaError, MediaHost, MediaUpload};
pub use repository::{CommentRepository, IncrementOutcome, PostRepository, UserRepository};
