//! Cloud Firestore backend.

mod client;
mod credentials;
mod value;

pub use client::FirestoreStore;
pub use credentials::{CredentialsError, ServiceAccount};
