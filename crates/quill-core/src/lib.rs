//! # Quill Core
//!
//! The domain layer of the Quill backend.
//! Pure business logic: domain records, ports for the external collaborators
//! (identity provider, document store, media host) and the two services that
//! carry real behavior: feed aggregation and like counting.

pub mod domain;
pub mod error;
pub mod ports;
pub mod services;

pub use error::DomainError;
