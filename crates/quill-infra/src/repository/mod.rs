//! Typed repositories on top of a document store.

mod base;
pub mod documents;

pub use base::{DocumentRepository, Entity};
pub use documents::{DocumentCommentRepository, DocumentPostRepository, DocumentUserRepository};

#[cfg(test)]
mod tests;
