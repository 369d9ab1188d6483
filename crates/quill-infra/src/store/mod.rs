//! Document stores - schema-less collections of JSON objects.
//!
//! Repositories talk to a [`DocumentStore`]; which backend sits behind it is
//! decided once at startup.

mod memory;

#[cfg(feature = "firebase")]
mod firestore;

use async_trait::async_trait;
use serde_json::Value;

use quill_core::error::RepoError;
use quill_core::ports::IncrementOutcome;

pub use memory::MemoryDocumentStore;

#[cfg(feature = "firebase")]
pub use firestore::{CredentialsError, FirestoreStore, ServiceAccount};

/// Field map of one document.
pub type Document = serde_json::Map<String, Value>;

/// A document together with its id within the collection.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub fields: Document,
}

/// Sort key for a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderBy {
    /// Document id, ascending.
    Id,
    /// A field, ascending. Documents without the field are left out.
    Field(String),
}

/// A single-collection query: optional equality filter, ordering and paging.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filter: Option<(String, Value)>,
    pub order_by: Option<OrderBy>,
    /// Id cursor; only meaningful with [`OrderBy::Id`].
    pub after: Option<String>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter = Some((field.into(), value.into()));
        self
    }

    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order_by = Some(order);
        self
    }

    pub fn after(mut self, cursor: Option<String>) -> Self {
        self.after = cursor;
        self
    }

    pub fn limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }
}

/// Abstraction over a managed document database.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read one document.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, RepoError>;

    /// Read several documents by id in one call. Missing ids are skipped.
    async fn get_many(
        &self,
        collection: &str,
        ids: &[String],
    ) -> Result<Vec<StoredDocument>, RepoError>;

    /// Create a document under a fresh store-assigned id.
    ///
    /// When `stamp` names a field, the store writes its own current time there.
    async fn insert(
        &self,
        collection: &str,
        fields: Document,
        stamp: Option<&str>,
    ) -> Result<StoredDocument, RepoError>;

    /// Create or replace the document at `id`.
    async fn set(
        &self,
        collection: &str,
        id: &str,
        fields: Document,
        stamp: Option<&str>,
    ) -> Result<StoredDocument, RepoError>;

    /// Run a query against one collection.
    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<StoredDocument>, RepoError>;

    /// Atomically add `by` to a numeric field in a single transaction.
    ///
    /// A missing or non-numeric field is first set to 0, merged into the other
    /// fields; a missing document is created. Write conflicts are retried by
    /// the store and never surface to the caller.
    async fn increment(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        by: i64,
    ) -> Result<IncrementOutcome, RepoError>;
}
