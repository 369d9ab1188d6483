use std::marker::PhantomData;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use quill_core::domain::{Comment, Post, User};
use quill_core::error::RepoError;

use crate::store::{Document, DocumentStore, StoredDocument};

/// A domain record kept in one collection of a document store.
pub trait Entity: DeserializeOwned + Send + Sync + 'static {
    const COLLECTION: &'static str;

    /// Adopt the store-assigned document id.
    fn set_id(&mut self, id: String);
}

impl Entity for User {
    const COLLECTION: &'static str = "users";

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

impl Entity for Post {
    const COLLECTION: &'static str = "posts";

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

impl Entity for Comment {
    const COLLECTION: &'static str = "comments";

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

/// Generic repository over any document store.
pub struct DocumentRepository<E>
where
    E: Entity,
{
    pub(crate) store: Arc<dyn DocumentStore>,
    _entity: PhantomData<E>,
}

impl<E> DocumentRepository<E>
where
    E: Entity,
{
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            _entity: PhantomData,
        }
    }

    pub(crate) fn decode(&self, doc: StoredDocument) -> Result<E, RepoError> {
        let mut entity: E = serde_json::from_value(Value::Object(doc.fields)).map_err(|e| {
            tracing::warn!(collection = E::COLLECTION, id = %doc.id, error = %e, "Undecodable document");
            RepoError::Serialization(e.to_string())
        })?;
        entity.set_id(doc.id);
        Ok(entity)
    }

    /// Decode a result set, skipping (and logging) documents that do not
    /// decode so one bad record cannot fail the whole read.
    pub(crate) fn decode_all(&self, docs: Vec<StoredDocument>) -> Vec<E> {
        docs.into_iter()
            .filter_map(|doc| self.decode(doc).ok())
            .collect()
    }

    pub(crate) async fn get(&self, id: &str) -> Result<Option<E>, RepoError> {
        match self.store.get(E::COLLECTION, id).await? {
            Some(fields) => self
                .decode(StoredDocument {
                    id: id.to_string(),
                    fields,
                })
                .map(Some),
            None => Ok(None),
        }
    }
}

/// Serialize a write payload into document fields.
pub(crate) fn to_fields<T: Serialize>(value: &T) -> Result<Document, RepoError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(other) => Err(RepoError::Serialization(format!(
            "expected an object, got {other}"
        ))),
        Err(e) => Err(RepoError::Serialization(e.to_string())),
    }
}
