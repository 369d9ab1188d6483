//! In-memory document store - used for local development and tests.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde_json::Value;
use tokio::sync::RwLock;

use quill_core::error::RepoError;
use quill_core::ports::IncrementOutcome;

use super::{Document, DocumentStore, OrderBy, Query, StoredDocument};

#[derive(Default)]
struct Inner {
    collections: HashMap<String, BTreeMap<String, Document>>,
    last_stamp: Option<DateTime<Utc>>,
}

impl Inner {
    /// Server clock that never repeats, so timestamp ordering is total.
    fn next_stamp(&mut self) -> String {
        let mut now = Utc::now();
        if let Some(last) = self.last_stamp {
            if now <= last {
                now = last + Duration::microseconds(1);
            }
        }
        self.last_stamp = Some(now);
        now.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    fn put(
        &mut self,
        collection: &str,
        id: String,
        mut fields: Document,
        stamp: Option<&str>,
    ) -> StoredDocument {
        if let Some(field) = stamp {
            let now = self.next_stamp();
            fields.insert(field.to_string(), Value::String(now));
        }
        self.collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), fields.clone());
        StoredDocument { id, fields }
    }
}

/// In-memory store: collections of ordered maps behind an async RwLock.
///
/// Transactions are serialized by holding the write lock for their whole
/// duration, so they never conflict.
/// Note: Data is lost on process restart.
pub struct MemoryDocumentStore {
    inner: RwLock<Inner>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, RepoError> {
        let inner = self.inner.read().await;
        Ok(inner
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    async fn get_many(
        &self,
        collection: &str,
        ids: &[String],
    ) -> Result<Vec<StoredDocument>, RepoError> {
        let inner = self.inner.read().await;
        let Some(docs) = inner.collections.get(collection) else {
            return Ok(Vec::new());
        };
        Ok(ids
            .iter()
            .filter_map(|id| {
                docs.get(id).map(|fields| StoredDocument {
                    id: id.clone(),
                    fields: fields.clone(),
                })
            })
            .collect())
    }

    async fn insert(
        &self,
        collection: &str,
        fields: Document,
        stamp: Option<&str>,
    ) -> Result<StoredDocument, RepoError> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        let mut inner = self.inner.write().await;
        Ok(inner.put(collection, id, fields, stamp))
    }

    async fn set(
        &self,
        collection: &str,
        id: &str,
        fields: Document,
        stamp: Option<&str>,
    ) -> Result<StoredDocument, RepoError> {
        let mut inner = self.inner.write().await;
        Ok(inner.put(collection, id.to_string(), fields, stamp))
    }

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<StoredDocument>, RepoError> {
        let inner = self.inner.read().await;
        let Some(docs) = inner.collections.get(collection) else {
            return Ok(Vec::new());
        };

        let mut matched: Vec<StoredDocument> = docs
            .iter()
            .filter(|(_, fields)| match &query.filter {
                Some((field, value)) => fields.get(field) == Some(value),
                None => true,
            })
            .filter(|(id, _)| match (&query.order_by, &query.after) {
                (Some(OrderBy::Id), Some(cursor)) => id.as_str() > cursor.as_str(),
                _ => true,
            })
            .map(|(id, fields)| StoredDocument {
                id: id.clone(),
                fields: fields.clone(),
            })
            .collect();

        if let Some(OrderBy::Field(field)) = &query.order_by {
            matched.retain(|doc| doc.fields.contains_key(field));
            // Ties fall back to id order, which the BTreeMap already gives.
            matched.sort_by(|a, b| compare_values(&a.fields[field], &b.fields[field]));
        }

        if let Some(limit) = query.limit {
            matched.truncate(limit);
        }

        Ok(matched)
    }

    async fn increment(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        by: i64,
    ) -> Result<IncrementOutcome, RepoError> {
        let mut inner = self.inner.write().await;
        let doc = inner
            .collections
            .entry(collection.to_string())
            .or_default();

        let existed = doc.contains_key(id);
        let fields = doc.entry(id.to_string()).or_default();
        let current = fields.get(field).filter(|v| v.is_number()).cloned();
        let was_numeric = current.is_some();

        let next = match current {
            Some(Value::Number(n)) if n.is_f64() => Value::from(n.as_f64().unwrap_or(0.0) + by as f64),
            Some(Value::Number(n)) => Value::from(n.as_i64().unwrap_or(0).saturating_add(by)),
            _ => Value::from(by),
        };
        fields.insert(field.to_string(), next);

        Ok(IncrementOutcome {
            existed,
            was_numeric,
        })
    }
}

/// Cross-type ordering close to what hosted document stores use:
/// null < bool < number < string < array < object.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }

    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}
