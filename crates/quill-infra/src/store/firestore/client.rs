//! Cloud Firestore document store over the REST v1 API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::Deserialize;
use serde_json::{Value, json};

use quill_core::error::RepoError;
use quill_core::ports::IncrementOutcome;

use super::credentials::{CredentialsError, ServiceAccount, TokenSource};
use super::value::{decode_fields, encode, encode_fields};
use crate::store::{Document, DocumentStore, OrderBy, Query, StoredDocument};

const API_ROOT: &str = "https://firestore.googleapis.com/v1";
/// Attempts for one transaction before giving up on contention.
const MAX_TRANSACTION_ATTEMPTS: u32 = 5;
const RETRY_BACKOFF: Duration = Duration::from_millis(50);

/// Firestore-backed document store.
pub struct FirestoreStore {
    http: Client,
    tokens: TokenSource,
    /// `projects/{project}/databases/(default)/documents`
    root: String,
    api_root: String,
}

/// Failure of one REST call, before mapping into [`RepoError`].
#[derive(Debug)]
enum CallError {
    Transport(String),
    Status { status: StatusCode, body: String },
}

impl CallError {
    fn is_aborted(&self) -> bool {
        matches!(self, CallError::Status { status, .. } if *status == StatusCode::CONFLICT)
    }
}

impl From<CallError> for RepoError {
    fn from(err: CallError) -> Self {
        match err {
            CallError::Transport(msg) => RepoError::Connection(msg),
            CallError::Status { status, body } => RepoError::Query(format!("{status}: {body}")),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawDocument {
    name: String,
    #[serde(default)]
    fields: serde_json::Map<String, Value>,
}

impl RawDocument {
    fn into_stored(self) -> StoredDocument {
        let id = self
            .name
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string();
        StoredDocument {
            id,
            fields: decode_fields(&self.fields),
        }
    }
}

#[derive(Debug, Deserialize)]
struct QueryRow {
    document: Option<RawDocument>,
}

#[derive(Debug, Deserialize)]
struct BatchGetRow {
    found: Option<RawDocument>,
}

#[derive(Debug, Deserialize)]
struct BeginTransactionResponse {
    transaction: String,
}

impl FirestoreStore {
    /// Build a store for the account's project.
    ///
    /// Fails fast on an invalid private key; no network call is made here.
    pub fn new(account: ServiceAccount) -> Result<Self, CredentialsError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());
        let root = format!(
            "projects/{}/databases/(default)/documents",
            account.project_id
        );
        let tokens = TokenSource::new(account, http.clone())?;

        tracing::info!(project = %tokens.project_id(), "Firestore store configured");

        Ok(Self {
            http,
            tokens,
            root,
            api_root: API_ROOT.to_string(),
        })
    }

    fn doc_name(&self, collection: &str, id: &str) -> String {
        format!("{}/{}/{}", self.root, collection, id)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_root, path)
    }

    /// REST URL of one document, with the id percent-encoded as a single path segment.
    fn doc_url(&self, collection: &str, id: &str) -> Result<Url, CallError> {
        let mut url = Url::parse(&self.url(&format!("{}/{}", self.root, collection)))
            .map_err(|e| CallError::Transport(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| CallError::Transport("document URL has no path".to_string()))?
            .push(id);
        Ok(url)
    }

    async fn call(&self, request: RequestBuilder) -> Result<reqwest::Response, CallError> {
        let token = self
            .tokens
            .access_token()
            .await
            .map_err(|e| CallError::Transport(e.to_string()))?;

        let response = request
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| CallError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(CallError::Status { status, body })
        }
    }

    async fn call_json<T: serde::de::DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, CallError> {
        self.call(request)
            .await?
            .json()
            .await
            .map_err(|e| CallError::Transport(e.to_string()))
    }

    async fn fetch(
        &self,
        collection: &str,
        id: &str,
        transaction: Option<&str>,
    ) -> Result<Option<Document>, CallError> {
        let mut request = self.http.get(self.doc_url(collection, id)?);
        if let Some(txn) = transaction {
            request = request.query(&[("transaction", txn)]);
        }

        match self.call_json::<RawDocument>(request).await {
            Ok(raw) => Ok(Some(raw.into_stored().fields)),
            Err(CallError::Status { status, .. }) if status == StatusCode::NOT_FOUND => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn commit(&self, writes: Vec<Value>, transaction: Option<&str>) -> Result<(), CallError> {
        let mut body = json!({ "writes": writes });
        if let Some(txn) = transaction {
            body["transaction"] = Value::String(txn.to_string());
        }
        self.call(
            self.http
                .post(self.url(&format!("{}:commit", self.root)))
                .json(&body),
        )
        .await
        .map(|_| ())
    }

    async fn begin_transaction(&self) -> Result<String, CallError> {
        let response: BeginTransactionResponse = self
            .call_json(
                self.http
                    .post(self.url(&format!("{}:beginTransaction", self.root)))
                    .json(&json!({})),
            )
            .await?;
        Ok(response.transaction)
    }

    async fn rollback(&self, transaction: &str) {
        let result = self
            .call(
                self.http
                    .post(self.url(&format!("{}:rollback", self.root)))
                    .json(&json!({ "transaction": transaction })),
            )
            .await;
        if result.is_err() {
            tracing::warn!("Transaction rollback failed");
        }
    }

    /// A create/replace write, optionally stamping a field with request time.
    fn write_op(&self, name: &str, fields: &Document, stamp: Option<&str>, must_not_exist: bool) -> Value {
        let mut write = json!({
            "update": { "name": name, "fields": encode_fields(fields) },
        });
        if let Some(field) = stamp {
            write["updateTransforms"] =
                json!([{ "fieldPath": field, "setToServerValue": "REQUEST_TIME" }]);
        }
        if must_not_exist {
            write["currentDocument"] = json!({ "exists": false });
        }
        write
    }

    async fn write_and_read(
        &self,
        collection: &str,
        id: &str,
        fields: Document,
        stamp: Option<&str>,
        must_not_exist: bool,
    ) -> Result<StoredDocument, RepoError> {
        let name = self.doc_name(collection, id);
        self.commit(vec![self.write_op(&name, &fields, stamp, must_not_exist)], None)
            .await?;

        // Read back so server-assigned values are visible to the caller.
        let fields = self.fetch(collection, id, None).await?.unwrap_or(fields);
        Ok(StoredDocument {
            id: id.to_string(),
            fields,
        })
    }

    fn structured_query(&self, collection: &str, query: &Query) -> Value {
        let mut structured = json!({ "from": [{ "collectionId": collection }] });

        if let Some((field, value)) = &query.filter {
            structured["where"] = json!({
                "fieldFilter": {
                    "field": { "fieldPath": field },
                    "op": "EQUAL",
                    "value": encode(value),
                }
            });
        }

        match &query.order_by {
            Some(OrderBy::Id) => {
                structured["orderBy"] =
                    json!([{ "field": { "fieldPath": "__name__" }, "direction": "ASCENDING" }]);
                if let Some(cursor) = &query.after {
                    structured["startAt"] = json!({
                        "values": [{ "referenceValue": self.doc_name(collection, cursor) }],
                        "before": false,
                    });
                }
            }
            Some(OrderBy::Field(field)) => {
                structured["orderBy"] =
                    json!([{ "field": { "fieldPath": field }, "direction": "ASCENDING" }]);
            }
            None => {}
        }

        if let Some(limit) = query.limit {
            structured["limit"] = json!(limit);
        }

        json!({ "structuredQuery": structured })
    }

    async fn increment_once(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        by: i64,
    ) -> Result<IncrementOutcome, CallError> {
        let transaction = self.begin_transaction().await?;

        let snapshot = match self.fetch(collection, id, Some(&transaction)).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                self.rollback(&transaction).await;
                return Err(e);
            }
        };

        let existed = snapshot.is_some();
        let was_numeric = snapshot
            .as_ref()
            .and_then(|doc| doc.get(field))
            .is_some_and(Value::is_number);

        let name = self.doc_name(collection, id);
        let mut writes = Vec::with_capacity(2);
        if !was_numeric {
            // Merge write: only the counter is touched.
            writes.push(json!({
                "update": { "name": name, "fields": { field: { "integerValue": "0" } } },
                "updateMask": { "fieldPaths": [field] },
            }));
        }
        writes.push(json!({
            "transform": {
                "document": name,
                "fieldTransforms": [{ "fieldPath": field, "increment": { "integerValue": by.to_string() } }],
            }
        }));

        self.commit(writes, Some(&transaction)).await?;

        Ok(IncrementOutcome {
            existed,
            was_numeric,
        })
    }
}

/// Whether `id` names exactly one document directly under a collection.
fn is_document_id(id: &str) -> bool {
    !id.is_empty() && id != "." && id != ".." && !id.contains('/')
}

fn check_id(collection: &str, id: &str) -> Result<(), RepoError> {
    if is_document_id(id) {
        Ok(())
    } else {
        Err(RepoError::Query(format!("invalid document id in {collection}: {id:?}")))
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, RepoError> {
        if !is_document_id(id) {
            return Ok(None);
        }
        tracing::debug!(collection, id, "Firestore get");
        Ok(self.fetch(collection, id, None).await?)
    }

    async fn get_many(
        &self,
        collection: &str,
        ids: &[String],
    ) -> Result<Vec<StoredDocument>, RepoError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        tracing::debug!(collection, count = ids.len(), "Firestore batchGet");

        let names: Vec<String> = ids
            .iter()
            .filter(|id| is_document_id(id))
            .map(|id| self.doc_name(collection, id))
            .collect();
        if names.is_empty() {
            return Ok(Vec::new());
        }
        let rows: Vec<BatchGetRow> = self
            .call_json(
                self.http
                    .post(self.url(&format!("{}:batchGet", self.root)))
                    .json(&json!({ "documents": names })),
            )
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| row.found.map(RawDocument::into_stored))
            .collect())
    }

    async fn insert(
        &self,
        collection: &str,
        fields: Document,
        stamp: Option<&str>,
    ) -> Result<StoredDocument, RepoError> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        tracing::debug!(collection, id = %id, "Firestore insert");
        self.write_and_read(collection, &id, fields, stamp, true).await
    }

    async fn set(
        &self,
        collection: &str,
        id: &str,
        fields: Document,
        stamp: Option<&str>,
    ) -> Result<StoredDocument, RepoError> {
        check_id(collection, id)?;
        tracing::debug!(collection, id, "Firestore set");
        self.write_and_read(collection, id, fields, stamp, false).await
    }

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<StoredDocument>, RepoError> {
        tracing::debug!(collection, ?query, "Firestore runQuery");

        let rows: Vec<QueryRow> = self
            .call_json(
                self.http
                    .post(self.url(&format!("{}:runQuery", self.root)))
                    .json(&self.structured_query(collection, query)),
            )
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| row.document.map(RawDocument::into_stored))
            .collect())
    }

    async fn increment(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        by: i64,
    ) -> Result<IncrementOutcome, RepoError> {
        check_id(collection, id)?;
        for attempt in 1..=MAX_TRANSACTION_ATTEMPTS {
            match self.increment_once(collection, id, field, by).await {
                Ok(outcome) => return Ok(outcome),
                Err(e) if e.is_aborted() => {
                    tracing::debug!(collection, id, attempt, "Transaction contended, retrying");
                    tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                }
                Err(e) => return Err(e.into()),
            }
        }

        tracing::error!(collection, id, "Transaction kept aborting");
        Err(RepoError::Query(format!(
            "transaction on {collection}/{id} aborted {MAX_TRANSACTION_ATTEMPTS} times"
        )))
    }
}
