use std::{
    collections::{BTreeMap, HashMap},
    future::Future,
    time::Duration,
};

use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;

use crate::{
    domain::ExtractedRecord,
    executor::{DynExecutor, Params, Row},
    neo4j::Neo4jError,
    queries::{self, QueryError, QueryRegistry},
};

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("only product records are persisted, got page type {0}")]
    NotAProduct(String),
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error("graph write failed: {0}")]
    Neo4j(#[from] Neo4jError),
    #[error("graph statement timed out after {0:?}")]
    Timeout(Duration),
    #[error("failed to encode attributes: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("stored product is malformed: {0}")]
    Decode(String),
}

/// A `Product` node as read back from the graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredProduct {
    pub source_url: String,
    pub name: String,
    pub price: String,
    pub currency: String,
    pub images: Vec<String>,
    pub attributes: BTreeMap<String, String>,
    pub extracted_at: String,
}

impl StoredProduct {
    /// Equality that ignores `extracted_at`, which advances on every write.
    pub fn same_state(&self, other: &StoredProduct) -> bool {
        self.source_url == other.source_url
            && self.name == other.name
            && self.price == other.price
            && self.currency == other.currency
            && self.images == other.images
            && self.attributes == other.attributes
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpsertOutcome {
    pub source_url: String,
    pub created: bool,
    pub extracted_at: String,
}

/// Node properties cannot hold maps, so attributes are stored as JSON. `BTreeMap`
/// serializes with sorted keys, which keeps the encoding canonical.
pub fn encode_attributes(attributes: &BTreeMap<String, String>) -> Result<String, serde_json::Error> {
    serde_json::to_string(attributes)
}

pub fn decode_attributes(raw: &str) -> Result<BTreeMap<String, String>, serde_json::Error> {
    if raw.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    serde_json::from_str(raw)
}

/// Create-or-replace of `Product` nodes keyed by `source_url`.
#[derive(Clone)]
pub struct ProductStore {
    executor: DynExecutor,
    queries: QueryRegistry,
    write_timeout: Duration,
}

impl ProductStore {
    pub fn new(executor: DynExecutor, queries: QueryRegistry, write_timeout: Duration) -> Self {
        Self {
            executor,
            queries,
            write_timeout,
        }
    }

    async fn bounded<T, F>(&self, fut: F) -> Result<T, PersistenceError>
    where
        F: Future<Output = Result<T, Neo4jError>>,
    {
        match tokio::time::timeout(self.write_timeout, fut).await {
            Ok(r) => Ok(r?),
            Err(_) => Err(PersistenceError::Timeout(self.write_timeout)),
        }
    }

    async fn read(
        &self,
        key: &str,
        params: Params,
        fields: &[&str],
        max_rows: usize,
    ) -> Result<Vec<Row>, PersistenceError> {
        let cypher = self.queries.get(key)?;
        self.bounded(self.executor.read_rows(cypher, params, fields, max_rows))
            .await
    }

    /// Full replace: every product field and `extracted_at` is overwritten, nothing is
    /// merged with the previous state.
    pub async fn upsert_product(
        &self,
        record: &ExtractedRecord,
    ) -> Result<UpsertOutcome, PersistenceError> {
        if !record.is_product() {
            return Err(PersistenceError::NotAProduct(record.page_type().to_string()));
        }
        let attributes_json =
            encode_attributes(&record.attributes).map_err(PersistenceError::Encode)?;

        let params = HashMap::from([
            ("source_url".to_string(), json!(record.source_url())),
            ("name".to_string(), json!(record.name)),
            ("price".to_string(), json!(record.price)),
            ("currency".to_string(), json!(record.currency)),
            ("images".to_string(), json!(record.images)),
            ("attributes_json".to_string(), json!(attributes_json)),
        ]);

        let cypher = self.queries.get(queries::UPSERT_PRODUCT)?;
        let mut rows = self
            .bounded(self.executor.write_returning(
                cypher,
                params,
                &["source_url", "extracted_at", "created"],
            ))
            .await?;
        let row = rows
            .pop()
            .ok_or_else(|| PersistenceError::Decode("upsert returned no row".to_string()))?;

        let outcome = UpsertOutcome {
            source_url: string_field(&row, "source_url")?,
            created: row.get("created").and_then(Value::as_bool).unwrap_or(false),
            extracted_at: string_field(&row, "extracted_at")?,
        };
        tracing::info!(
            source_url = %outcome.source_url,
            created = outcome.created,
            "product upserted"
        );
        Ok(outcome)
    }

    pub async fn get_product(
        &self,
        source_url: &str,
    ) -> Result<Option<StoredProduct>, PersistenceError> {
        let mut rows = self
            .read(
                queries::GET_PRODUCT,
                HashMap::from([("source_url".to_string(), json!(source_url))]),
                &[
                    "source_url",
                    "name",
                    "price",
                    "currency",
                    "images",
                    "attributes_json",
                    "extracted_at",
                ],
                1,
            )
            .await?;
        let Some(row) = rows.pop() else {
            return Ok(None);
        };

        let images = match row.get("images") {
            None | Some(Value::Null) => Vec::new(),
            Some(v) => serde_json::from_value::<Vec<String>>(v.clone())
                .map_err(|e| PersistenceError::Decode(format!("images: {e}")))?,
        };
        let attributes = decode_attributes(
            row.get("attributes_json")
                .and_then(Value::as_str)
                .unwrap_or(""),
        )
        .map_err(|e| PersistenceError::Decode(format!("attributes_json: {e}")))?;

        Ok(Some(StoredProduct {
            source_url: string_field(&row, "source_url")?,
            name: optional_string(&row, "name"),
            price: optional_string(&row, "price"),
            currency: optional_string(&row, "currency"),
            images,
            attributes,
            extracted_at: optional_string(&row, "extracted_at"),
        }))
    }

    /// Number of `Product` nodes carrying `source_url`; 0 or 1 while the uniqueness
    /// constraint holds.
    pub async fn count_products(&self, source_url: &str) -> Result<i64, PersistenceError> {
        let rows = self
            .read(
                queries::COUNT_PRODUCTS,
                HashMap::from([("source_url".to_string(), json!(source_url))]),
                &["n"],
                1,
            )
            .await?;
        Ok(rows
            .first()
            .and_then(|m| m.get("n"))
            .and_then(Value::as_i64)
            .unwrap_or(0))
    }
}

fn string_field(row: &Row, field: &str) -> Result<String, PersistenceError> {
    row.get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| PersistenceError::Decode(format!("missing string field {field}")))
}

fn optional_string(row: &Row, field: &str) -> String {
    row.get(field)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
