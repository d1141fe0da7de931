//! Vector index access. The index is partitioned into a `resume` and a `job` namespace;
//! every record carries its embedding plus flat metadata used as filter predicates.
//!
//! Metadata values are restricted by the backend to strings, numbers, booleans and
//! arrays of strings. Nested objects and nulls are rejected, so builders go through
//! [`sanitize_metadata`] before writing.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

#[cfg(test)]
pub mod memory;
pub mod pinecone;

/// Flat metadata object stored next to a vector.
pub type Metadata = serde_json::Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Namespace {
    Resume,
    Job,
}

impl Namespace {
    pub fn as_str(self) -> &'static str {
        match self {
            Namespace::Resume => "resume",
            Namespace::Job => "job",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    #[serde(default)]
    pub values: Vec<f32>,
    #[serde(default)]
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryMatch {
    pub id: String,
    pub score: f32,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Error)]
pub enum VectorStoreError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Narrow interface over the managed vector index.
///
/// `update` merges the given fields into the stored metadata of an existing record
/// and keeps its values. Keys left out of the object are kept, never removed, so a
/// key can only be dropped by re-upserting the full record (see `sync::metadata`).
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn fetch(
        &self,
        namespace: Namespace,
        ids: &[String],
    ) -> Result<HashMap<String, VectorRecord>, VectorStoreError>;

    async fn update(
        &self,
        namespace: Namespace,
        id: &str,
        metadata: Metadata,
    ) -> Result<(), VectorStoreError>;

    async fn upsert(
        &self,
        namespace: Namespace,
        records: Vec<VectorRecord>,
    ) -> Result<(), VectorStoreError>;

    async fn delete_one(&self, namespace: Namespace, id: &str) -> Result<(), VectorStoreError>;

    async fn query(
        &self,
        namespace: Namespace,
        vector: &[f32],
        top_k: usize,
        filter: Option<Value>,
        include_metadata: bool,
    ) -> Result<Vec<QueryMatch>, VectorStoreError>;

    /// Fetches a single record, `None` if the index has no entry for `id`.
    async fn fetch_one(
        &self,
        namespace: Namespace,
        id: &str,
    ) -> Result<Option<VectorRecord>, VectorStoreError> {
        let mut records = self.fetch(namespace, &[id.to_string()]).await?;
        Ok(records.remove(id))
    }
}

/// Drops values the index would reject: nulls, nested objects and non-string array items.
pub fn sanitize_metadata(metadata: Metadata) -> Metadata {
    metadata
        .into_iter()
        .filter_map(|(key, value)| match value {
            Value::Null => None,
            Value::Object(_) => {
                warn!("Dropping nested object from vector metadata key '{key}'");
                None
            }
            Value::Array(items) => {
                let strings: Vec<Value> = items
                    .into_iter()
                    .filter(|item| item.is_string())
                    .collect();
                Some((key, Value::Array(strings)))
            }
            other => Some((key, other)),
        })
        .collect()
}
