//! In-memory vector index for tests. Supports failure injection per record id and
//! artificial latency so cascade tests can exercise partial failure and deadlines.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::{Metadata, Namespace, QueryMatch, VectorRecord, VectorStore, VectorStoreError};
use crate::embedding::cosine_similarity;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Fetch(Namespace, Vec<String>),
    Update(Namespace, String),
    Upsert(Namespace, Vec<String>),
    Delete(Namespace, String),
    Query(Namespace),
}

#[derive(Default)]
pub struct InMemoryVectorStore {
    records: Mutex<HashMap<(Namespace, String), VectorRecord>>,
    failing_ids: Mutex<HashSet<String>>,
    slow_ids: Mutex<HashMap<String, Duration>>,
    calls: Mutex<Vec<Call>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, namespace: Namespace, id: &str, values: Vec<f32>, metadata: Value) {
        let metadata = match metadata {
            Value::Object(map) => map,
            _ => Metadata::new(),
        };
        self.records.lock().unwrap().insert(
            (namespace, id.to_string()),
            VectorRecord {
                id: id.to_string(),
                values,
                metadata,
            },
        );
    }

    pub fn get(&self, namespace: Namespace, id: &str) -> Option<VectorRecord> {
        self.records
            .lock()
            .unwrap()
            .get(&(namespace, id.to_string()))
            .cloned()
    }

    /// Every write touching `id` fails with a 503.
    pub fn fail_writes_for(&self, id: &str) {
        self.failing_ids.lock().unwrap().insert(id.to_string());
    }

    /// Every write touching `id` sleeps for `delay` first.
    pub fn delay_writes_for(&self, id: &str, delay: Duration) {
        self.slow_ids.lock().unwrap().insert(id.to_string(), delay);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn update_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Update(..)))
            .count()
    }

    async fn before_write(&self, id: &str) -> Result<(), VectorStoreError> {
        let delay = self.slow_ids.lock().unwrap().get(id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing_ids.lock().unwrap().contains(id) {
            return Err(VectorStoreError::Api {
                status: 503,
                message: format!("injected failure for {id}"),
            });
        }
        Ok(())
    }

    fn record_call(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn fetch(
        &self,
        namespace: Namespace,
        ids: &[String],
    ) -> Result<HashMap<String, VectorRecord>, VectorStoreError> {
        self.record_call(Call::Fetch(namespace, ids.to_vec()));
        let records = self.records.lock().unwrap();
        Ok(ids
            .iter()
            .filter_map(|id| {
                records
                    .get(&(namespace, id.clone()))
                    .map(|r| (id.clone(), r.clone()))
            })
            .collect())
    }

    async fn update(
        &self,
        namespace: Namespace,
        id: &str,
        metadata: Metadata,
    ) -> Result<(), VectorStoreError> {
        self.record_call(Call::Update(namespace, id.to_string()));
        self.before_write(id).await?;
        if let Some(record) = self
            .records
            .lock()
            .unwrap()
            .get_mut(&(namespace, id.to_string()))
        {
            record.metadata.extend(metadata);
        }
        Ok(())
    }

    async fn upsert(
        &self,
        namespace: Namespace,
        records: Vec<VectorRecord>,
    ) -> Result<(), VectorStoreError> {
        self.record_call(Call::Upsert(
            namespace,
            records.iter().map(|r| r.id.clone()).collect(),
        ));
        for record in &records {
            self.before_write(&record.id).await?;
        }
        let mut store = self.records.lock().unwrap();
        for record in records {
            store.insert((namespace, record.id.clone()), record);
        }
        Ok(())
    }

    async fn delete_one(&self, namespace: Namespace, id: &str) -> Result<(), VectorStoreError> {
        self.record_call(Call::Delete(namespace, id.to_string()));
        self.before_write(id).await?;
        self.records
            .lock()
            .unwrap()
            .remove(&(namespace, id.to_string()));
        Ok(())
    }

    async fn query(
        &self,
        namespace: Namespace,
        vector: &[f32],
        top_k: usize,
        filter: Option<Value>,
        include_metadata: bool,
    ) -> Result<Vec<QueryMatch>, VectorStoreError> {
        self.record_call(Call::Query(namespace));
        let records = self.records.lock().unwrap();
        let mut matches: Vec<QueryMatch> = records
            .iter()
            .filter(|((ns, _), _)| *ns == namespace)
            .filter(|(_, record)| matches_filter(&record.metadata, filter.as_ref()))
            .map(|(_, record)| QueryMatch {
                id: record.id.clone(),
                score: cosine_similarity(vector, &record.values),
                metadata: include_metadata.then(|| record.metadata.clone()),
            })
            .collect();
        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        matches.truncate(top_k);
        Ok(matches)
    }
}

/// Equality-only filter: `{"key": value}` or `{"key": {"$eq": value}}`.
fn matches_filter(metadata: &Metadata, filter: Option<&Value>) -> bool {
    let Some(Value::Object(clauses)) = filter else {
        return true;
    };
    clauses.iter().all(|(key, expected)| {
        let expected = expected.get("$eq").unwrap_or(expected);
        metadata.get(key) == Some(expected)
    })
}
