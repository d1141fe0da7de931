//! Vector Metadata Synchronizer: non-content metadata changes on a single vector entry.
//!
//! Every write here is fetch → merge → write-back of the complete object, so fields
//! not being changed are carried over untouched. The index's update call merges
//! fields and cannot delete one; a patch that removes keys re-upserts the record with
//! its stored values instead.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::sync::applied_jobs::{AppliedJobIds, APPLIED_JOB_IDS_KEY};
use crate::vector_store::{Metadata, Namespace, VectorRecord, VectorStore, VectorStoreError};

pub const ACTIVE_KEY: &str = "active";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOutcome {
    Updated,
    /// The record exists and already holds the requested state.
    Unchanged,
    /// The index has no entry for the document (never embedded, or already removed).
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppliedJobOp {
    Add,
    Remove,
}

#[derive(Clone)]
pub struct MetadataSynchronizer {
    vectors: Arc<dyn VectorStore>,
}

impl MetadataSynchronizer {
    pub fn new(vectors: Arc<dyn VectorStore>) -> Self {
        Self { vectors }
    }

    /// Overwrites only `active` on one entry.
    pub async fn set_active(
        &self,
        namespace: Namespace,
        document_id: &str,
        active: bool,
    ) -> Result<SyncOutcome, VectorStoreError> {
        let mut patch = Metadata::new();
        patch.insert(ACTIVE_KEY.to_string(), Value::Bool(active));
        self.patch_metadata(namespace, document_id, patch).await
    }

    /// Merges `patch` into the stored metadata and writes the full object back.
    /// A `null` in the patch removes the key.
    pub async fn patch_metadata(
        &self,
        namespace: Namespace,
        document_id: &str,
        patch: Metadata,
    ) -> Result<SyncOutcome, VectorStoreError> {
        let Some(record) = self.vectors.fetch_one(namespace, document_id).await? else {
            warn!("No {namespace} vector for document {document_id}; metadata update skipped");
            return Ok(SyncOutcome::NotFound);
        };

        let merged = merge_metadata(&record.metadata, patch);
        if merged == record.metadata {
            debug!("{namespace} vector {document_id} already up to date");
            return Ok(SyncOutcome::Unchanged);
        }

        let removes_keys = record.metadata.keys().any(|key| !merged.contains_key(key));
        if removes_keys {
            self.vectors
                .upsert(
                    namespace,
                    vec![VectorRecord {
                        id: record.id,
                        values: record.values,
                        metadata: merged,
                    }],
                )
                .await?;
            debug!("Re-upserted {namespace} vector {document_id} to drop metadata keys");
        } else {
            self.vectors.update(namespace, document_id, merged).await?;
            debug!("Updated metadata of {namespace} vector {document_id}");
        }
        Ok(SyncOutcome::Updated)
    }

    /// Adds or removes one job id from a resume's `appliedJobIds`, with set semantics.
    pub async fn update_applied_job(
        &self,
        resume_id: &str,
        job_id: &str,
        op: AppliedJobOp,
    ) -> Result<SyncOutcome, VectorStoreError> {
        let Some(record) = self.vectors.fetch_one(Namespace::Resume, resume_id).await? else {
            warn!("No resume vector for {resume_id}; appliedJobIds {op:?} {job_id} skipped");
            return Ok(SyncOutcome::NotFound);
        };

        let mut applied = AppliedJobIds::from_metadata(record.metadata.get(APPLIED_JOB_IDS_KEY));
        let changed = match op {
            AppliedJobOp::Add => applied.insert(job_id),
            AppliedJobOp::Remove => applied.remove(job_id),
        };

        if !changed && !applied.needs_rewrite() {
            return Ok(SyncOutcome::Unchanged);
        }
        if !changed {
            debug!(
                "Rewriting appliedJobIds of resume {resume_id} from {:?} to a native array",
                applied.stored_shape()
            );
        }

        if applied.is_empty() {
            debug!("Resume {resume_id} no longer references any applied job");
        }

        let mut metadata = record.metadata;
        metadata.insert(APPLIED_JOB_IDS_KEY.to_string(), applied.to_value());
        self.vectors
            .update(Namespace::Resume, resume_id, metadata)
            .await?;
        Ok(SyncOutcome::Updated)
    }
}

fn merge_metadata(existing: &Metadata, patch: Metadata) -> Metadata {
    let mut merged = existing.clone();
    for (key, value) in patch {
        if value.is_null() {
            merged.remove(&key);
        } else {
            merged.insert(key, value);
        }
    }
    merged
}
