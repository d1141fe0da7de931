//! Re-embedding Pipeline: regenerates content and embedding when semantically
//! relevant fields change, then replaces the vector entry and the relational
//! embedding record, in that order.
//!
//! A failure while embedding or upserting the vector aborts before the relational
//! upsert. The caller's own posting write is not rolled back.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::embedding::EmbeddingGenerator;
use crate::errors::AppError;
use crate::models::job::JobPostingRow;
use crate::models::resume::ResumeRow;
use crate::repository::JobBoardRepository;
use crate::sync::applied_jobs::{AppliedJobIds, APPLIED_JOB_IDS_KEY};
use crate::sync::metadata::ACTIVE_KEY;
use crate::vector_store::{sanitize_metadata, Metadata, Namespace, VectorRecord, VectorStore};

/// Text embedded for a job posting.
pub fn job_content(job: &JobPostingRow) -> String {
    format!("{}\n\n{}", job.title.trim(), job.description.trim())
}

/// Filter fields derived from the posting, stored next to its vector.
/// `None` columns come out as `null` so a metadata patch clears them.
pub fn job_filter_metadata(job: &JobPostingRow) -> Metadata {
    let Value::Object(map) = json!({
        "title": job.title,
        ACTIVE_KEY: job.status.is_active(),
        "status": job.status.as_str(),
        "salaryMin": job.salary_min,
        "salaryMax": job.salary_max,
        "workType": job.work_type,
        "country": job.country,
        "sourceUrl": job.source_url,
    }) else {
        unreachable!("json! object literal")
    };
    map
}

/// Full fresh metadata payload for a job vector.
pub fn job_metadata(job: &JobPostingRow, content: &str) -> Metadata {
    let mut metadata = job_filter_metadata(job);
    metadata.insert("jobId".to_string(), json!(job.id.to_string()));
    metadata.insert("companyId".to_string(), json!(job.company_id.to_string()));
    metadata.insert("content".to_string(), json!(content));
    sanitize_metadata(metadata)
}

/// Full fresh metadata payload for a resume vector.
pub fn resume_metadata(
    resume: &ResumeRow,
    content: &str,
    active: bool,
    applied: &AppliedJobIds,
) -> Metadata {
    let Value::Object(map) = json!({
        "resumeId": resume.id.to_string(),
        "userId": resume.user_id.to_string(),
        "content": content,
        "sourceUrl": resume.file_url,
        ACTIVE_KEY: active,
        APPLIED_JOB_IDS_KEY: applied.to_value(),
    }) else {
        unreachable!("json! object literal")
    };
    sanitize_metadata(map)
}

#[derive(Clone)]
pub struct ReembedPipeline {
    repo: Arc<dyn JobBoardRepository>,
    vectors: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingGenerator>,
}

impl ReembedPipeline {
    pub fn new(
        repo: Arc<dyn JobBoardRepository>,
        vectors: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingGenerator>,
    ) -> Self {
        Self {
            repo,
            vectors,
            embedder,
        }
    }

    /// Regenerates the Job Document for `job` as currently stored.
    pub async fn reembed_job(&self, job: &JobPostingRow) -> Result<(), AppError> {
        let content = job_content(job);
        let values = self.embedder.embed(&content).await?;
        let active = job.status.is_active();

        self.vectors
            .upsert(
                Namespace::Job,
                vec![VectorRecord {
                    id: job.id.to_string(),
                    values,
                    metadata: job_metadata(job, &content),
                }],
            )
            .await?;

        self.repo
            .upsert_job_embedding(job.id, &content, active)
            .await?;

        info!("Re-embedded job {} (active={active})", job.id);
        Ok(())
    }

    /// Regenerates the Candidate Document for a resume from freshly extracted text.
    ///
    /// `appliedJobIds` is rebuilt from the applications table. The current `active`
    /// flag of the embedding record is kept; a first embedding starts active only if
    /// the owner is not banned.
    pub async fn reembed_resume(&self, resume_id: Uuid, content: &str) -> Result<(), AppError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(AppError::Validation("resume content cannot be empty".to_string()));
        }

        let resume = self
            .repo
            .get_resume(resume_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Resume {resume_id} not found")))?;
        let active = match self.repo.get_resume_embedding(resume_id).await? {
            Some(existing) => existing.active,
            None => self
                .repo
                .get_user(resume.user_id)
                .await?
                .map(|owner| owner.is_approved)
                .unwrap_or(false),
        };
        let applied: AppliedJobIds = self
            .repo
            .applied_job_ids_for_resume(resume_id)
            .await?
            .into_iter()
            .map(|id| id.to_string())
            .collect();

        let values = self.embedder.embed(content).await?;

        self.vectors
            .upsert(
                Namespace::Resume,
                vec![VectorRecord {
                    id: resume_id.to_string(),
                    values,
                    metadata: resume_metadata(&resume, content, active, &applied),
                }],
            )
            .await?;

        self.repo
            .upsert_resume_embedding(resume_id, content, active)
            .await?;

        info!(
            "Re-embedded resume {resume_id} ({} applied jobs carried over)",
            applied.len()
        );
        Ok(())
    }
}
