//! Relational store access. PostgreSQL is authoritative for status, ownership,
//! applications and reports; the vector index is a projection kept in line by `sync`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::job::{CompanyRow, JobEmbeddingRow, JobPostingPatch, JobPostingRow, JobStatus};
use crate::models::resume::{ResumeEmbeddingRow, ResumeRow};
use crate::models::user::User;

#[cfg(test)]
pub mod memory;
pub mod postgres;

/// Outcome of the relational half of a company unban.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CompanyReactivation {
    /// Jobs set back to `HIRING` with their embedding records reactivated.
    pub reactivated_job_ids: Vec<Uuid>,
    /// Jobs kept disabled because a report against them was resolved as valid.
    pub excluded_job_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserBanStatus {
    pub user_id: Uuid,
    pub banned: bool,
    pub total_resumes: i64,
    pub active_resumes: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyBanStatus {
    pub user_id: Uuid,
    pub banned: bool,
    pub total_jobs: i64,
    pub active_jobs: i64,
    pub disabled_jobs: i64,
    /// Jobs carrying at least one `RESOLVED_VALID` report.
    pub reported_jobs: i64,
}

/// The narrow relational interface the sync subsystem depends on.
///
/// Ban and unban methods run as a single transaction and return the ids whose
/// vector entries must be propagated afterwards. They fail with `NotFound` when the
/// user does not exist.
#[async_trait]
pub trait JobBoardRepository: Send + Sync {
    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, AppError>;

    async fn get_company_by_user(&self, user_id: Uuid) -> Result<Option<CompanyRow>, AppError>;

    async fn get_job_posting(&self, job_id: Uuid) -> Result<Option<JobPostingRow>, AppError>;

    /// Applies the non-`None` fields of `patch` and returns the updated row.
    async fn update_job_posting(
        &self,
        job_id: Uuid,
        patch: &JobPostingPatch,
    ) -> Result<JobPostingRow, AppError>;

    async fn set_job_status(&self, job_id: Uuid, status: JobStatus) -> Result<(), AppError>;

    /// Deletes the posting with its applications, reports and embedding record.
    async fn delete_job_posting(&self, job_id: Uuid) -> Result<(), AppError>;

    async fn get_job_embedding(&self, job_id: Uuid) -> Result<Option<JobEmbeddingRow>, AppError>;

    async fn upsert_job_embedding(
        &self,
        job_id: Uuid,
        content: &str,
        active: bool,
    ) -> Result<(), AppError>;

    /// No-op when the job was never embedded.
    async fn set_job_embedding_active(&self, job_id: Uuid, active: bool) -> Result<(), AppError>;

    async fn get_resume(&self, resume_id: Uuid) -> Result<Option<ResumeRow>, AppError>;

    async fn get_resume_embedding(
        &self,
        resume_id: Uuid,
    ) -> Result<Option<ResumeEmbeddingRow>, AppError>;

    async fn upsert_resume_embedding(
        &self,
        resume_id: Uuid,
        content: &str,
        active: bool,
    ) -> Result<(), AppError>;

    async fn resume_ids_applied_to_job(&self, job_id: Uuid) -> Result<Vec<Uuid>, AppError>;

    async fn applied_job_ids_for_resume(&self, resume_id: Uuid) -> Result<Vec<Uuid>, AppError>;

    /// Returns `false` when the resume had already applied to the job.
    async fn insert_application(&self, resume_id: Uuid, job_id: Uuid) -> Result<bool, AppError>;

    /// Marks the user unapproved, disables every owned job and deactivates their
    /// embedding records. Returns every owned job id.
    async fn ban_company(&self, user_id: Uuid) -> Result<Vec<Uuid>, AppError>;

    async fn unban_company(&self, user_id: Uuid) -> Result<CompanyReactivation, AppError>;

    /// Marks the user unapproved and deactivates every resume embedding record.
    /// Returns every owned resume id.
    async fn ban_user(&self, user_id: Uuid) -> Result<Vec<Uuid>, AppError>;

    async fn unban_user(&self, user_id: Uuid) -> Result<Vec<Uuid>, AppError>;

    async fn user_ban_status(&self, user_id: Uuid) -> Result<UserBanStatus, AppError>;

    async fn company_ban_status(&self, user_id: Uuid) -> Result<CompanyBanStatus, AppError>;
}
