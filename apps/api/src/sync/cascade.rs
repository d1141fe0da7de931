//! Cascade Cleanup Coordinator: fan-out after a job deletion or an account ban/unban.
//!
//! Relational changes commit first, in one transaction. Vector propagation follows as
//! a best-effort batch: a crash in between leaves PostgreSQL authoritative and the
//! index stale, never the reverse. Every per-document step is idempotent, so a batch
//! can be replayed.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::CascadeLimits;
use crate::errors::AppError;
use crate::repository::JobBoardRepository;
use crate::sync::batch::{run_batch, BatchReport};
use crate::sync::metadata::{AppliedJobOp, MetadataSynchronizer};
use crate::vector_store::{Namespace, VectorStore};

#[derive(Debug, Clone, Serialize)]
pub struct JobDeletionReport {
    pub job_id: Uuid,
    pub vector_entry_deleted: bool,
    /// Back-reference cleanup over the resumes that had applied.
    pub cascade: BatchReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct BanReport {
    pub user_id: Uuid,
    /// Jobs (company) or resumes (user) whose relational state changed.
    pub affected_ids: Vec<Uuid>,
    /// Jobs left disabled on unban because of a `RESOLVED_VALID` report.
    pub excluded_ids: Vec<Uuid>,
    pub vector_sync: BatchReport,
}

#[derive(Clone)]
pub struct CascadeCoordinator {
    repo: Arc<dyn JobBoardRepository>,
    vectors: Arc<dyn VectorStore>,
    sync: MetadataSynchronizer,
    limits: CascadeLimits,
}

impl CascadeCoordinator {
    pub fn new(
        repo: Arc<dyn JobBoardRepository>,
        vectors: Arc<dyn VectorStore>,
        sync: MetadataSynchronizer,
        limits: CascadeLimits,
    ) -> Self {
        Self {
            repo,
            vectors,
            sync,
            limits,
        }
    }

    /// Removes a job posting everywhere.
    ///
    /// The job's own vector entry goes first; if that fails nothing else happens and
    /// the posting survives. Back-reference cleanup afterwards tolerates per-resume failures.
    pub async fn delete_job_cascade(&self, job_id: Uuid) -> Result<JobDeletionReport, AppError> {
        let affected_resumes = self.repo.resume_ids_applied_to_job(job_id).await?;
        let job_key = job_id.to_string();

        let vector_entry_deleted = match self.vectors.fetch_one(Namespace::Job, &job_key).await? {
            Some(_) => {
                self.vectors.delete_one(Namespace::Job, &job_key).await?;
                true
            }
            None => {
                debug!("Job {job_id} has no vector entry; nothing to delete from the index");
                false
            }
        };

        self.repo.delete_job_posting(job_id).await?;

        let job_ref = job_key.as_str();
        let cascade = run_batch(
            "delete_job_cascade",
            to_keys(&affected_resumes),
            self.limits,
            |resume_id| async move {
                self.sync
                    .update_applied_job(&resume_id, job_ref, AppliedJobOp::Remove)
                    .await
            },
        )
        .await;

        info!(
            "Deleted job {job_id}: vector entry removed={vector_entry_deleted}, back-references cleaned on {} of {} resumes",
            cascade.completed(),
            cascade.total
        );
        Ok(JobDeletionReport {
            job_id,
            vector_entry_deleted,
            cascade,
        })
    }

    pub async fn ban_company(&self, user_id: Uuid) -> Result<BanReport, AppError> {
        let job_ids = self.repo.ban_company(user_id).await?;
        let vector_sync = self
            .propagate_active("ban_company", Namespace::Job, &job_ids, false)
            .await;
        Ok(BanReport {
            user_id,
            affected_ids: job_ids,
            excluded_ids: Vec::new(),
            vector_sync,
        })
    }

    /// Reactivates the company's jobs except those with a report resolved as valid.
    pub async fn unban_company(&self, user_id: Uuid) -> Result<BanReport, AppError> {
        let reactivation = self.repo.unban_company(user_id).await?;
        let vector_sync = self
            .propagate_active(
                "unban_company",
                Namespace::Job,
                &reactivation.reactivated_job_ids,
                true,
            )
            .await;
        Ok(BanReport {
            user_id,
            affected_ids: reactivation.reactivated_job_ids,
            excluded_ids: reactivation.excluded_job_ids,
            vector_sync,
        })
    }

    pub async fn ban_user(&self, user_id: Uuid) -> Result<BanReport, AppError> {
        let resume_ids = self.repo.ban_user(user_id).await?;
        let vector_sync = self
            .propagate_active("ban_user", Namespace::Resume, &resume_ids, false)
            .await;
        Ok(BanReport {
            user_id,
            affected_ids: resume_ids,
            excluded_ids: Vec::new(),
            vector_sync,
        })
    }

    /// Reactivates every resume of the user. There is no report-based exclusion on this path.
    pub async fn unban_user(&self, user_id: Uuid) -> Result<BanReport, AppError> {
        let resume_ids = self.repo.unban_user(user_id).await?;
        let vector_sync = self
            .propagate_active("unban_user", Namespace::Resume, &resume_ids, true)
            .await;
        Ok(BanReport {
            user_id,
            affected_ids: resume_ids,
            excluded_ids: Vec::new(),
            vector_sync,
        })
    }

    async fn propagate_active(
        &self,
        label: &str,
        namespace: Namespace,
        ids: &[Uuid],
        active: bool,
    ) -> BatchReport {
        let report = run_batch(label, to_keys(ids), self.limits, |id| async move {
            self.sync.set_active(namespace, &id, active).await
        })
        .await;
        info!(
            "{label}: active={active} propagated to {} of {} {namespace} vectors ({} failed)",
            report.completed(),
            report.total,
            report.failed.len()
        );
        report
    }
}

fn to_keys(ids: &[Uuid]) -> Vec<String> {
    ids.iter().map(Uuid::to_string).collect()
}
