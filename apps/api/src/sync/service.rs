//! `JobSyncService`: the operations request handlers call. Resolves the acting user,
//! enforces ownership, applies the relational write and routes the follow-up to the
//! synchronizer, the re-embedding pipeline or the cascade coordinator.

use std::sync::Arc;

use serde::Serialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::config::CascadeLimits;
use crate::embedding::EmbeddingGenerator;
use crate::errors::AppError;
use crate::models::job::{JobPostingPatch, JobPostingRow, JobStatus};
use crate::models::user::{User, UserRole};
use crate::repository::{CompanyBanStatus, JobBoardRepository, UserBanStatus};
use crate::sync::cascade::{BanReport, CascadeCoordinator, JobDeletionReport};
use crate::sync::decision::{classify_job_update, JobChange};
use crate::sync::metadata::{AppliedJobOp, MetadataSynchronizer, SyncOutcome, ACTIVE_KEY};
use crate::sync::reembed::{job_filter_metadata, ReembedPipeline};
use crate::vector_store::{Namespace, VectorStore};

const MAX_TOP_K: usize = 50;

#[derive(Debug, Clone, Serialize)]
pub struct JobUpdateResult {
    pub job: JobPostingRow,
    pub change: JobChange,
    /// Set when the metadata-only path ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector_outcome: Option<SyncOutcome>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApplicationResult {
    pub resume_id: Uuid,
    pub job_id: Uuid,
    /// `false` when the application already existed.
    pub created: bool,
    pub vector_outcome: SyncOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobMatch {
    pub job_id: String,
    pub score: f32,
    pub title: Option<String>,
}

pub struct JobSyncService {
    repo: Arc<dyn JobBoardRepository>,
    vectors: Arc<dyn VectorStore>,
    sync: MetadataSynchronizer,
    reembed: ReembedPipeline,
    cascade: CascadeCoordinator,
}

impl JobSyncService {
    pub fn new(
        repo: Arc<dyn JobBoardRepository>,
        vectors: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingGenerator>,
        limits: CascadeLimits,
    ) -> Self {
        let sync = MetadataSynchronizer::new(vectors.clone());
        let reembed = ReembedPipeline::new(repo.clone(), vectors.clone(), embedder);
        let cascade =
            CascadeCoordinator::new(repo.clone(), vectors.clone(), sync.clone(), limits);
        Self {
            repo,
            vectors,
            sync,
            reembed,
            cascade,
        }
    }

    // ── Jobs ────────────────────────────────────────────────────────────────

    /// Flips a posting between open and closed. Admin-disabled postings cannot be toggled.
    pub async fn toggle_job_status(&self, job_id: Uuid, actor_id: Uuid) -> Result<JobStatus, AppError> {
        let actor = self.resolve_actor(actor_id).await?;
        let mut job = self.load_job(job_id).await?;
        self.ensure_can_manage(&actor, &job).await?;

        let next = match job.status {
            JobStatus::Hiring | JobStatus::UrgentlyHiring => JobStatus::Closed,
            JobStatus::Closed => JobStatus::Hiring,
            JobStatus::DisabledByAdmin => {
                return Err(AppError::Forbidden(format!(
                    "Job {job_id} was disabled by an administrator"
                )))
            }
        };

        self.repo.set_job_status(job_id, next).await?;
        job.status = next;
        self.sync_job_metadata(&job, next.is_active()).await?;

        info!("Job {job_id} status toggled to {}", next.as_str());
        Ok(next)
    }

    /// Applies a field update and keeps the Job Document in line with it.
    ///
    /// Title/description changes re-embed; status and filter-field changes only patch
    /// vector metadata; an update that changes nothing touches neither store.
    pub async fn update_job(
        &self,
        job_id: Uuid,
        actor_id: Uuid,
        patch: JobPostingPatch,
    ) -> Result<JobUpdateResult, AppError> {
        let actor = self.resolve_actor(actor_id).await?;
        let current = self.load_job(job_id).await?;
        self.ensure_can_manage(&actor, &current).await?;

        if actor.role != UserRole::Admin {
            let touches_disabled = current.status == JobStatus::DisabledByAdmin
                && patch.status.is_some_and(|s| s != JobStatus::DisabledByAdmin);
            if touches_disabled || patch.status == Some(JobStatus::DisabledByAdmin) {
                return Err(AppError::Forbidden(
                    "Only administrators can change an admin-disabled status".to_string(),
                ));
            }
        }

        let change = classify_job_update(&current, &patch);
        if change == JobChange::Unchanged {
            return Ok(JobUpdateResult {
                job: current,
                change,
                vector_outcome: None,
            });
        }

        let job = self.repo.update_job_posting(job_id, &patch).await?;
        let vector_outcome = match change {
            JobChange::Content => {
                self.reembed.reembed_job(&job).await?;
                None
            }
            _ => Some(self.sync_job_metadata(&job, job.status.is_active()).await?),
        };

        info!("Job {job_id} updated ({change:?})");
        Ok(JobUpdateResult {
            job,
            change,
            vector_outcome,
        })
    }

    /// Regenerates the Job Document from the stored posting.
    pub async fn reembed_job(&self, job_id: Uuid, actor_id: Uuid) -> Result<(), AppError> {
        let actor = self.resolve_actor(actor_id).await?;
        let job = self.load_job(job_id).await?;
        self.ensure_can_manage(&actor, &job).await?;
        self.reembed.reembed_job(&job).await
    }

    /// Sets `active` on the Job Document in both stores and refreshes its filter
    /// fields, without touching the embedding. Admin only: it can diverge from status.
    pub async fn update_job_metadata_only(
        &self,
        job_id: Uuid,
        actor_id: Uuid,
        active: bool,
    ) -> Result<SyncOutcome, AppError> {
        self.ensure_admin(actor_id).await?;
        let job = self.load_job(job_id).await?;
        self.sync_job_metadata(&job, active).await
    }

    pub async fn delete_job(&self, job_id: Uuid, actor_id: Uuid) -> Result<JobDeletionReport, AppError> {
        let actor = self.resolve_actor(actor_id).await?;
        let job = self.load_job(job_id).await?;
        self.ensure_can_manage(&actor, &job).await?;
        self.cascade.delete_job_cascade(job_id).await
    }

    // ── Resumes & applications ──────────────────────────────────────────────

    pub async fn record_application(
        &self,
        resume_id: Uuid,
        job_id: Uuid,
        actor_id: Uuid,
    ) -> Result<ApplicationResult, AppError> {
        let actor = self.resolve_actor(actor_id).await?;
        if !actor.is_approved {
            return Err(AppError::Forbidden(format!(
                "User {actor_id} is banned and cannot apply"
            )));
        }
        self.ensure_owns_resume(&actor, resume_id).await?;
        let job = self.load_job(job_id).await?;
        if !job.status.is_active() {
            return Err(AppError::Validation(format!(
                "Job {job_id} is not accepting applications"
            )));
        }

        let created = self.repo.insert_application(resume_id, job_id).await?;
        let vector_outcome = self
            .sync
            .update_applied_job(&resume_id.to_string(), &job_id.to_string(), AppliedJobOp::Add)
            .await?;

        Ok(ApplicationResult {
            resume_id,
            job_id,
            created,
            vector_outcome,
        })
    }

    pub async fn reembed_resume(
        &self,
        resume_id: Uuid,
        actor_id: Uuid,
        content: &str,
    ) -> Result<(), AppError> {
        let actor = self.resolve_actor(actor_id).await?;
        self.ensure_owns_resume(&actor, resume_id).await?;
        self.reembed.reembed_resume(resume_id, content).await
    }

    /// Nearest active job postings for a resume's stored embedding.
    pub async fn find_matching_jobs(
        &self,
        resume_id: Uuid,
        top_k: usize,
    ) -> Result<Vec<JobMatch>, AppError> {
        let record = self
            .vectors
            .fetch_one(Namespace::Resume, &resume_id.to_string())
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Resume {resume_id} has not been embedded"))
            })?;

        let matches = self
            .vectors
            .query(
                Namespace::Job,
                &record.values,
                top_k.clamp(1, MAX_TOP_K),
                Some(json!({ ACTIVE_KEY: { "$eq": true } })),
                true,
            )
            .await?;

        Ok(matches
            .into_iter()
            .map(|m| JobMatch {
                title: m
                    .metadata
                    .as_ref()
                    .and_then(|md| md.get("title"))
                    .and_then(|t| t.as_str())
                    .map(String::from),
                job_id: m.id,
                score: m.score,
            })
            .collect())
    }

    // ── Moderation ──────────────────────────────────────────────────────────

    pub async fn ban_user(&self, user_id: Uuid, actor_id: Uuid) -> Result<BanReport, AppError> {
        self.ensure_admin_on(actor_id, user_id, UserRole::JobSeeker).await?;
        self.cascade.ban_user(user_id).await
    }

    pub async fn unban_user(&self, user_id: Uuid, actor_id: Uuid) -> Result<BanReport, AppError> {
        self.ensure_admin_on(actor_id, user_id, UserRole::JobSeeker).await?;
        self.cascade.unban_user(user_id).await
    }

    pub async fn ban_company(&self, user_id: Uuid, actor_id: Uuid) -> Result<BanReport, AppError> {
        self.ensure_admin_on(actor_id, user_id, UserRole::Company).await?;
        self.cascade.ban_company(user_id).await
    }

    pub async fn unban_company(&self, user_id: Uuid, actor_id: Uuid) -> Result<BanReport, AppError> {
        self.ensure_admin_on(actor_id, user_id, UserRole::Company).await?;
        self.cascade.unban_company(user_id).await
    }

    pub async fn get_user_ban_status(
        &self,
        user_id: Uuid,
        actor_id: Uuid,
    ) -> Result<UserBanStatus, AppError> {
        self.ensure_admin_on(actor_id, user_id, UserRole::JobSeeker).await?;
        self.repo.user_ban_status(user_id).await
    }

    pub async fn get_company_ban_status(
        &self,
        user_id: Uuid,
        actor_id: Uuid,
    ) -> Result<CompanyBanStatus, AppError> {
        self.ensure_admin_on(actor_id, user_id, UserRole::Company).await?;
        self.repo.company_ban_status(user_id).await
    }

    // ── Helpers ─────────────────────────────────────────────────────────────

    async fn sync_job_metadata(
        &self,
        job: &JobPostingRow,
        active: bool,
    ) -> Result<SyncOutcome, AppError> {
        let stored_active = self.repo.get_job_embedding(job.id).await?.map(|e| e.active);
        if stored_active.is_some_and(|current| current != active) {
            self.repo.set_job_embedding_active(job.id, active).await?;
        }

        let mut patch = job_filter_metadata(job);
        patch.insert(ACTIVE_KEY.to_string(), json!(active));
        Ok(self
            .sync
            .patch_metadata(Namespace::Job, &job.id.to_string(), patch)
            .await?)
    }

    async fn resolve_actor(&self, actor_id: Uuid) -> Result<User, AppError> {
        self.repo
            .get_user(actor_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {actor_id} not found")))
    }

    async fn load_job(&self, job_id: Uuid) -> Result<JobPostingRow, AppError> {
        self.repo
            .get_job_posting(job_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Job posting {job_id} not found")))
    }

    /// Admins manage every posting; a company only its own.
    async fn ensure_can_manage(&self, actor: &User, job: &JobPostingRow) -> Result<(), AppError> {
        match actor.role {
            UserRole::Admin => Ok(()),
            UserRole::Company => {
                let company = self.repo.get_company_by_user(actor.id).await?;
                match company {
                    Some(c) if c.id == job.company_id => Ok(()),
                    _ => Err(AppError::Forbidden(format!(
                        "Job posting {} belongs to another company",
                        job.id
                    ))),
                }
            }
            UserRole::JobSeeker => Err(AppError::Forbidden(
                "Job seekers cannot manage job postings".to_string(),
            )),
        }
    }

    async fn ensure_owns_resume(&self, actor: &User, resume_id: Uuid) -> Result<(), AppError> {
        let resume = self
            .repo
            .get_resume(resume_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Resume {resume_id} not found")))?;
        if actor.role == UserRole::Admin || resume.user_id == actor.id {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "Resume {resume_id} belongs to another user"
            )))
        }
    }

    async fn ensure_admin(&self, actor_id: Uuid) -> Result<(), AppError> {
        let actor = self.resolve_actor(actor_id).await?;
        if actor.role != UserRole::Admin {
            return Err(AppError::Forbidden(format!(
                "User {actor_id} is not an administrator"
            )));
        }
        Ok(())
    }

    /// Moderation guard: admin actor, target of the expected role.
    async fn ensure_admin_on(
        &self,
        actor_id: Uuid,
        target_id: Uuid,
        expected_role: UserRole,
    ) -> Result<(), AppError> {
        self.ensure_admin(actor_id).await?;
        let target = self.resolve_actor(target_id).await?;
        if target.role != expected_role {
            return Err(AppError::Validation(format!(
                "User {target_id} is a {:?}, expected {expected_role:?}",
                target.role
            )));
        }
        Ok(())
    }
}
