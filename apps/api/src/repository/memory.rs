//! In-memory relational store for tests, with seeding helpers.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::{CompanyBanStatus, CompanyReactivation, JobBoardRepository, UserBanStatus};
use crate::errors::AppError;
use crate::models::job::{CompanyRow, JobEmbeddingRow, JobPostingPatch, JobPostingRow, JobStatus};
use crate::models::report::ReportStatus;
use crate::models::resume::{ResumeEmbeddingRow, ResumeRow};
use crate::models::user::{User, UserRole};

struct Application {
    resume_id: Uuid,
    job_posting_id: Uuid,
}

struct Report {
    job_posting_id: Uuid,
    status: ReportStatus,
}

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    companies: HashMap<Uuid, CompanyRow>,
    jobs: HashMap<Uuid, JobPostingRow>,
    job_embeddings: HashMap<Uuid, JobEmbeddingRow>,
    resumes: HashMap<Uuid, ResumeRow>,
    resume_embeddings: HashMap<Uuid, ResumeEmbeddingRow>,
    applications: Vec<Application>,
    reports: Vec<Report>,
}

impl Tables {
    fn company_job_ids(&self, user_id: Uuid) -> Vec<Uuid> {
        let company_ids: Vec<Uuid> = self
            .companies
            .values()
            .filter(|c| c.user_id == user_id)
            .map(|c| c.id)
            .collect();
        let mut ids: Vec<Uuid> = self
            .jobs
            .values()
            .filter(|j| company_ids.contains(&j.company_id))
            .map(|j| j.id)
            .collect();
        ids.sort();
        ids
    }

    fn has_valid_report(&self, job_id: Uuid) -> bool {
        self.reports
            .iter()
            .any(|r| r.job_posting_id == job_id && r.status == ReportStatus::ResolvedValid)
    }

    fn set_approval(&mut self, user_id: Uuid, approved: bool) -> Result<(), AppError> {
        let user = self
            .users
            .get_mut(&user_id)
            .ok_or_else(|| AppError::NotFound(format!("User {user_id} not found")))?;
        user.is_approved = approved;
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryJobBoard {
    tables: Mutex<Tables>,
}

impl InMemoryJobBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, role: UserRole) -> Uuid {
        let id = Uuid::new_v4();
        self.tables.lock().unwrap().users.insert(
            id,
            User {
                id,
                email: format!("{id}@example.com"),
                role,
                is_approved: true,
                created_at: Utc::now(),
            },
        );
        id
    }

    /// Creates a company user and its company row. Returns `(user_id, company_id)`.
    pub fn add_company(&self) -> (Uuid, Uuid) {
        let user_id = self.add_user(UserRole::Company);
        let company_id = Uuid::new_v4();
        self.tables.lock().unwrap().companies.insert(
            company_id,
            CompanyRow {
                id: company_id,
                user_id,
                name: "Acme".to_string(),
                created_at: Utc::now(),
            },
        );
        (user_id, company_id)
    }

    pub fn add_job(&self, company_id: Uuid, title: &str, status: JobStatus) -> JobPostingRow {
        let now = Utc::now();
        let job = JobPostingRow {
            id: Uuid::new_v4(),
            company_id,
            title: title.to_string(),
            description: format!("{title} working on distributed systems"),
            status,
            salary_min: Some(90_000),
            salary_max: Some(120_000),
            work_type: Some("REMOTE".to_string()),
            country: Some("DE".to_string()),
            source_url: None,
            created_at: now,
            updated_at: now,
        };
        self.tables.lock().unwrap().jobs.insert(job.id, job.clone());
        job
    }

    pub fn add_job_embedding(&self, job_id: Uuid, active: bool) {
        let now = Utc::now();
        self.tables.lock().unwrap().job_embeddings.insert(
            job_id,
            JobEmbeddingRow {
                job_posting_id: job_id,
                content: "seeded".to_string(),
                active,
                created_at: now,
                updated_at: now,
            },
        );
    }

    pub fn add_resume(&self, user_id: Uuid) -> Uuid {
        let now = Utc::now();
        let id = Uuid::new_v4();
        self.tables.lock().unwrap().resumes.insert(
            id,
            ResumeRow {
                id,
                user_id,
                title: "My resume".to_string(),
                file_url: Some(format!("https://files.example.com/{id}.pdf")),
                created_at: now,
                updated_at: now,
            },
        );
        id
    }

    pub fn add_resume_embedding(&self, resume_id: Uuid, active: bool) {
        let now = Utc::now();
        self.tables.lock().unwrap().resume_embeddings.insert(
            resume_id,
            ResumeEmbeddingRow {
                resume_id,
                content: "seeded".to_string(),
                active,
                created_at: now,
                updated_at: now,
            },
        );
    }

    pub fn add_application(&self, resume_id: Uuid, job_id: Uuid) {
        self.tables.lock().unwrap().applications.push(Application {
            resume_id,
            job_posting_id: job_id,
        });
    }

    pub fn add_report(&self, job_id: Uuid, status: ReportStatus) {
        self.tables.lock().unwrap().reports.push(Report {
            job_posting_id: job_id,
            status,
        });
    }

    pub fn job(&self, job_id: Uuid) -> Option<JobPostingRow> {
        self.tables.lock().unwrap().jobs.get(&job_id).cloned()
    }

    pub fn job_embedding(&self, job_id: Uuid) -> Option<JobEmbeddingRow> {
        self.tables.lock().unwrap().job_embeddings.get(&job_id).cloned()
    }

    pub fn resume_embedding(&self, resume_id: Uuid) -> Option<ResumeEmbeddingRow> {
        self.tables
            .lock()
            .unwrap()
            .resume_embeddings
            .get(&resume_id)
            .cloned()
    }

    pub fn user(&self, user_id: Uuid) -> Option<User> {
        self.tables.lock().unwrap().users.get(&user_id).cloned()
    }

    pub fn application_count(&self, job_id: Uuid) -> usize {
        self.tables
            .lock()
            .unwrap()
            .applications
            .iter()
            .filter(|a| a.job_posting_id == job_id)
            .count()
    }
}

#[async_trait]
impl JobBoardRepository for InMemoryJobBoard {
    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.user(user_id))
    }

    async fn get_company_by_user(&self, user_id: Uuid) -> Result<Option<CompanyRow>, AppError> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .companies
            .values()
            .find(|c| c.user_id == user_id)
            .cloned())
    }

    async fn get_job_posting(&self, job_id: Uuid) -> Result<Option<JobPostingRow>, AppError> {
        Ok(self.job(job_id))
    }

    async fn update_job_posting(
        &self,
        job_id: Uuid,
        patch: &JobPostingPatch,
    ) -> Result<JobPostingRow, AppError> {
        let mut tables = self.tables.lock().unwrap();
        let job = tables
            .jobs
            .get_mut(&job_id)
            .ok_or_else(|| AppError::NotFound(format!("Job posting {job_id} not found")))?;
        *job = patch.apply_to(job);
        job.updated_at = Utc::now();
        Ok(job.clone())
    }

    async fn set_job_status(&self, job_id: Uuid, status: JobStatus) -> Result<(), AppError> {
        let mut tables = self.tables.lock().unwrap();
        let job = tables
            .jobs
            .get_mut(&job_id)
            .ok_or_else(|| AppError::NotFound(format!("Job posting {job_id} not found")))?;
        job.status = status;
        Ok(())
    }

    async fn delete_job_posting(&self, job_id: Uuid) -> Result<(), AppError> {
        let mut tables = self.tables.lock().unwrap();
        if tables.jobs.remove(&job_id).is_none() {
            return Err(AppError::NotFound(format!("Job posting {job_id} not found")));
        }
        tables.job_embeddings.remove(&job_id);
        tables.applications.retain(|a| a.job_posting_id != job_id);
        tables.reports.retain(|r| r.job_posting_id != job_id);
        Ok(())
    }

    async fn get_job_embedding(&self, job_id: Uuid) -> Result<Option<JobEmbeddingRow>, AppError> {
        Ok(self.job_embedding(job_id))
    }

    async fn upsert_job_embedding(
        &self,
        job_id: Uuid,
        content: &str,
        active: bool,
    ) -> Result<(), AppError> {
        self.add_job_embedding(job_id, active);
        if let Some(row) = self.tables.lock().unwrap().job_embeddings.get_mut(&job_id) {
            row.content = content.to_string();
        }
        Ok(())
    }

    async fn set_job_embedding_active(&self, job_id: Uuid, active: bool) -> Result<(), AppError> {
        if let Some(row) = self.tables.lock().unwrap().job_embeddings.get_mut(&job_id) {
            row.active = active;
        }
        Ok(())
    }

    async fn get_resume(&self, resume_id: Uuid) -> Result<Option<ResumeRow>, AppError> {
        Ok(self.tables.lock().unwrap().resumes.get(&resume_id).cloned())
    }

    async fn get_resume_embedding(
        &self,
        resume_id: Uuid,
    ) -> Result<Option<ResumeEmbeddingRow>, AppError> {
        Ok(self.resume_embedding(resume_id))
    }

    async fn upsert_resume_embedding(
        &self,
        resume_id: Uuid,
        content: &str,
        active: bool,
    ) -> Result<(), AppError> {
        self.add_resume_embedding(resume_id, active);
        if let Some(row) = self
            .tables
            .lock()
            .unwrap()
            .resume_embeddings
            .get_mut(&resume_id)
        {
            row.content = content.to_string();
        }
        Ok(())
    }

    async fn resume_ids_applied_to_job(&self, job_id: Uuid) -> Result<Vec<Uuid>, AppError> {
        let tables = self.tables.lock().unwrap();
        let mut ids: Vec<Uuid> = Vec::new();
        for application in tables.applications.iter().filter(|a| a.job_posting_id == job_id) {
            if !ids.contains(&application.resume_id) {
                ids.push(application.resume_id);
            }
        }
        Ok(ids)
    }

    async fn applied_job_ids_for_resume(&self, resume_id: Uuid) -> Result<Vec<Uuid>, AppError> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .applications
            .iter()
            .filter(|a| a.resume_id == resume_id)
            .map(|a| a.job_posting_id)
            .collect())
    }

    async fn insert_application(&self, resume_id: Uuid, job_id: Uuid) -> Result<bool, AppError> {
        let exists = self
            .tables
            .lock()
            .unwrap()
            .applications
            .iter()
            .any(|a| a.resume_id == resume_id && a.job_posting_id == job_id);
        if exists {
            return Ok(false);
        }
        self.add_application(resume_id, job_id);
        Ok(true)
    }

    async fn ban_company(&self, user_id: Uuid) -> Result<Vec<Uuid>, AppError> {
        let mut tables = self.tables.lock().unwrap();
        tables.set_approval(user_id, false)?;
        let job_ids = tables.company_job_ids(user_id);
        for id in &job_ids {
            if let Some(job) = tables.jobs.get_mut(id) {
                job.status = JobStatus::DisabledByAdmin;
            }
            if let Some(row) = tables.job_embeddings.get_mut(id) {
                row.active = false;
            }
        }
        Ok(job_ids)
    }

    async fn unban_company(&self, user_id: Uuid) -> Result<CompanyReactivation, AppError> {
        let mut tables = self.tables.lock().unwrap();
        tables.set_approval(user_id, true)?;
        let mut outcome = CompanyReactivation::default();
        for id in tables.company_job_ids(user_id) {
            if tables.has_valid_report(id) {
                outcome.excluded_job_ids.push(id);
                continue;
            }
            if let Some(job) = tables.jobs.get_mut(&id) {
                job.status = JobStatus::Hiring;
            }
            if let Some(row) = tables.job_embeddings.get_mut(&id) {
                row.active = true;
            }
            outcome.reactivated_job_ids.push(id);
        }
        Ok(outcome)
    }

    async fn ban_user(&self, user_id: Uuid) -> Result<Vec<Uuid>, AppError> {
        self.set_user_resumes_active(user_id, false)
    }

    async fn unban_user(&self, user_id: Uuid) -> Result<Vec<Uuid>, AppError> {
        self.set_user_resumes_active(user_id, true)
    }

    async fn user_ban_status(&self, user_id: Uuid) -> Result<UserBanStatus, AppError> {
        let tables = self.tables.lock().unwrap();
        let user = tables
            .users
            .get(&user_id)
            .ok_or_else(|| AppError::NotFound(format!("User {user_id} not found")))?;
        let resumes: Vec<Uuid> = tables
            .resumes
            .values()
            .filter(|r| r.user_id == user_id)
            .map(|r| r.id)
            .collect();
        let active = resumes
            .iter()
            .filter(|id| tables.resume_embeddings.get(id).is_some_and(|e| e.active))
            .count();
        Ok(UserBanStatus {
            user_id,
            banned: !user.is_approved,
            total_resumes: resumes.len() as i64,
            active_resumes: active as i64,
        })
    }

    async fn company_ban_status(&self, user_id: Uuid) -> Result<CompanyBanStatus, AppError> {
        let tables = self.tables.lock().unwrap();
        let user = tables
            .users
            .get(&user_id)
            .ok_or_else(|| AppError::NotFound(format!("User {user_id} not found")))?;
        let job_ids = tables.company_job_ids(user_id);
        let count = |pred: &dyn Fn(&JobPostingRow) -> bool| {
            job_ids
                .iter()
                .filter_map(|id| tables.jobs.get(id))
                .filter(|j| pred(j))
                .count() as i64
        };
        Ok(CompanyBanStatus {
            user_id,
            banned: !user.is_approved,
            total_jobs: job_ids.len() as i64,
            active_jobs: count(&|j| j.status.is_active()),
            disabled_jobs: count(&|j| j.status == JobStatus::DisabledByAdmin),
            reported_jobs: job_ids
                .iter()
                .filter(|id| tables.has_valid_report(**id))
                .count() as i64,
        })
    }
}

impl InMemoryJobBoard {
    fn set_user_resumes_active(&self, user_id: Uuid, active: bool) -> Result<Vec<Uuid>, AppError> {
        let mut tables = self.tables.lock().unwrap();
        tables.set_approval(user_id, active)?;
        let mut ids: Vec<Uuid> = tables
            .resumes
            .values()
            .filter(|r| r.user_id == user_id)
            .map(|r| r.id)
            .collect();
        ids.sort();
        for id in &ids {
            if let Some(row) = tables.resume_embeddings.get_mut(id) {
                row.active = active;
            }
        }
        Ok(ids)
    }
}
