use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Lifecycle status of a job posting. Stored as the Postgres enum `job_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "job_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Hiring,
    UrgentlyHiring,
    Closed,
    DisabledByAdmin,
}

impl JobStatus {
    /// Whether a posting in this status may appear in search results.
    pub fn is_active(self) -> bool {
        matches!(self, JobStatus::Hiring | JobStatus::UrgentlyHiring)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Hiring => "HIRING",
            JobStatus::UrgentlyHiring => "URGENTLY_HIRING",
            JobStatus::Closed => "CLOSED",
            JobStatus::DisabledByAdmin => "DISABLED_BY_ADMIN",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobPostingRow {
    pub id: Uuid,
    pub company_id: Uuid,
    pub title: String,
    pub description: String,
    pub status: JobStatus,
    pub salary_min: Option<i32>,
    pub salary_max: Option<i32>,
    pub work_type: Option<String>,
    pub country: Option<String>,
    pub source_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Field changes requested for a job posting. `None` leaves the column as is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobPostingPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<JobStatus>,
    pub salary_min: Option<i32>,
    pub salary_max: Option<i32>,
    pub work_type: Option<String>,
    pub country: Option<String>,
    pub source_url: Option<String>,
}

impl JobPostingPatch {
    /// Returns `job` with the patch applied.
    pub fn apply_to(&self, job: &JobPostingRow) -> JobPostingRow {
        let mut next = job.clone();
        if let Some(title) = &self.title {
            next.title = title.clone();
        }
        if let Some(description) = &self.description {
            next.description = description.clone();
        }
        if let Some(status) = self.status {
            next.status = status;
        }
        if self.salary_min.is_some() {
            next.salary_min = self.salary_min;
        }
        if self.salary_max.is_some() {
            next.salary_max = self.salary_max;
        }
        if self.work_type.is_some() {
            next.work_type = self.work_type.clone();
        }
        if self.country.is_some() {
            next.country = self.country.clone();
        }
        if self.source_url.is_some() {
            next.source_url = self.source_url.clone();
        }
        next
    }
}

/// Relational half of a Job Document. The vector half is keyed by the same `job_posting_id`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobEmbeddingRow {
    pub job_posting_id: Uuid,
    pub content: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CompanyRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}
