use anyhow::Result;
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::info;
use uuid::Uuid;

use super::{CompanyBanStatus, CompanyReactivation, JobBoardRepository, UserBanStatus};
use crate::errors::AppError;
use crate::models::job::{CompanyRow, JobEmbeddingRow, JobPostingPatch, JobPostingRow, JobStatus};
use crate::models::report::ReportStatus;
use crate::models::resume::{ResumeEmbeddingRow, ResumeRow};
use crate::models::user::User;

/// Creates and returns a PostgreSQL connection pool.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    info!("Connecting to PostgreSQL...");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    info!("PostgreSQL connection pool established");
    Ok(pool)
}

#[derive(Clone)]
pub struct PgJobBoard {
    pool: PgPool,
}

impl PgJobBoard {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

async fn set_user_approval(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    approved: bool,
) -> Result<(), AppError> {
    let result = sqlx::query("UPDATE users SET is_approved = $1 WHERE id = $2")
        .bind(approved)
        .bind(user_id)
        .execute(&mut **tx)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("User {user_id} not found")));
    }
    Ok(())
}

#[async_trait]
impl JobBoardRepository for PgJobBoard {
    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, AppError> {
        Ok(sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_company_by_user(&self, user_id: Uuid) -> Result<Option<CompanyRow>, AppError> {
        Ok(
            sqlx::query_as::<_, CompanyRow>("SELECT * FROM companies WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn get_job_posting(&self, job_id: Uuid) -> Result<Option<JobPostingRow>, AppError> {
        Ok(
            sqlx::query_as::<_, JobPostingRow>("SELECT * FROM job_postings WHERE id = $1")
                .bind(job_id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn update_job_posting(
        &self,
        job_id: Uuid,
        patch: &JobPostingPatch,
    ) -> Result<JobPostingRow, AppError> {
        sqlx::query_as::<_, JobPostingRow>(
            r#"
            UPDATE job_postings SET
                title       = COALESCE($2, title),
                description = COALESCE($3, description),
                status      = COALESCE($4, status),
                salary_min  = COALESCE($5, salary_min),
                salary_max  = COALESCE($6, salary_max),
                work_type   = COALESCE($7, work_type),
                country     = COALESCE($8, country),
                source_url  = COALESCE($9, source_url),
                updated_at  = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(job_id)
        .bind(&patch.title)
        .bind(&patch.description)
        .bind(patch.status)
        .bind(patch.salary_min)
        .bind(patch.salary_max)
        .bind(&patch.work_type)
        .bind(&patch.country)
        .bind(&patch.source_url)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job posting {job_id} not found")))
    }

    async fn set_job_status(&self, job_id: Uuid, status: JobStatus) -> Result<(), AppError> {
        let result =
            sqlx::query("UPDATE job_postings SET status = $1, updated_at = NOW() WHERE id = $2")
                .bind(status)
                .bind(job_id)
                .execute(&self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Job posting {job_id} not found")));
        }
        Ok(())
    }

    async fn delete_job_posting(&self, job_id: Uuid) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        for statement in [
            "DELETE FROM applications WHERE job_posting_id = $1",
            "DELETE FROM reports WHERE job_posting_id = $1",
            "DELETE FROM job_posting_embeddings WHERE job_posting_id = $1",
        ] {
            sqlx::query(statement).bind(job_id).execute(&mut *tx).await?;
        }
        let result = sqlx::query("DELETE FROM job_postings WHERE id = $1")
            .bind(job_id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Job posting {job_id} not found")));
        }
        tx.commit().await?;
        Ok(())
    }

    async fn get_job_embedding(&self, job_id: Uuid) -> Result<Option<JobEmbeddingRow>, AppError> {
        Ok(sqlx::query_as::<_, JobEmbeddingRow>(
            "SELECT * FROM job_posting_embeddings WHERE job_posting_id = $1",
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn upsert_job_embedding(
        &self,
        job_id: Uuid,
        content: &str,
        active: bool,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO job_posting_embeddings (job_posting_id, content, active)
            VALUES ($1, $2, $3)
            ON CONFLICT (job_posting_id)
            DO UPDATE SET content = EXCLUDED.content, active = EXCLUDED.active, updated_at = NOW()
            "#,
        )
        .bind(job_id)
        .bind(content)
        .bind(active)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_job_embedding_active(&self, job_id: Uuid, active: bool) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE job_posting_embeddings SET active = $1, updated_at = NOW() WHERE job_posting_id = $2",
        )
        .bind(active)
        .bind(job_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_resume(&self, resume_id: Uuid) -> Result<Option<ResumeRow>, AppError> {
        Ok(
            sqlx::query_as::<_, ResumeRow>("SELECT * FROM resumes WHERE id = $1")
                .bind(resume_id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn get_resume_embedding(
        &self,
        resume_id: Uuid,
    ) -> Result<Option<ResumeEmbeddingRow>, AppError> {
        Ok(sqlx::query_as::<_, ResumeEmbeddingRow>(
            "SELECT * FROM resume_embeddings WHERE resume_id = $1",
        )
        .bind(resume_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn upsert_resume_embedding(
        &self,
        resume_id: Uuid,
        content: &str,
        active: bool,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO resume_embeddings (resume_id, content, active)
            VALUES ($1, $2, $3)
            ON CONFLICT (resume_id)
            DO UPDATE SET content = EXCLUDED.content, active = EXCLUDED.active, updated_at = NOW()
            "#,
        )
        .bind(resume_id)
        .bind(content)
        .bind(active)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn resume_ids_applied_to_job(&self, job_id: Uuid) -> Result<Vec<Uuid>, AppError> {
        Ok(sqlx::query_scalar(
            "SELECT DISTINCT resume_id FROM applications WHERE job_posting_id = $1",
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn applied_job_ids_for_resume(&self, resume_id: Uuid) -> Result<Vec<Uuid>, AppError> {
        Ok(sqlx::query_scalar(
            "SELECT job_posting_id FROM applications WHERE resume_id = $1 ORDER BY created_at ASC",
        )
        .bind(resume_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn insert_application(&self, resume_id: Uuid, job_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO applications (id, resume_id, job_posting_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (resume_id, job_posting_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(resume_id)
        .bind(job_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn ban_company(&self, user_id: Uuid) -> Result<Vec<Uuid>, AppError> {
        let mut tx = self.pool.begin().await?;
        set_user_approval(&mut tx, user_id, false).await?;

        let job_ids: Vec<Uuid> = sqlx::query_scalar(
            r#"
            UPDATE job_postings SET status = $1, updated_at = NOW()
            WHERE company_id IN (SELECT id FROM companies WHERE user_id = $2)
            RETURNING id
            "#,
        )
        .bind(JobStatus::DisabledByAdmin)
        .bind(user_id)
        .fetch_all(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE job_posting_embeddings SET active = FALSE, updated_at = NOW() WHERE job_posting_id = ANY($1)",
        )
        .bind(&job_ids)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        info!("Company user {user_id} banned: {} job postings disabled", job_ids.len());
        Ok(job_ids)
    }

    async fn unban_company(&self, user_id: Uuid) -> Result<CompanyReactivation, AppError> {
        let mut tx = self.pool.begin().await?;
        set_user_approval(&mut tx, user_id, true).await?;

        let jobs: Vec<(Uuid, bool)> = sqlx::query_as(
            r#"
            SELECT jp.id,
                   EXISTS (
                       SELECT 1 FROM reports r
                       WHERE r.job_posting_id = jp.id AND r.status = $1
                   ) AS excluded
            FROM job_postings jp
            JOIN companies c ON c.id = jp.company_id
            WHERE c.user_id = $2
            "#,
        )
        .bind(ReportStatus::ResolvedValid)
        .bind(user_id)
        .fetch_all(&mut *tx)
        .await?;

        let (excluded, reactivated): (Vec<_>, Vec<_>) =
            jobs.into_iter().partition(|(_, excluded)| *excluded);
        let reactivated_job_ids: Vec<Uuid> = reactivated.into_iter().map(|(id, _)| id).collect();
        let excluded_job_ids: Vec<Uuid> = excluded.into_iter().map(|(id, _)| id).collect();

        sqlx::query("UPDATE job_postings SET status = $1, updated_at = NOW() WHERE id = ANY($2)")
            .bind(JobStatus::Hiring)
            .bind(&reactivated_job_ids)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "UPDATE job_posting_embeddings SET active = TRUE, updated_at = NOW() WHERE job_posting_id = ANY($1)",
        )
        .bind(&reactivated_job_ids)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        info!(
            "Company user {user_id} unbanned: {} job postings reactivated, {} kept disabled by reports",
            reactivated_job_ids.len(),
            excluded_job_ids.len()
        );
        Ok(CompanyReactivation {
            reactivated_job_ids,
            excluded_job_ids,
        })
    }

    async fn ban_user(&self, user_id: Uuid) -> Result<Vec<Uuid>, AppError> {
        self.set_user_resumes_active(user_id, false).await
    }

    async fn unban_user(&self, user_id: Uuid) -> Result<Vec<Uuid>, AppError> {
        self.set_user_resumes_active(user_id, true).await
    }

    async fn user_ban_status(&self, user_id: Uuid) -> Result<UserBanStatus, AppError> {
        let user = self
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {user_id} not found")))?;

        let (total_resumes, active_resumes): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*),
                   COUNT(*) FILTER (WHERE re.active)
            FROM resumes r
            LEFT JOIN resume_embeddings re ON re.resume_id = r.id
            WHERE r.user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(UserBanStatus {
            user_id,
            banned: !user.is_approved,
            total_resumes,
            active_resumes,
        })
    }

    async fn company_ban_status(&self, user_id: Uuid) -> Result<CompanyBanStatus, AppError> {
        let user = self
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {user_id} not found")))?;

        let (total_jobs, active_jobs, disabled_jobs, reported_jobs): (i64, i64, i64, i64) =
            sqlx::query_as(
                r#"
                SELECT COUNT(*),
                       COUNT(*) FILTER (WHERE jp.status IN ('HIRING', 'URGENTLY_HIRING')),
                       COUNT(*) FILTER (WHERE jp.status = 'DISABLED_BY_ADMIN'),
                       COUNT(*) FILTER (WHERE EXISTS (
                           SELECT 1 FROM reports r
                           WHERE r.job_posting_id = jp.id AND r.status = 'RESOLVED_VALID'
                       ))
                FROM job_postings jp
                JOIN companies c ON c.id = jp.company_id
                WHERE c.user_id = $1
                "#,
            )
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(CompanyBanStatus {
            user_id,
            banned: !user.is_approved,
            total_jobs,
            active_jobs,
            disabled_jobs,
            reported_jobs,
        })
    }
}

impl PgJobBoard {
    async fn set_user_resumes_active(
        &self,
        user_id: Uuid,
        active: bool,
    ) -> Result<Vec<Uuid>, AppError> {
        let mut tx = self.pool.begin().await?;
        set_user_approval(&mut tx, user_id, active).await?;

        let resume_ids: Vec<Uuid> = sqlx::query_scalar("SELECT id FROM resumes WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(&mut *tx)
            .await?;

        sqlx::query(
            "UPDATE resume_embeddings SET active = $1, updated_at = NOW() WHERE resume_id = ANY($2)",
        )
        .bind(active)
        .bind(&resume_ids)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        info!(
            "User {user_id} {}: {} resumes updated",
            if active { "unbanned" } else { "banned" },
            resume_ids.len()
        );
        Ok(resume_ids)
    }
}
