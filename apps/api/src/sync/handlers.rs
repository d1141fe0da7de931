use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::job::{JobPostingPatch, JobStatus};
use crate::repository::{CompanyBanStatus, UserBanStatus};
use crate::state::AppState;
use crate::sync::cascade::{BanReport, JobDeletionReport};
use crate::sync::metadata::SyncOutcome;
use crate::sync::service::{ApplicationResult, JobMatch, JobUpdateResult};

const DEFAULT_TOP_K: usize = 10;

#[derive(Deserialize)]
pub struct ActorQuery {
    pub actor_user_id: Uuid,
}

#[derive(Deserialize)]
pub struct ActorBody {
    pub actor_user_id: Uuid,
}

#[derive(Serialize)]
pub struct ToggleStatusResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
}

/// POST /api/v1/jobs/:id/toggle-status
pub async fn handle_toggle_status(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    Json(req): Json<ActorBody>,
) -> Result<Json<ToggleStatusResponse>, AppError> {
    let status = state.jobs.toggle_job_status(job_id, req.actor_user_id).await?;
    Ok(Json(ToggleStatusResponse { job_id, status }))
}

#[derive(Deserialize)]
pub struct UpdateJobRequest {
    pub actor_user_id: Uuid,
    #[serde(flatten)]
    pub fields: JobPostingPatch,
}

/// PATCH /api/v1/jobs/:id
pub async fn handle_update_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    Json(req): Json<UpdateJobRequest>,
) -> Result<Json<JobUpdateResult>, AppError> {
    let result = state
        .jobs
        .update_job(job_id, req.actor_user_id, req.fields)
        .await?;
    Ok(Json(result))
}

/// DELETE /api/v1/jobs/:id
pub async fn handle_delete_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    Query(params): Query<ActorQuery>,
) -> Result<Json<JobDeletionReport>, AppError> {
    let report = state.jobs.delete_job(job_id, params.actor_user_id).await?;
    Ok(Json(report))
}

/// POST /api/v1/jobs/:id/reembed
pub async fn handle_reembed_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    Json(req): Json<ActorBody>,
) -> Result<StatusCode, AppError> {
    state.jobs.reembed_job(job_id, req.actor_user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct VectorMetadataRequest {
    pub actor_user_id: Uuid,
    pub active: bool,
}

#[derive(Serialize)]
pub struct VectorMetadataResponse {
    pub job_id: Uuid,
    pub vector_outcome: SyncOutcome,
}

/// PUT /api/v1/jobs/:id/vector-metadata
pub async fn handle_update_job_vector_metadata(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    Json(req): Json<VectorMetadataRequest>,
) -> Result<Json<VectorMetadataResponse>, AppError> {
    let vector_outcome = state
        .jobs
        .update_job_metadata_only(job_id, req.actor_user_id, req.active)
        .await?;
    Ok(Json(VectorMetadataResponse {
        job_id,
        vector_outcome,
    }))
}

#[derive(Deserialize)]
pub struct ApplicationRequest {
    pub actor_user_id: Uuid,
    pub resume_id: Uuid,
    pub job_posting_id: Uuid,
}

/// POST /api/v1/applications
pub async fn handle_record_application(
    State(state): State<AppState>,
    Json(req): Json<ApplicationRequest>,
) -> Result<(StatusCode, Json<ApplicationResult>), AppError> {
    let result = state
        .jobs
        .record_application(req.resume_id, req.job_posting_id, req.actor_user_id)
        .await?;
    let status = if result.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(result)))
}

#[derive(Deserialize)]
pub struct ResumeContentRequest {
    pub actor_user_id: Uuid,
    pub content: String,
}

/// PUT /api/v1/resumes/:id/content
pub async fn handle_reembed_resume(
    State(state): State<AppState>,
    Path(resume_id): Path<Uuid>,
    Json(req): Json<ResumeContentRequest>,
) -> Result<StatusCode, AppError> {
    state
        .jobs
        .reembed_resume(resume_id, req.actor_user_id, &req.content)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct MatchQuery {
    pub top_k: Option<usize>,
}

/// GET /api/v1/resumes/:id/matches
pub async fn handle_find_matches(
    State(state): State<AppState>,
    Path(resume_id): Path<Uuid>,
    Query(params): Query<MatchQuery>,
) -> Result<Json<Vec<JobMatch>>, AppError> {
    let matches = state
        .jobs
        .find_matching_jobs(resume_id, params.top_k.unwrap_or(DEFAULT_TOP_K))
        .await?;
    Ok(Json(matches))
}

/// POST /api/v1/admin/users/:id/ban
pub async fn handle_ban_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(req): Json<ActorBody>,
) -> Result<Json<BanReport>, AppError> {
    Ok(Json(state.jobs.ban_user(user_id, req.actor_user_id).await?))
}

/// POST /api/v1/admin/users/:id/unban
pub async fn handle_unban_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(req): Json<ActorBody>,
) -> Result<Json<BanReport>, AppError> {
    Ok(Json(state.jobs.unban_user(user_id, req.actor_user_id).await?))
}

/// POST /api/v1/admin/companies/:id/ban
pub async fn handle_ban_company(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(req): Json<ActorBody>,
) -> Result<Json<BanReport>, AppError> {
    Ok(Json(state.jobs.ban_company(user_id, req.actor_user_id).await?))
}

/// POST /api/v1/admin/companies/:id/unban
pub async fn handle_unban_company(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(req): Json<ActorBody>,
) -> Result<Json<BanReport>, AppError> {
    Ok(Json(state.jobs.unban_company(user_id, req.actor_user_id).await?))
}

/// GET /api/v1/admin/users/:id/ban-status
pub async fn handle_user_ban_status(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(params): Query<ActorQuery>,
) -> Result<Json<UserBanStatus>, AppError> {
    Ok(Json(
        state
            .jobs
            .get_user_ban_status(user_id, params.actor_user_id)
            .await?,
    ))
}

/// GET /api/v1/admin/companies/:id/ban-status
pub async fn handle_company_ban_status(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(params): Query<ActorQuery>,
) -> Result<Json<CompanyBanStatus>, AppError> {
    Ok(Json(
        state
            .jobs
            .get_company_ban_status(user_id, params.actor_user_id)
            .await?,
    ))
}
