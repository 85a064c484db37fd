//! Job API Handlers
//!
//! The caller-facing control surface: submit, status, result, cancel, list.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::Deserialize;
use uuid::Uuid;

use bosun_core::domain::job::JobStatus;
use bosun_core::domain::manifest::JobManifest;
use bosun_core::dto::job::{JobSummary, ResultSnapshot, StatusSnapshot, SubmitAccepted};

use crate::api::error::{ApiError, ApiResult};
use crate::service::Orchestrator;

/// POST /jobs
/// Accept a manifest and start provisioning in the background
pub async fn submit_job(
    State(orchestrator): State<Arc<Orchestrator>>,
    manifest: Result<Json<JobManifest>, JsonRejection>,
) -> ApiResult<Json<SubmitAccepted>> {
    let Json(manifest) = manifest.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    tracing::info!("Submitting {:?} job", manifest.agent_type);

    let job_id = orchestrator.submit(manifest).await?;

    Ok(Json(SubmitAccepted { job_id }))
}

/// GET /jobs
/// List jobs, optionally filtered by status
pub async fn list_jobs(
    State(orchestrator): State<Arc<Orchestrator>>,
    Query(params): Query<ListJobsQuery>,
) -> ApiResult<Json<Vec<JobSummary>>> {
    tracing::debug!("Listing jobs (filter: {:?})", params.status);

    let jobs = orchestrator.list(params.status).await;

    Ok(Json(jobs))
}

/// GET /jobs/{id}/status
/// Lifecycle snapshot for a job
pub async fn get_job_status(
    State(orchestrator): State<Arc<Orchestrator>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<StatusSnapshot>> {
    tracing::debug!("Getting status for job: {}", id);

    let snapshot = orchestrator.get_status(id).await?;

    Ok(Json(snapshot))
}

/// GET /jobs/{id}/result
/// Final outcome; 409 while the job has not completed
pub async fn get_job_result(
    State(orchestrator): State<Arc<Orchestrator>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ResultSnapshot>> {
    tracing::debug!("Getting result for job: {}", id);

    let snapshot = orchestrator.get_result(id).await?;

    Ok(Json(snapshot))
}

/// POST /jobs/{id}/cancel
/// Cancel a non-terminal job
pub async fn cancel_job(
    State(orchestrator): State<Arc<Orchestrator>>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    tracing::info!("Cancelling job: {}", id);

    orchestrator.cancel(id).await?;

    Ok(StatusCode::OK)
}

#[derive(Debug, Deserialize)]
pub struct ListJobsQuery {
    pub status: Option<JobStatus>,
}
