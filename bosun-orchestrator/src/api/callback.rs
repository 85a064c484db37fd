//! Callback API Handlers
//!
//! Ingestion endpoints for reports POSTed by in-environment task runners.
//! The only authorization is job-id matching: the id in the path must name
//! a known job and agree with the id in the payload.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use uuid::Uuid;

use bosun_core::dto::callback::{CompletionReport, ProgressReport};

use crate::api::error::{ApiError, ApiResult};
use crate::service::{Orchestrator, callback_service};

/// POST /callback/{id}/complete
/// Final report from the task runner
pub async fn complete(
    State(orchestrator): State<Arc<Orchestrator>>,
    Path(id): Path<Uuid>,
    report: Result<Json<CompletionReport>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let Json(report) = report.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    if report.job_id != id {
        return Err(ApiError::BadRequest(format!(
            "payload job_id {} does not match path id {}",
            report.job_id, id
        )));
    }

    callback_service::complete_job(orchestrator.store(), id, report).await?;

    Ok(StatusCode::OK)
}

/// POST /callback/{id}/status
/// Progress report; counts as a liveness signal
pub async fn report_status(
    State(orchestrator): State<Arc<Orchestrator>>,
    Path(id): Path<Uuid>,
    report: Result<Json<ProgressReport>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let Json(report) = report.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    if report.job_id != id {
        return Err(ApiError::BadRequest(format!(
            "payload job_id {} does not match path id {}",
            report.job_id, id
        )));
    }

    callback_service::record_progress(orchestrator.store(), id, report).await?;

    Ok(StatusCode::OK)
}

/// POST /callback/{id}/heartbeat
/// Bare liveness signal; no body contract
pub async fn heartbeat(
    State(orchestrator): State<Arc<Orchestrator>>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    callback_service::record_heartbeat(orchestrator.store(), id).await?;

    Ok(StatusCode::OK)
}
