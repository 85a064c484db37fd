//! Callback Service
//!
//! Translates inbound reports from in-environment task runners into job
//! store mutations. Reports arrive over the network in no guaranteed
//! order; the one invariant enforced here is that a terminal status never
//! regresses.

use chrono::Utc;
use uuid::Uuid;

use bosun_core::dto::callback::{CompletionReport, ProgressReport};
use bosun_core::domain::job::JobStatus;

use crate::store::JobStore;

/// Service error type
#[derive(Debug)]
pub enum CallbackError {
    JobNotFound(Uuid),
}

/// Applies a completion report: terminal status, result fields, and the
/// completion timestamp.
///
/// Safe to retry: re-delivering the same report re-applies the same
/// terminal state. A report that disagrees with an existing terminal
/// status (e.g. arriving after a timeout) is accepted but changes nothing.
pub async fn complete_job(
    store: &JobStore,
    id: Uuid,
    report: CompletionReport,
) -> Result<(), CallbackError> {
    let now = Utc::now();

    let applied = store
        .modify(id, |job| {
            let target = report.status.as_job_status();

            if job.status.is_terminal() && job.status != target {
                return false;
            }

            if job.status != JobStatus::Running && !job.status.is_terminal() {
                tracing::warn!(
                    "Completing job {} that is not running yet (current: {})",
                    id,
                    job.status
                );
            }

            job.status = target;
            job.exit_code = Some(report.exit_code);
            job.output = Some(report.output);
            job.duration_seconds = Some(report.duration_seconds);
            if report.artifacts.is_some() {
                job.artifacts = report.artifacts;
            }
            if report.error.is_some() {
                job.error = report.error;
            }
            job.completed_at.get_or_insert(now);
            true
        })
        .await;

    match applied {
        Some(true) => {
            tracing::info!("Job {} completed with status {}", id, report.status.as_job_status());
            Ok(())
        }
        Some(false) => {
            tracing::debug!("Ignoring completion report for already-terminal job {}", id);
            Ok(())
        }
        None => Err(CallbackError::JobNotFound(id)),
    }
}

/// Applies a progress report. Counts as a liveness signal while the job
/// is running; a report landing after the job went terminal is accepted
/// with no material effect.
pub async fn record_progress(
    store: &JobStore,
    id: Uuid,
    report: ProgressReport,
) -> Result<(), CallbackError> {
    let now = Utc::now();

    store
        .modify(id, |job| {
            if job.status != JobStatus::Running {
                return;
            }
            job.progress = Some(report.progress);
            if report.output.is_some() {
                job.output = report.output;
            }
            job.last_heartbeat = Some(now);
        })
        .await
        .ok_or(CallbackError::JobNotFound(id))?;

    tracing::debug!("Progress report for job {}", id);
    Ok(())
}

/// Refreshes the liveness timestamp of a running job.
pub async fn record_heartbeat(store: &JobStore, id: Uuid) -> Result<(), CallbackError> {
    let now = Utc::now();

    store
        .modify(id, |job| {
            if job.status == JobStatus::Running {
                job.last_heartbeat = Some(now);
            }
        })
        .await
        .ok_or(CallbackError::JobNotFound(id))?;

    tracing::debug!("Heartbeat from job {}", id);
    Ok(())
}
