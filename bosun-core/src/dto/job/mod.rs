//! Job DTOs for the caller-facing control surface

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::job::{Job, JobStatus};
use crate::domain::manifest::AgentKind;

/// Response to a job submission. The caller gets the id immediately;
/// provisioning continues in the background.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitAccepted {
    pub job_id: Uuid,
}

/// Point-in-time view of a job's lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub progress: Option<String>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl StatusSnapshot {
    pub fn of(job: &Job) -> Self {
        Self {
            job_id: job.id,
            status: job.status,
            progress: job.progress.clone(),
            error: job.error.clone(),
            created_at: job.created_at,
            started_at: job.started_at,
            completed_at: job.completed_at,
        }
    }
}

/// Final outcome of a terminal job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultSnapshot {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub exit_code: Option<i32>,
    pub output: Option<String>,
    pub error: Option<String>,
    pub artifacts: Option<serde_json::Value>,
    pub duration_seconds: Option<f64>,
}

impl ResultSnapshot {
    pub fn of(job: &Job) -> Self {
        Self {
            job_id: job.id,
            status: job.status,
            exit_code: job.exit_code,
            output: job.output.clone(),
            error: job.error.clone(),
            artifacts: job.artifacts.clone(),
            // Prefer the orchestrator's own clock over the runner-reported
            // duration when both timestamps are known.
            duration_seconds: job.elapsed_seconds().or(job.duration_seconds),
        }
    }
}

/// Thin listing projection over the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSummary {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub agent_type: AgentKind,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl JobSummary {
    pub fn of(job: &Job) -> Self {
        Self {
            job_id: job.id,
            status: job.status,
            agent_type: job.manifest.agent_type,
            created_at: job.created_at,
            started_at: job.started_at,
            completed_at: job.completed_at,
        }
    }
}
