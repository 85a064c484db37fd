//! Job domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::manifest::JobManifest;

/// Job execution record
///
/// The authoritative state of one submitted job, shared between the
/// orchestrator's store, the callback ingestion path, and the reconciler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub manifest: JobManifest,
    pub status: JobStatus,
    /// Handle of the provisioned environment, present from a successful
    /// create until cleanup destroys it.
    pub environment: Option<EnvironmentHandle>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Most recent liveness signal from the environment's task runner.
    pub last_heartbeat: Option<DateTime<Utc>>,
    pub progress: Option<String>,
    pub output: Option<String>,
    pub error: Option<String>,
    pub artifacts: Option<serde_json::Value>,
    pub exit_code: Option<i32>,
    pub duration_seconds: Option<f64>,
}

impl Job {
    /// Creates a fresh pending job for a manifest.
    pub fn new(manifest: JobManifest) -> Self {
        Self {
            id: Uuid::new_v4(),
            manifest,
            status: JobStatus::Pending,
            environment: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            last_heartbeat: None,
            progress: None,
            output: None,
            error: None,
            artifacts: None,
            exit_code: None,
            duration_seconds: None,
        }
    }

    /// Whether this job has been running longer than its manifest timeout.
    ///
    /// Only running jobs with a start time and a manifest timeout can
    /// expire; everything else is excluded.
    pub fn exceeded_timeout(&self, now: DateTime<Utc>) -> bool {
        if self.status != JobStatus::Running {
            return false;
        }
        match (self.started_at, self.manifest.timeout_seconds) {
            (Some(started_at), Some(timeout)) => {
                (now - started_at).num_seconds() > timeout as i64
            }
            _ => false,
        }
    }

    /// Whether this job's environment has gone silent: running, but no
    /// liveness signal within `threshold_seconds`.
    pub fn heartbeat_stale(&self, threshold_seconds: i64, now: DateTime<Utc>) -> bool {
        if self.status != JobStatus::Running {
            return false;
        }
        match self.last_heartbeat {
            Some(heartbeat) => (now - heartbeat).num_seconds() > threshold_seconds,
            None => false,
        }
    }

    /// Wall-clock duration between start and completion, when both are known.
    pub fn elapsed_seconds(&self) -> Option<f64> {
        match (self.started_at, self.completed_at) {
            (Some(started), Some(completed)) => {
                Some((completed - started).num_milliseconds() as f64 / 1000.0)
            }
            _ => None,
        }
    }
}

/// Job execution status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Provisioning,
    Running,
    Success,
    Failed,
    Timeout,
}

impl JobStatus {
    /// Whether this status is final. Terminal statuses are never revisited.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Success | JobStatus::Failed | JobStatus::Timeout)
    }

    /// Valid forward transitions of the lifecycle state machine.
    ///
    /// `Failed` is reachable from every non-terminal state (provisioning
    /// failure, cancellation); `Timeout` only from `Running`.
    pub fn can_transition(self, next: JobStatus) -> bool {
        match (self, next) {
            (JobStatus::Pending, JobStatus::Provisioning) => true,
            (JobStatus::Pending, JobStatus::Failed) => true,
            (JobStatus::Provisioning, JobStatus::Running) => true,
            (JobStatus::Provisioning, JobStatus::Failed) => true,
            (JobStatus::Running, JobStatus::Success) => true,
            (JobStatus::Running, JobStatus::Failed) => true,
            (JobStatus::Running, JobStatus::Timeout) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Provisioning => write!(f, "provisioning"),
            JobStatus::Running => write!(f, "running"),
            JobStatus::Success => write!(f, "success"),
            JobStatus::Failed => write!(f, "failed"),
            JobStatus::Timeout => write!(f, "timeout"),
        }
    }
}

/// Opaque reference to a provisioned execution environment.
///
/// Handles are issued by the provisioner and never reused across jobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentHandle(pub String);

impl EnvironmentHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EnvironmentHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
