//! Callback DTOs: reports the in-environment task runner POSTs back

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::job::JobStatus;

/// Final report for a finished task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionReport {
    pub job_id: Uuid,
    pub status: ReportedOutcome,
    pub exit_code: i32,
    pub output: String,
    #[serde(default)]
    pub artifacts: Option<serde_json::Value>,
    pub duration_seconds: f64,
    #[serde(default)]
    pub error: Option<String>,
}

/// Terminal outcome as reported over the wire. Only `success` and
/// `failed` are valid; `timeout` is orchestrator-driven and never
/// reported by the runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportedOutcome {
    Success,
    Failed,
}

impl ReportedOutcome {
    pub fn as_job_status(self) -> JobStatus {
        match self {
            ReportedOutcome::Success => JobStatus::Success,
            ReportedOutcome::Failed => JobStatus::Failed,
        }
    }
}

/// Intermediate progress report. Counts as a liveness signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressReport {
    pub job_id: Uuid,
    pub progress: String,
    #[serde(default)]
    pub output: Option<String>,
}
