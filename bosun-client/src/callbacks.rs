//! Callback reporting endpoints (task-runner side)
//!
//! These are the methods an in-environment task runner uses to report
//! back to the orchestrator over the callback base URL it was seeded with.

use crate::OrchestratorClient;
use crate::error::Result;
use bosun_core::dto::callback::{CompletionReport, ProgressReport};
use uuid::Uuid;

impl OrchestratorClient {
    /// Report a finished task with its final status and output
    ///
    /// Safe to retry: re-delivering the same report leaves the job in the
    /// same terminal state.
    pub async fn report_completion(&self, report: CompletionReport) -> Result<()> {
        let url = format!("{}/callback/{}/complete", self.base_url, report.job_id);
        let response = self.client.post(&url).json(&report).send().await?;

        tracing::debug!("Reported completion for job {}", report.job_id);

        self.handle_empty_response(response).await
    }

    /// Report intermediate progress; also counts as a liveness signal
    pub async fn report_progress(&self, report: ProgressReport) -> Result<()> {
        let url = format!("{}/callback/{}/status", self.base_url, report.job_id);
        let response = self.client.post(&url).json(&report).send().await?;

        self.handle_empty_response(response).await
    }

    /// Send a bare liveness signal for a running job
    ///
    /// Should be called periodically so the orchestrator's staleness check
    /// does not expire the job.
    pub async fn send_heartbeat(&self, job_id: Uuid) -> Result<()> {
        let url = format!("{}/callback/{}/heartbeat", self.base_url, job_id);
        let response = self.client.post(&url).send().await?;

        self.handle_empty_response(response).await
    }
}
