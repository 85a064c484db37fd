//! Caller-facing job control endpoints

use crate::OrchestratorClient;
use crate::error::Result;
use bosun_core::domain::job::JobStatus;
use bosun_core::domain::manifest::JobManifest;
use bosun_core::dto::job::{JobSummary, ResultSnapshot, StatusSnapshot, SubmitAccepted};
use uuid::Uuid;

impl OrchestratorClient {
    /// Submit a job for execution
    ///
    /// The orchestrator answers with the job id as soon as the manifest is
    /// accepted; provisioning continues in the background. Poll
    /// [`get_status`](Self::get_status) to follow the lifecycle.
    ///
    /// # Example
    /// ```no_run
    /// # use bosun_client::OrchestratorClient;
    /// # use bosun_core::domain::manifest::{AgentKind, JobManifest};
    /// # async fn example() -> anyhow::Result<()> {
    /// let client = OrchestratorClient::new("http://localhost:8765");
    /// let accepted = client
    ///     .submit_job(JobManifest::for_task("build the docs", AgentKind::Script))
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn submit_job(&self, manifest: JobManifest) -> Result<SubmitAccepted> {
        let url = format!("{}/jobs", self.base_url);
        let response = self.client.post(&url).json(&manifest).send().await?;

        self.handle_response(response).await
    }

    /// Get the lifecycle snapshot of a job
    ///
    /// # Arguments
    /// * `job_id` - The job UUID
    pub async fn get_status(&self, job_id: Uuid) -> Result<StatusSnapshot> {
        let url = format!("{}/jobs/{}/status", self.base_url, job_id);
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }

    /// Get the final outcome of a completed job
    ///
    /// Fails with a 409 state conflict while the job is still in flight;
    /// use [`ClientError::is_state_conflict`](crate::ClientError::is_state_conflict)
    /// to tell "not done yet" apart from real errors.
    pub async fn get_result(&self, job_id: Uuid) -> Result<ResultSnapshot> {
        let url = format!("{}/jobs/{}/result", self.base_url, job_id);
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }

    /// Cancel a job that has not completed yet
    ///
    /// # Arguments
    /// * `job_id` - The job UUID
    pub async fn cancel_job(&self, job_id: Uuid) -> Result<()> {
        let url = format!("{}/jobs/{}/cancel", self.base_url, job_id);
        let response = self.client.post(&url).send().await?;

        self.handle_empty_response(response).await
    }

    /// List jobs, optionally restricted to one status
    pub async fn list_jobs(&self, status: Option<JobStatus>) -> Result<Vec<JobSummary>> {
        let url = match status {
            Some(status) => format!("{}/jobs?status={}", self.base_url, status),
            None => format!("{}/jobs", self.base_url),
        };
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }
}
