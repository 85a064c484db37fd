//! Job Service
//!
//! Drives the job lifecycle: accepts submissions, runs the asynchronous
//! provisioning continuation, and answers the query/control operations.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use bosun_core::domain::job::{EnvironmentHandle, JobStatus};
use bosun_core::domain::manifest::{JobManifest, ManifestDefaults, ManifestError};
use bosun_core::dto::job::{JobSummary, ResultSnapshot, StatusSnapshot};

use crate::provision::Provisioner;
use crate::store::JobStore;

/// Service error type
#[derive(Debug)]
pub enum JobError {
    NotFound(Uuid),
    /// The job exists but has not reached a terminal status yet.
    NotComplete(Uuid),
    /// The operation is invalid for the job's current (terminal) state.
    AlreadyCompleted(Uuid),
    Validation(ManifestError),
}

impl From<ManifestError> for JobError {
    fn from(err: ManifestError) -> Self {
        JobError::Validation(err)
    }
}

/// The lifecycle orchestrator.
///
/// Owns the store and the provisioning boundary; shared behind an Arc by
/// the API handlers, the provisioning continuations it spawns, and main.
pub struct Orchestrator {
    store: Arc<JobStore>,
    provisioner: Arc<dyn Provisioner>,
    defaults: ManifestDefaults,
}

impl Orchestrator {
    pub fn new(
        store: Arc<JobStore>,
        provisioner: Arc<dyn Provisioner>,
        defaults: ManifestDefaults,
    ) -> Self {
        Self {
            store,
            provisioner,
            defaults,
        }
    }

    pub fn store(&self) -> &JobStore {
        &self.store
    }

    /// Validates and accepts a submission. The caller gets the job id
    /// back immediately; provisioning runs in a spawned task whose failure
    /// path funnels into a store update, never an unobserved error.
    pub async fn submit(self: &Arc<Self>, manifest: JobManifest) -> Result<Uuid, JobError> {
        let id = self.accept(manifest).await?;

        let this = Arc::clone(self);
        tokio::spawn(async move {
            this.provision(id).await;
        });

        Ok(id)
    }

    /// Creates the pending job without starting provisioning.
    pub(crate) async fn accept(&self, mut manifest: JobManifest) -> Result<Uuid, JobError> {
        manifest.apply_defaults(&self.defaults);
        manifest.validate()?;

        let id = self.store.create(manifest).await;
        tracing::info!("Job {} accepted", id);

        Ok(id)
    }

    /// The provisioning continuation for one job: pending -> provisioning
    /// -> running, or failed at the first boundary error.
    pub(crate) async fn provision(&self, id: Uuid) {
        let Some(job) = self.store.get(id).await else {
            return;
        };
        let manifest = job.manifest;

        let entered = self
            .store
            .modify(id, |j| {
                if j.status.can_transition(JobStatus::Provisioning) {
                    j.status = JobStatus::Provisioning;
                    true
                } else {
                    false
                }
            })
            .await
            .unwrap_or(false);
        if !entered {
            // Cancelled before provisioning began
            return;
        }

        tracing::info!("Provisioning environment for job {}", id);

        let handle = match self.provisioner.create_environment(id, &manifest).await {
            Ok(handle) => handle,
            Err(e) => {
                self.fail_provisioning(id, None, format!("failed to create environment: {}", e))
                    .await;
                return;
            }
        };

        self.store
            .modify(id, |j| j.environment = Some(handle.clone()))
            .await;

        if let Err(e) = self.provisioner.start_environment(&handle).await {
            self.fail_provisioning(
                id,
                Some(&handle),
                format!("failed to start environment: {}", e),
            )
            .await;
            return;
        }

        let now = Utc::now();
        let running = self
            .store
            .modify(id, |j| {
                if j.status.can_transition(JobStatus::Running) {
                    j.status = JobStatus::Running;
                    j.started_at.get_or_insert(now);
                    // Seed liveness so a runner that never reports still
                    // trips the staleness check
                    j.last_heartbeat = Some(now);
                    true
                } else {
                    false
                }
            })
            .await
            .unwrap_or(false);

        if running {
            tracing::info!("Job {} running in environment {}", id, handle);
        } else {
            // Cancelled while provisioning; the cancel path or the cleanup
            // pass reclaims the environment
            tracing::debug!("Job {} no longer provisionable, leaving environment for cleanup", id);
        }
    }

    /// Records a provisioning failure: best-effort destroy of whatever was
    /// created, then a terminal failed status with the boundary error.
    async fn fail_provisioning(&self, id: Uuid, handle: Option<&EnvironmentHandle>, error: String) {
        tracing::warn!("Provisioning failed for job {}: {}", id, error);

        let mut destroyed = false;
        if let Some(handle) = handle {
            match self.provisioner.destroy_environment(handle).await {
                Ok(()) => destroyed = true,
                Err(e) => {
                    tracing::warn!(
                        "Failed to destroy environment {} for job {}: {} (will retry)",
                        handle,
                        id,
                        e
                    );
                }
            }
        }

        let now = Utc::now();
        self.store
            .modify(id, |j| {
                if !j.status.is_terminal() {
                    j.status = JobStatus::Failed;
                    j.error = Some(error);
                    j.completed_at.get_or_insert(now);
                }
                if destroyed {
                    j.environment = None;
                }
            })
            .await;
    }

    /// Returns the lifecycle snapshot for a job.
    pub async fn get_status(&self, id: Uuid) -> Result<StatusSnapshot, JobError> {
        let job = self.store.get(id).await.ok_or(JobError::NotFound(id))?;
        Ok(StatusSnapshot::of(&job))
    }

    /// Returns the final outcome. Valid only once the job is terminal;
    /// a running job yields NotComplete, which is not a failure of the
    /// job itself.
    pub async fn get_result(&self, id: Uuid) -> Result<ResultSnapshot, JobError> {
        let job = self.store.get(id).await.ok_or(JobError::NotFound(id))?;

        if !job.status.is_terminal() {
            return Err(JobError::NotComplete(id));
        }

        Ok(ResultSnapshot::of(&job))
    }

    /// Cancels a non-terminal job: best-effort destroy of its environment,
    /// then a forced failed status. Destroy failure never blocks the
    /// cancellation from taking effect.
    pub async fn cancel(&self, id: Uuid) -> Result<(), JobError> {
        let job = self.store.get(id).await.ok_or(JobError::NotFound(id))?;

        if job.status.is_terminal() {
            return Err(JobError::AlreadyCompleted(id));
        }

        let mut destroyed = false;
        if let Some(handle) = &job.environment {
            match self.provisioner.destroy_environment(handle).await {
                Ok(()) => destroyed = true,
                Err(e) => {
                    tracing::warn!(
                        "Failed to destroy environment {} for cancelled job {}: {} (will retry)",
                        handle,
                        id,
                        e
                    );
                }
            }
        }

        let now = Utc::now();
        let cancelled = self
            .store
            .modify(id, |j| {
                // A completion callback may have raced us here
                if j.status.is_terminal() {
                    return false;
                }
                j.status = JobStatus::Failed;
                j.error = Some("cancelled by user".to_string());
                j.completed_at.get_or_insert(now);
                if destroyed {
                    j.environment = None;
                }
                true
            })
            .await
            .unwrap_or(false);

        if !cancelled {
            return Err(JobError::AlreadyCompleted(id));
        }

        tracing::info!("Job {} cancelled", id);
        Ok(())
    }

    /// Lists jobs as thin summaries, optionally filtered by status.
    pub async fn list(&self, status: Option<JobStatus>) -> Vec<JobSummary> {
        self.store
            .list(status)
            .await
            .iter()
            .map(JobSummary::of)
            .collect()
    }
}
