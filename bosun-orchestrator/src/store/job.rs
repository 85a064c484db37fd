//! Job Store
//!
//! Thread-safe CRUD and query access to the job table. The table is an
//! owned, lock-protected map shared by the API handlers, the provisioning
//! continuations, and the reconciler; mutations are atomic per job.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use bosun_core::domain::job::{EnvironmentHandle, Job, JobStatus};
use bosun_core::domain::manifest::JobManifest;

/// Partial update merged into an existing job.
///
/// Deliberately carries no id, manifest, or created_at: those fields are
/// immutable after creation.
#[derive(Debug, Clone, Default)]
pub struct JobPatch {
    pub status: Option<JobStatus>,
    pub environment: Option<EnvironmentHandle>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub last_heartbeat: Option<DateTime<Utc>>,
    pub progress: Option<String>,
    pub output: Option<String>,
    pub error: Option<String>,
    pub artifacts: Option<serde_json::Value>,
    pub exit_code: Option<i32>,
    pub duration_seconds: Option<f64>,
}

impl JobPatch {
    fn apply(self, job: &mut Job) {
        if let Some(status) = self.status {
            job.status = status;
        }
        if let Some(environment) = self.environment {
            job.environment = Some(environment);
        }
        // started_at and completed_at are set at most once
        if let Some(started_at) = self.started_at {
            job.started_at.get_or_insert(started_at);
        }
        if let Some(completed_at) = self.completed_at {
            job.completed_at.get_or_insert(completed_at);
        }
        if let Some(last_heartbeat) = self.last_heartbeat {
            job.last_heartbeat = Some(last_heartbeat);
        }
        if let Some(progress) = self.progress {
            job.progress = Some(progress);
        }
        if let Some(output) = self.output {
            job.output = Some(output);
        }
        if let Some(error) = self.error {
            job.error = Some(error);
        }
        if let Some(artifacts) = self.artifacts {
            job.artifacts = Some(artifacts);
        }
        if let Some(exit_code) = self.exit_code {
            job.exit_code = Some(exit_code);
        }
        if let Some(duration_seconds) = self.duration_seconds {
            job.duration_seconds = Some(duration_seconds);
        }
    }
}

/// In-memory job table.
pub struct JobStore {
    jobs: RwLock<HashMap<Uuid, Job>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
        }
    }

    /// Inserts a fresh pending job and returns its id.
    pub async fn create(&self, manifest: JobManifest) -> Uuid {
        let job = Job::new(manifest);
        let id = job.id;
        self.jobs.write().await.insert(id, job);
        id
    }

    /// Returns a snapshot of the job, or None if unknown.
    pub async fn get(&self, id: Uuid) -> Option<Job> {
        self.jobs.read().await.get(&id).cloned()
    }

    /// Merges a patch into the job. Returns false if the id is unknown.
    pub async fn update(&self, id: Uuid, patch: JobPatch) -> bool {
        match self.jobs.write().await.get_mut(&id) {
            Some(job) => {
                patch.apply(job);
                true
            }
            None => false,
        }
    }

    /// Runs a closure against the job under the write lock.
    ///
    /// This is the read-modify-write primitive: callers that race on the
    /// same job (completion callback vs timeout tick) re-check status
    /// inside the closure rather than trusting a pre-scan snapshot.
    pub async fn modify<T>(&self, id: Uuid, f: impl FnOnce(&mut Job) -> T) -> Option<T> {
        self.jobs.write().await.get_mut(&id).map(f)
    }

    /// Returns all jobs, optionally restricted to one status. Callers must
    /// not rely on ordering.
    pub async fn list(&self, status: Option<JobStatus>) -> Vec<Job> {
        let jobs = self.jobs.read().await;
        match status {
            Some(status) => jobs.values().filter(|j| j.status == status).cloned().collect(),
            None => jobs.values().cloned().collect(),
        }
    }

    /// Removes a job entirely. Returns false if unknown.
    pub async fn delete(&self, id: Uuid) -> bool {
        self.jobs.write().await.remove(&id).is_some()
    }

    /// Running jobs that have outlived their manifest timeout.
    pub async fn find_timed_out(&self, now: DateTime<Utc>) -> Vec<Job> {
        self.jobs
            .read()
            .await
            .values()
            .filter(|j| j.exceeded_timeout(now))
            .cloned()
            .collect()
    }

    /// Running jobs whose last liveness signal is older than the threshold.
    pub async fn find_stale(&self, threshold_seconds: i64, now: DateTime<Utc>) -> Vec<Job> {
        self.jobs
            .read()
            .await
            .values()
            .filter(|j| j.heartbeat_stale(threshold_seconds, now))
            .cloned()
            .collect()
    }
}

impl Default for JobStore {
    fn default() -> Self {
        Self::new()
    }
}
