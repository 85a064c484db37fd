//! Reconciliation loop
//!
//! Periodically scans the job store for jobs that exceeded their timeout,
//! went silent, or finished while still holding an environment, and drives
//! cleanup through the provisioning boundary. One tick runs at a time;
//! a slow tick delays the next rather than overlapping it.

use std::sync::Arc;

use chrono::Utc;
use tokio::time::{self, Duration};
use uuid::Uuid;

use bosun_core::domain::job::{EnvironmentHandle, JobStatus};
use bosun_core::domain::manifest::Lifecycle;

use crate::provision::Provisioner;
use crate::store::JobStore;

/// Periodic reconciler over the job store.
pub struct Reconciler {
    store: Arc<JobStore>,
    provisioner: Arc<dyn Provisioner>,
    stale_threshold: Duration,
    interval: Duration,
}

impl Reconciler {
    pub fn new(
        store: Arc<JobStore>,
        provisioner: Arc<dyn Provisioner>,
        stale_threshold: Duration,
        interval: Duration,
    ) -> Self {
        Self {
            store,
            provisioner,
            stale_threshold,
            interval,
        }
    }

    /// Runs the reconciliation loop until the process exits.
    ///
    /// Ticks are sequential on this one task, so a tick that outlives the
    /// interval simply delays the next one instead of overlapping it.
    pub async fn run(&self) {
        tracing::info!("Starting reconciler (interval: {:?})", self.interval);

        let mut interval = time::interval(self.interval);
        interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            self.tick().await;
        }
    }

    /// One reconciliation pass: expire timed-out jobs, expire silent jobs,
    /// then reclaim environments left behind by terminal jobs.
    ///
    /// Every failure in here is local to one job and logged; the pass
    /// always visits the full job set.
    pub async fn tick(&self) {
        let now = Utc::now();

        for job in self.store.find_timed_out(now).await {
            self.expire(job.id, "exceeded timeout").await;
        }

        for job in self
            .store
            .find_stale(self.stale_threshold.as_secs() as i64, now)
            .await
        {
            self.expire(job.id, "stale heartbeat: no liveness signal from environment")
                .await;
        }

        self.reclaim_environments().await;
    }

    /// Transitions a job to timeout and reclaims its environment.
    ///
    /// The status is re-checked inside the write lock: a completion
    /// callback that raced the pre-scan snapshot wins, and the job is
    /// left alone.
    async fn expire(&self, id: Uuid, reason: &str) {
        let now = Utc::now();

        let expired = self
            .store
            .modify(id, |job| {
                if job.status != JobStatus::Running {
                    return None;
                }
                job.status = JobStatus::Timeout;
                job.error = Some(reason.to_string());
                job.completed_at.get_or_insert(now);
                Some(job.environment.clone())
            })
            .await
            .flatten();

        match expired {
            Some(handle) => {
                tracing::warn!("Job {} expired: {}", id, reason);
                if let Some(handle) = handle {
                    if self.destroy(id, &handle).await {
                        self.store.modify(id, |job| job.environment = None).await;
                    }
                }
            }
            None => {
                // The job completed between the scan and the lock; the
                // callback's terminal status wins.
                tracing::debug!("Skipping expiry for job {}", id);
            }
        }
    }

    /// Destroys environments still held by terminal jobs whose lifecycle
    /// is not persistent. Failed destroys keep the handle and are retried
    /// on the next tick.
    async fn reclaim_environments(&self) {
        let leftovers: Vec<(Uuid, EnvironmentHandle)> = self
            .store
            .list(None)
            .await
            .into_iter()
            .filter(|j| j.status.is_terminal() && j.manifest.lifecycle != Lifecycle::Persistent)
            .filter_map(|j| j.environment.map(|h| (j.id, h)))
            .collect();

        for (id, handle) in leftovers {
            if self.destroy(id, &handle).await {
                self.store.modify(id, |job| job.environment = None).await;
            }
        }
    }

    /// Best-effort destroy. Returns whether the environment is gone.
    async fn destroy(&self, id: Uuid, handle: &EnvironmentHandle) -> bool {
        match self.provisioner.destroy_environment(handle).await {
            Ok(()) => {
                tracing::info!("Destroyed environment {} of job {}", handle, id);
                true
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to destroy environment {} of job {}: {} (will retry next tick)",
                    handle,
                    id,
                    e
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provision::testing::MockProvisioner;
    use bosun_core::domain::manifest::{AgentKind, JobManifest};
    use chrono::Duration as ChronoDuration;
    use std::sync::atomic::Ordering;

    fn reconciler() -> (Reconciler, Arc<JobStore>, Arc<MockProvisioner>) {
        let store = Arc::new(JobStore::new());
        let provisioner = Arc::new(MockProvisioner::new());
        let reconciler = Reconciler::new(
            Arc::clone(&store),
            Arc::clone(&provisioner) as Arc<dyn Provisioner>,
            Duration::from_secs(120),
            Duration::from_secs(30),
        );
        (reconciler, store, provisioner)
    }

    async fn running_job(store: &JobStore, timeout: Option<u64>) -> Uuid {
        let mut manifest = JobManifest::for_task("work", AgentKind::Script);
        manifest.timeout_seconds = timeout;
        let id = store.create(manifest).await;
        store
            .modify(id, |j| {
                j.status = JobStatus::Running;
                j.started_at = Some(Utc::now());
                j.last_heartbeat = Some(Utc::now());
                j.environment = Some(EnvironmentHandle(format!("env-{}", id)));
            })
            .await;
        id
    }

    #[tokio::test]
    async fn test_tick_expires_timed_out_job() {
        let (reconciler, store, provisioner) = reconciler();

        let id = running_job(&store, Some(60)).await;
        store
            .modify(id, |j| {
                j.started_at = Some(Utc::now() - ChronoDuration::seconds(61));
            })
            .await;

        reconciler.tick().await;

        let job = store.get(id).await.unwrap();
        assert_eq!(job.status, JobStatus::Timeout);
        assert_eq!(job.error.as_deref(), Some("exceeded timeout"));
        assert!(job.completed_at.is_some());
        assert!(job.environment.is_none());
        assert_eq!(provisioner.destroy_count(), 1);
    }

    #[tokio::test]
    async fn test_tick_leaves_fresh_jobs_alone() {
        let (reconciler, store, provisioner) = reconciler();
        let id = running_job(&store, Some(3600)).await;

        reconciler.tick().await;

        let job = store.get(id).await.unwrap();
        assert_eq!(job.status, JobStatus::Running);
        assert!(job.environment.is_some());
        assert_eq!(provisioner.destroy_count(), 0);
    }

    #[tokio::test]
    async fn test_tick_expires_stale_job() {
        let (reconciler, store, _) = reconciler();

        // No manifest timeout: only the staleness check can catch this one
        let id = running_job(&store, None).await;
        store
            .modify(id, |j| {
                j.last_heartbeat = Some(Utc::now() - ChronoDuration::seconds(121));
            })
            .await;

        reconciler.tick().await;

        let job = store.get(id).await.unwrap();
        assert_eq!(job.status, JobStatus::Timeout);
        assert!(job.error.as_deref().unwrap().contains("stale heartbeat"));
    }

    #[tokio::test]
    async fn test_destroy_failure_keeps_handle_for_retry() {
        let (reconciler, store, provisioner) = reconciler();

        let id = running_job(&store, Some(60)).await;
        store
            .modify(id, |j| {
                j.started_at = Some(Utc::now() - ChronoDuration::seconds(61));
            })
            .await;

        provisioner.destroy_failures.store(1, Ordering::SeqCst);
        reconciler.tick().await;

        // The job expired but its environment survived the failed destroy
        let job = store.get(id).await.unwrap();
        assert_eq!(job.status, JobStatus::Timeout);
        assert!(job.environment.is_some());

        // The next tick's cleanup pass retries and succeeds
        reconciler.tick().await;
        let job = store.get(id).await.unwrap();
        assert!(job.environment.is_none());
    }

    #[tokio::test]
    async fn test_cleanup_reclaims_terminal_leftovers() {
        let (reconciler, store, provisioner) = reconciler();

        let id = running_job(&store, None).await;
        store
            .modify(id, |j| {
                j.status = JobStatus::Failed;
                j.completed_at = Some(Utc::now());
            })
            .await;

        reconciler.tick().await;

        let job = store.get(id).await.unwrap();
        assert!(job.environment.is_none());
        assert_eq!(provisioner.destroy_count(), 1);
    }

    #[tokio::test]
    async fn test_cleanup_respects_persistent_lifecycle() {
        let (reconciler, store, provisioner) = reconciler();

        let id = running_job(&store, None).await;
        store
            .modify(id, |j| {
                j.manifest.lifecycle = Lifecycle::Persistent;
                j.status = JobStatus::Success;
                j.completed_at = Some(Utc::now());
            })
            .await;

        reconciler.tick().await;

        let job = store.get(id).await.unwrap();
        assert!(job.environment.is_some());
        assert_eq!(provisioner.destroy_count(), 0);
    }

    #[tokio::test]
    async fn test_expire_skips_job_completed_after_scan() {
        let (reconciler, store, _) = reconciler();

        let id = running_job(&store, Some(60)).await;
        store
            .modify(id, |j| {
                j.started_at = Some(Utc::now() - ChronoDuration::seconds(61));
                // Completion callback lands before the expiry takes the lock
                j.status = JobStatus::Success;
                j.completed_at = Some(Utc::now());
            })
            .await;

        reconciler.expire(id, "exceeded timeout").await;

        let job = store.get(id).await.unwrap();
        assert_eq!(job.status, JobStatus::Success);
        assert!(job.error.is_none());
    }

    #[tokio::test]
    async fn test_one_destroy_failure_does_not_stop_the_pass() {
        let (reconciler, store, provisioner) = reconciler();

        let a = running_job(&store, None).await;
        let b = running_job(&store, None).await;
        for id in [a, b] {
            store
                .modify(id, |j| {
                    j.status = JobStatus::Failed;
                    j.completed_at = Some(Utc::now());
                })
                .await;
        }

        provisioner.destroy_failures.store(1, Ordering::SeqCst);
        reconciler.tick().await;

        // Both destroys were attempted; exactly one environment survived
        assert_eq!(provisioner.destroy_count(), 2);
        let survivors: Vec<_> = store
            .list(None)
            .await
            .into_iter()
            .filter(|j| j.environment.is_some())
            .collect();
        assert_eq!(survivors.len(), 1);
    }
}
