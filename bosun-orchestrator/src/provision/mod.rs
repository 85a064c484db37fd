//! Provisioning Boundary
//!
//! The interface contract to the external environment provisioner. The
//! orchestrator owns one connection to the provisioner for its whole
//! lifetime; every call here can fail with a connectivity or remote error
//! and callers decide whether that failure is terminal (create/start) or
//! retried passively (destroy).

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use bosun_core::domain::job::EnvironmentHandle;
use bosun_core::domain::manifest::JobManifest;

pub mod http;

pub use http::HttpProvisioner;

/// Errors from the provisioning boundary
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// Could not reach the provisioner at all
    #[error("provisioner request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The provisioner answered with an error status
    #[error("provisioner rejected request (status {status}): {message}")]
    Remote { status: u16, message: String },
}

impl ProvisionError {
    pub fn remote(status: u16, message: impl Into<String>) -> Self {
        Self::Remote {
            status,
            message: message.into(),
        }
    }
}

/// Environment lifecycle as an external capability.
#[async_trait]
pub trait Provisioner: Send + Sync {
    /// Requests an environment sized per the manifest's resource hints and
    /// seeded with its task, files, env vars, secret names, and the
    /// callback address the task runner must report to.
    async fn create_environment(
        &self,
        job_id: Uuid,
        manifest: &JobManifest,
    ) -> Result<EnvironmentHandle, ProvisionError>;

    /// Begins execution inside a created environment.
    async fn start_environment(&self, handle: &EnvironmentHandle) -> Result<(), ProvisionError>;

    /// Best-effort stop-then-destroy. An environment that is already gone
    /// is a non-fatal outcome and reported as Ok.
    async fn destroy_environment(&self, handle: &EnvironmentHandle) -> Result<(), ProvisionError>;
}
