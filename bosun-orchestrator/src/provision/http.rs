//! HTTP client for the external environment provisioner
//!
//! Speaks the provisioner's REST surface: create, start, destroy. One
//! instance is created at startup and shared by every job; reqwest's
//! `Client` is internally connection-pooled and safe for concurrent use,
//! so no extra serialization sits in front of it.

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use bosun_core::domain::job::EnvironmentHandle;
use bosun_core::domain::manifest::{AgentOptions, FileSpec, JobManifest, ResourceSpec};

use super::{ProvisionError, Provisioner};

/// HTTP-backed provisioning client
#[derive(Debug, Clone)]
pub struct HttpProvisioner {
    /// Base URL of the provisioner (e.g., "http://provisioner:9000")
    base_url: String,
    /// Callback base URL seeded into every environment
    callback_base_url: String,
    client: Client,
}

impl HttpProvisioner {
    pub fn new(base_url: impl Into<String>, callback_base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            callback_base_url: callback_base_url.into(),
            client: Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Verifies the provisioner is reachable. Called once at startup; the
    /// connection itself lives as long as the process.
    pub async fn connect(&self) -> Result<(), ProvisionError> {
        let url = format!("{}/health", self.base_url);
        let response = self.client.get(&url).send().await?;
        self.handle_empty_response(response).await
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ProvisionError> {
        let status = response.status();

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ProvisionError::remote(status.as_u16(), message));
        }

        response.json().await.map_err(ProvisionError::from)
    }

    async fn handle_empty_response(
        &self,
        response: reqwest::Response,
    ) -> Result<(), ProvisionError> {
        let status = response.status();

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ProvisionError::remote(status.as_u16(), message));
        }

        Ok(())
    }
}

#[async_trait]
impl Provisioner for HttpProvisioner {
    async fn create_environment(
        &self,
        job_id: Uuid,
        manifest: &JobManifest,
    ) -> Result<EnvironmentHandle, ProvisionError> {
        let url = format!("{}/environments", self.base_url);
        let req = CreateEnvironmentRequest {
            job_id,
            template: manifest.vm_template.clone(),
            task: manifest.task.clone(),
            agent_type: manifest.agent_type,
            agent: manifest.agent.clone(),
            files: manifest.files.clone(),
            env: manifest.env.clone(),
            secrets: manifest.secrets.clone(),
            resources: manifest.resources.clone(),
            callback_url: format!("{}/callback/{}", self.callback_base_url, job_id),
        };

        let response = self.client.post(&url).json(&req).send().await?;
        let created: CreateEnvironmentResponse = self.handle_response(response).await?;

        Ok(EnvironmentHandle(created.environment_id))
    }

    async fn start_environment(&self, handle: &EnvironmentHandle) -> Result<(), ProvisionError> {
        let url = format!("{}/environments/{}/start", self.base_url, handle);
        let response = self.client.post(&url).send().await?;
        self.handle_empty_response(response).await
    }

    async fn destroy_environment(&self, handle: &EnvironmentHandle) -> Result<(), ProvisionError> {
        let url = format!("{}/environments/{}/destroy", self.base_url, handle);
        let response = self.client.post(&url).send().await?;

        // An environment that already stopped or vanished is a success
        // from the caller's point of view.
        if matches!(response.status(), StatusCode::NOT_FOUND | StatusCode::GONE) {
            tracing::debug!("Environment {} already gone", handle);
            return Ok(());
        }

        self.handle_empty_response(response).await
    }
}

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Serialize)]
struct CreateEnvironmentRequest {
    job_id: Uuid,
    template: Option<String>,
    task: String,
    agent_type: bosun_core::domain::manifest::AgentKind,
    agent: AgentOptions,
    files: Vec<FileSpec>,
    env: HashMap<String, String>,
    secrets: Vec<String>,
    resources: ResourceSpec,
    callback_url: String,
}

#[derive(Debug, Deserialize)]
struct CreateEnvironmentResponse {
    environment_id: String,
}
