//! Bosun Orchestrator
//!
//! Single authoritative instance of the job lifecycle orchestrator.
//!
//! Architecture:
//! - Store: in-memory authoritative job table
//! - Services: submission/control logic, callback ingestion, reconciliation
//! - Provision: HTTP boundary to the external environment provisioner
//! - API: axum router for the control surface and callback ingestion
//!
//! Callers submit a manifest and get a job id back immediately; provisioning
//! runs in the background, in-environment task runners report back over the
//! callback endpoints, and the reconciler reclaims whatever finishes, times
//! out, or goes silent.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod api;
pub mod config;
pub mod provision;
pub mod service;
pub mod store;

use crate::config::Config;
use crate::provision::{HttpProvisioner, Provisioner};
use crate::service::{Orchestrator, Reconciler};
use crate::store::JobStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bosun_orchestrator=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Bosun Orchestrator...");

    // Load configuration
    let config = Config::from_env()?;
    config.validate()?;
    info!(
        "Loaded configuration: provisioner_url={}, callback_base={}",
        config.provisioner_url,
        config.callback_base()
    );

    // Connect to the provisioning boundary; this connection lives as long
    // as the process
    let provisioner = Arc::new(HttpProvisioner::new(
        config.provisioner_url.clone(),
        config.callback_base(),
    ));
    provisioner
        .connect()
        .await
        .context("Failed to reach the environment provisioner")?;
    info!("Connected to provisioner at {}", provisioner.base_url());

    // Authoritative state: one in-memory job table for the process lifetime
    let store = Arc::new(JobStore::new());

    let orchestrator = Arc::new(Orchestrator::new(
        Arc::clone(&store),
        Arc::clone(&provisioner) as Arc<dyn Provisioner>,
        config.manifest_defaults(),
    ));

    // Spawn the reconciliation loop
    let reconciler = Reconciler::new(
        Arc::clone(&store),
        Arc::clone(&provisioner) as Arc<dyn Provisioner>,
        config.stale_threshold,
        config.reconcile_interval,
    );
    tokio::spawn(async move {
        reconciler.run().await;
    });

    // Build router with all API endpoints
    let app = api::create_router(orchestrator);

    let addr = format!("{}:{}", config.callback_host, config.callback_port);
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .await
        .context("Failed to start server")?;

    Ok(())
}
