//! Orchestrator configuration
//!
//! Defines all configurable parameters for the orchestrator including the
//! callback listener address, provisioner endpoint, manifest defaults, and
//! reconciliation tuning.

use std::time::Duration;

use bosun_core::domain::manifest::ManifestDefaults;

/// Floor for the stale-heartbeat threshold. Anything lower would expire
/// jobs between two ordinary heartbeats.
const MIN_STALE_THRESHOLD_SECONDS: u64 = 30;

/// Floor for the reconciliation interval.
const MIN_RECONCILE_INTERVAL_SECONDS: u64 = 10;

/// Orchestrator configuration
///
/// All timeouts and intervals are configurable to allow tuning for
/// different deployment scenarios (dev vs prod, fast vs slow provisioners).
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the callback/control listener binds to
    pub callback_host: String,

    /// Port the callback/control listener binds to
    pub callback_port: u16,

    /// Externally reachable base URL handed to environments so their task
    /// runner can reach the callback endpoint. Derived from host/port when
    /// not set explicitly.
    pub callback_base_url: Option<String>,

    /// Base URL of the external environment provisioner (required)
    pub provisioner_url: String,

    /// Template used when a manifest does not name one
    pub default_template: String,

    /// Timeout applied when a manifest does not carry one
    pub default_timeout: Duration,

    /// Cpu count applied when a manifest does not carry one
    pub default_cpu: u32,

    /// Memory size applied when a manifest does not carry one
    pub default_memory: String,

    /// Disk size applied when a manifest does not carry one
    pub default_disk: String,

    /// How long a running job may go without a liveness signal before the
    /// reconciler expires it
    pub stale_threshold: Duration,

    /// How often the reconciliation loop runs
    pub reconcile_interval: Duration,
}

impl Config {
    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - BOSUN_PROVISIONER_URL (required)
    /// - BOSUN_CALLBACK_HOST (optional, default: 0.0.0.0)
    /// - BOSUN_CALLBACK_PORT (optional, default: 8765)
    /// - BOSUN_CALLBACK_BASE_URL (optional, default: http://host:port)
    /// - BOSUN_DEFAULT_TEMPLATE (optional, default: agent-template)
    /// - BOSUN_DEFAULT_TIMEOUT (optional, seconds, default: 3600)
    /// - BOSUN_DEFAULT_CPU (optional, default: 2)
    /// - BOSUN_DEFAULT_MEMORY (optional, default: 2G)
    /// - BOSUN_DEFAULT_DISK (optional, default: 10G)
    /// - BOSUN_STALE_THRESHOLD (optional, seconds, default: 120, min: 30)
    /// - BOSUN_RECONCILE_INTERVAL (optional, seconds, default: 30, min: 10)
    pub fn from_env() -> anyhow::Result<Self> {
        let provisioner_url = std::env::var("BOSUN_PROVISIONER_URL")
            .map_err(|_| anyhow::anyhow!("BOSUN_PROVISIONER_URL environment variable not set"))?;

        let callback_host =
            std::env::var("BOSUN_CALLBACK_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let callback_port = std::env::var("BOSUN_CALLBACK_PORT")
            .ok()
            .and_then(|s| s.parse::<u16>().ok())
            .unwrap_or(8765);

        let callback_base_url = std::env::var("BOSUN_CALLBACK_BASE_URL").ok();

        let default_template =
            std::env::var("BOSUN_DEFAULT_TEMPLATE").unwrap_or_else(|_| "agent-template".to_string());

        let default_timeout = std::env::var("BOSUN_DEFAULT_TIMEOUT")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(3600));

        let default_cpu = std::env::var("BOSUN_DEFAULT_CPU")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(2);

        let default_memory =
            std::env::var("BOSUN_DEFAULT_MEMORY").unwrap_or_else(|_| "2G".to_string());

        let default_disk = std::env::var("BOSUN_DEFAULT_DISK").unwrap_or_else(|_| "10G".to_string());

        let stale_threshold = std::env::var("BOSUN_STALE_THRESHOLD")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(120));

        let reconcile_interval = std::env::var("BOSUN_RECONCILE_INTERVAL")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(30));

        Ok(Self {
            callback_host,
            callback_port,
            callback_base_url,
            provisioner_url,
            default_template,
            default_timeout,
            default_cpu,
            default_memory,
            default_disk,
            stale_threshold,
            reconcile_interval,
        })
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.provisioner_url.is_empty() {
            anyhow::bail!("provisioner_url cannot be empty");
        }

        if !self.provisioner_url.starts_with("http://")
            && !self.provisioner_url.starts_with("https://")
        {
            anyhow::bail!("provisioner_url must start with http:// or https://");
        }

        if self.callback_host.is_empty() {
            anyhow::bail!("callback_host cannot be empty");
        }

        if self.stale_threshold.as_secs() < MIN_STALE_THRESHOLD_SECONDS {
            anyhow::bail!(
                "stale_threshold must be at least {} seconds",
                MIN_STALE_THRESHOLD_SECONDS
            );
        }

        if self.reconcile_interval.as_secs() < MIN_RECONCILE_INTERVAL_SECONDS {
            anyhow::bail!(
                "reconcile_interval must be at least {} seconds",
                MIN_RECONCILE_INTERVAL_SECONDS
            );
        }

        Ok(())
    }

    /// Defaults merged into submitted manifests.
    pub fn manifest_defaults(&self) -> ManifestDefaults {
        ManifestDefaults {
            vm_template: self.default_template.clone(),
            timeout_seconds: self.default_timeout.as_secs(),
            cpu: self.default_cpu,
            memory: self.default_memory.clone(),
            disk: self.default_disk.clone(),
        }
    }

    /// The callback base URL environments are given.
    pub fn callback_base(&self) -> String {
        self.callback_base_url.clone().unwrap_or_else(|| {
            format!("http://{}:{}", self.callback_host, self.callback_port)
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            callback_host: "0.0.0.0".to_string(),
            callback_port: 8765,
            callback_base_url: None,
            provisioner_url: "http://localhost:9000".to_string(),
            default_template: "agent-template".to_string(),
            default_timeout: Duration::from_secs(3600),
            default_cpu: 2,
            default_memory: "2G".to_string(),
            default_disk: "10G".to_string(),
            stale_threshold: Duration::from_secs(120),
            reconcile_interval: Duration::from_secs(30),
        }
    }
}
