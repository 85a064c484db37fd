//! Job manifest domain model
//!
//! The manifest is the immutable description of requested work: task text,
//! agent selection, seed files, resources, and lifecycle policy. It is
//! validated once at submission and never mutated afterward.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Allowed cpu range for an environment.
pub const MIN_CPU: u32 = 1;
pub const MAX_CPU: u32 = 32;

/// Allowed timeout range in seconds (1 second to 24 hours).
pub const MIN_TIMEOUT_SECONDS: u64 = 1;
pub const MAX_TIMEOUT_SECONDS: u64 = 86_400;

/// Memory/disk sizes are digits followed by a G, M, or K suffix.
static SIZE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+[GMK]$").expect("size pattern is valid"));

/// Description of the work a job should perform.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobManifest {
    /// What the agent should do. Required, non-empty.
    pub task: String,

    /// Which kind of agent executes the task.
    pub agent_type: AgentKind,

    /// Agent-specific options, dispatched only by the in-environment runner.
    #[serde(default)]
    pub agent: AgentOptions,

    /// Files seeded into the environment before the task starts.
    #[serde(default)]
    pub files: Vec<FileSpec>,

    /// Environment variables for the task runner.
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Names of secrets the environment should receive. Values never
    /// travel in the manifest.
    #[serde(default)]
    pub secrets: Vec<String>,

    /// Resource sizing hints for the environment.
    #[serde(default)]
    pub resources: ResourceSpec,

    /// Maximum run time in seconds before the reconciler expires the job.
    #[serde(rename = "timeout")]
    pub timeout_seconds: Option<u64>,

    /// Whether the environment outlives the job.
    #[serde(default)]
    pub lifecycle: Lifecycle,

    /// Template the environment is provisioned from.
    pub vm_template: Option<String>,

    /// How chatty the task runner should be with progress reports.
    #[serde(default)]
    pub status_mode: StatusMode,
}

impl JobManifest {
    /// Creates a minimal manifest for a task, everything else defaulted.
    pub fn for_task(task: impl Into<String>, agent_type: AgentKind) -> Self {
        Self {
            task: task.into(),
            agent_type,
            agent: AgentOptions::default(),
            files: Vec::new(),
            env: HashMap::new(),
            secrets: Vec::new(),
            resources: ResourceSpec::default(),
            timeout_seconds: None,
            lifecycle: Lifecycle::default(),
            vm_template: None,
            status_mode: StatusMode::default(),
        }
    }

    /// Fills unset fields from orchestrator-level defaults.
    pub fn apply_defaults(&mut self, defaults: &ManifestDefaults) {
        if self.vm_template.is_none() {
            self.vm_template = Some(defaults.vm_template.clone());
        }
        if self.timeout_seconds.is_none() {
            self.timeout_seconds = Some(defaults.timeout_seconds);
        }
        if self.resources.cpu.is_none() {
            self.resources.cpu = Some(defaults.cpu);
        }
        if self.resources.memory.is_none() {
            self.resources.memory = Some(defaults.memory.clone());
        }
        if self.resources.disk.is_none() {
            self.resources.disk = Some(defaults.disk.clone());
        }
    }

    /// Validates the manifest against the submission contract.
    pub fn validate(&self) -> Result<(), ManifestError> {
        if self.task.trim().is_empty() {
            return Err(ManifestError::EmptyTask);
        }

        for file in &self.files {
            if file.path.trim().is_empty() {
                return Err(ManifestError::EmptyFilePath);
            }
        }

        if let Some(cpu) = self.resources.cpu {
            if !(MIN_CPU..=MAX_CPU).contains(&cpu) {
                return Err(ManifestError::CpuOutOfRange(cpu));
            }
        }

        if let Some(memory) = &self.resources.memory {
            if !SIZE_PATTERN.is_match(memory) {
                return Err(ManifestError::InvalidSize(memory.clone()));
            }
        }

        if let Some(disk) = &self.resources.disk {
            if !SIZE_PATTERN.is_match(disk) {
                return Err(ManifestError::InvalidSize(disk.clone()));
            }
        }

        if let Some(timeout) = self.timeout_seconds {
            if !(MIN_TIMEOUT_SECONDS..=MAX_TIMEOUT_SECONDS).contains(&timeout) {
                return Err(ManifestError::TimeoutOutOfRange(timeout));
            }
        }

        Ok(())
    }
}

/// Kind of agent the task runner dispatches. The orchestrator never
/// branches on this beyond passing it through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    Claude,
    Script,
    Custom,
}

/// Options for the selected agent kind.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentOptions {
    /// Command line for `script`/`custom` agents.
    pub command: Option<String>,
    /// Model selection for `claude` agents.
    pub claude_model: Option<String>,
}

/// A file seeded into the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileSpec {
    /// Destination path inside the environment.
    pub path: String,
    /// File content; base64 for binary payloads.
    pub content: String,
    #[serde(default)]
    pub encoding: FileEncoding,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileEncoding {
    #[default]
    Utf8,
    Base64,
}

/// Resource sizing hints for the provisioned environment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceSpec {
    pub cpu: Option<u32>,
    pub memory: Option<String>,
    pub disk: Option<String>,
}

/// Whether the environment is reclaimed once the job is terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifecycle {
    #[default]
    Ephemeral,
    Persistent,
}

/// Verbosity of status reporting requested from the task runner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusMode {
    #[default]
    Simple,
    Detailed,
    Streaming,
}

/// Orchestrator-level defaults applied to manifests at submission.
#[derive(Debug, Clone)]
pub struct ManifestDefaults {
    pub vm_template: String,
    pub timeout_seconds: u64,
    pub cpu: u32,
    pub memory: String,
    pub disk: String,
}

/// Manifest validation failures
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("task cannot be empty")]
    EmptyTask,

    #[error("file destination path cannot be empty")]
    EmptyFilePath,

    #[error("cpu must be between {MIN_CPU} and {MAX_CPU}, got {0}")]
    CpuOutOfRange(u32),

    #[error("invalid size '{0}': expected digits followed by G, M, or K")]
    InvalidSize(String),

    #[error(
        "timeout must be between {MIN_TIMEOUT_SECONDS} and {MAX_TIMEOUT_SECONDS} seconds, got {0}"
    )]
    TimeoutOutOfRange(u64),
}
