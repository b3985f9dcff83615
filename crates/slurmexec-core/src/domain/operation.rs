//! Operation requests as handed over by the workflow engine.

use std::time::Duration;

use deploy_state::OperationKey;
use serde::{Deserialize, Serialize};

use super::job::JobOptions;

/// The only lifecycle operation this driver executes.
pub const RUNNABLE_RUN_OPERATION: &str = "tosca.interfaces.node.lifecycle.runnable.run";

/// Returns `true` when `operation` names the runnable `run` operation,
/// ignoring ASCII case.
pub fn is_runnable_run(operation: &str) -> bool {
    operation.eq_ignore_ascii_case(RUNNABLE_RUN_OPERATION)
}

/// How the job reaches the scheduler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// `sbatch --wrap`: the scheduler acknowledges with a job ID.
    #[default]
    Batch,
    /// `srun ... &`: runs now, output goes to a redirect file, no synchronous ID.
    Interactive,
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionMode::Batch => write!(f, "batch"),
            ExecutionMode::Interactive => write!(f, "interactive"),
        }
    }
}

/// A named environment input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvInput {
    pub name: String,
    pub value: String,
}

impl EnvInput {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Job-level settings computed by the generic job builder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSettings {
    #[serde(default)]
    pub mode: ExecutionMode,
    #[serde(default)]
    pub options: JobOptions,
    /// Poll interval override, in seconds.
    #[serde(default)]
    pub monitoring_interval_secs: Option<u64>,
}

impl JobSettings {
    pub fn monitoring_interval(&self) -> Option<Duration> {
        self.monitoring_interval_secs.map(Duration::from_secs)
    }
}

/// One "run this workload" request. Immutable for the duration of a dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationRequest {
    /// Lifecycle operation name.
    pub operation: String,
    pub deployment_id: String,
    pub node_type: String,
    pub node_template: String,
    /// Image name carried by the implementation artifact.
    pub primary: String,
    #[serde(default)]
    pub env_inputs: Vec<EnvInput>,
    #[serde(default)]
    pub exec_args: Vec<String>,
    /// Remote directory the job is submitted from.
    pub remote_base_dir: String,
    #[serde(default)]
    pub job: JobSettings,
}

impl OperationRequest {
    /// Key used for repository lookups on the implementation artifact.
    pub fn operation_key(&self) -> OperationKey {
        OperationKey::new(
            self.deployment_id.clone(),
            self.node_template.clone(),
            self.node_type.clone(),
            self.operation.clone(),
        )
    }
}
