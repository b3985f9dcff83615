//! Job information: scheduler options, mode, inputs and outputs.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::operation::{EnvInput, ExecutionMode, OperationRequest};
use crate::naming::short_tag;

/// Env input consumed as the in-container command instead of being exported.
pub const EXEC_COMMAND_INPUT: &str = "exec_command";

/// Scheduler options rendered into the `srun` option slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobOptions {
    pub name: Option<String>,
    pub nodes: Option<u32>,
    pub tasks: Option<u32>,
    pub cpus_per_task: Option<u32>,
    pub memory: Option<String>,
    pub max_time: Option<String>,
    pub partition: Option<String>,
    pub reservation: Option<String>,
    pub account: Option<String>,
    /// Raw flags appended verbatim, e.g. `--output=job.out`.
    pub extra: Vec<String>,
}

impl JobOptions {
    /// Render as a single space-separated option string.
    ///
    /// Returns the empty string when nothing is set.
    pub fn render(&self) -> String {
        let text = |flag: &str, value: &Option<String>| {
            value
                .as_deref()
                .filter(|v| !v.is_empty())
                .map(|v| format!("--{flag}={v}"))
        };
        let number = |flag: &str, value: Option<u32>| value.map(|v| format!("--{flag}={v}"));

        [
            text("job-name", &self.name),
            number("nodes", self.nodes),
            number("ntasks", self.tasks),
            number("cpus-per-task", self.cpus_per_task),
            text("mem", &self.memory),
            text("time", &self.max_time),
            text("partition", &self.partition),
            text("reservation", &self.reservation),
            text("account", &self.account),
        ]
        .into_iter()
        .flatten()
        .chain(self.extra.iter().filter(|o| !o.is_empty()).cloned())
        .collect::<Vec<_>>()
        .join(" ")
    }
}

/// Per-dispatch job state. Created fresh for each dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobInfo {
    pub mode: ExecutionMode,
    /// Scheduler job ID, known only after submission (or lookup).
    pub id: Option<String>,
    pub name: String,
    pub monitoring_interval: Duration,
    pub inputs: Vec<EnvInput>,
    pub outputs: Vec<String>,
    pub exec_args: Vec<String>,
    pub options: JobOptions,
    pub remote_base_dir: String,
}

impl JobInfo {
    /// Build job information from a request.
    ///
    /// The job name defaults to `<deployment>-<node template>`. Interactive
    /// jobs always carry a `--job-name` so their ID can be looked up later;
    /// the default one gets a random tag so a rerun never matches a job
    /// still queued from an earlier dispatch.
    pub fn build(req: &OperationRequest, default_interval: Duration) -> Self {
        let mut options = req.job.options.clone();
        let explicit = options.name.clone().filter(|n| !n.is_empty());
        let name = match (explicit, req.job.mode) {
            (Some(name), _) => name,
            (None, ExecutionMode::Batch) => {
                format!("{}-{}", req.deployment_id, req.node_template)
            }
            (None, ExecutionMode::Interactive) => {
                let name = format!("{}-{}-{}", req.deployment_id, req.node_template, short_tag());
                options.name = Some(name.clone());
                name
            }
        };

        let inputs = req
            .env_inputs
            .iter()
            .filter(|input| input.name != EXEC_COMMAND_INPUT)
            .cloned()
            .collect();

        JobInfo {
            mode: req.job.mode,
            id: None,
            name,
            monitoring_interval: req.job.monitoring_interval().unwrap_or(default_interval),
            inputs,
            outputs: Vec::new(),
            exec_args: req.exec_args.clone(),
            options,
            remote_base_dir: req.remote_base_dir.clone(),
        }
    }
}
