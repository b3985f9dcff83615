//! Job ID retrieval for interactive submissions.
//!
//! `srun ... &` returns before SLURM has assigned anything we can read back,
//! so the ID is looked up afterwards by job name. This step owns its own
//! retry policy; submissions themselves are never retried.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::ExecConfig;
use crate::domain::{ExecError, JobInfo, OperationRequest, Result};
use crate::transport::RemoteTransport;

/// Post-submission lookup of an interactive job's ID.
#[async_trait]
pub trait JobIdLookup: Send + Sync {
    async fn retrieve_job_id(&self, request: &OperationRequest, job: &JobInfo) -> Result<String>;
}

/// `squeue` query listing the IDs of jobs named `job_name`.
pub fn squeue_command(job_name: &str) -> String {
    format!("squeue --noheader --name={job_name} -o %A")
}

/// Looks the job up with `squeue`, retrying while it is not listed yet.
pub struct SqueueJobIdLookup {
    transport: Arc<dyn RemoteTransport>,
    attempts: u32,
    delay: Duration,
}

impl SqueueJobIdLookup {
    pub fn new(transport: Arc<dyn RemoteTransport>) -> Self {
        Self::from_config(transport, &ExecConfig::default())
    }

    pub fn from_config(transport: Arc<dyn RemoteTransport>, config: &ExecConfig) -> Self {
        Self {
            transport,
            attempts: config.job_id_lookup_attempts.max(1),
            delay: config.job_id_lookup_delay,
        }
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts.max(1);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl JobIdLookup for SqueueJobIdLookup {
    async fn retrieve_job_id(&self, request: &OperationRequest, job: &JobInfo) -> Result<String> {
        let cmd = squeue_command(&job.name);
        let mut reason = String::from("job not listed by squeue");

        for attempt in 1..=self.attempts {
            match self.transport.run_command(&cmd).await {
                Ok(output) => {
                    if let Some(id) = output.lines().map(str::trim).find(|l| !l.is_empty()) {
                        debug!(
                            deployment_id = %request.deployment_id,
                            job_name = %job.name,
                            job_id = %id,
                            attempt,
                            "Retrieved interactive job ID"
                        );
                        return Ok(id.to_string());
                    }
                    reason = String::from("job not listed by squeue");
                }
                Err(e) => {
                    warn!(job_name = %job.name, attempt, error = %e, "squeue failed");
                    reason = format!("{e}: {}", e.output.trim());
                }
            }

            if attempt < self.attempts {
                tokio::time::sleep(self.delay).await;
            }
        }

        Err(ExecError::JobIdLookup {
            job_name: job.name.clone(),
            attempts: self.attempts,
            reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TransportError;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned responses and records commands.
    struct ScriptedTransport {
        responses: Mutex<VecDeque<std::result::Result<String, TransportError>>>,
        commands: Mutex<Vec<String>>,
    }

    impl ScriptedTransport {
        fn new(responses: Vec<std::result::Result<String, TransportError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                commands: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl RemoteTransport for ScriptedTransport {
        async fn run_command(&self, command: &str) -> std::result::Result<String, TransportError> {
            self.commands.lock().unwrap().push(command.to_string());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(String::new()))
        }
    }

    fn request_and_job() -> (OperationRequest, JobInfo) {
        let request: OperationRequest = serde_json::from_value(serde_json::json!({
            "operation": crate::domain::RUNNABLE_RUN_OPERATION,
            "deployment_id": "dep",
            "node_type": "hpc.nodes.SingularityJob",
            "node_template": "Job",
            "primary": "docker://ubuntu",
            "remote_base_dir": "/work",
            "job": { "mode": "interactive" }
        }))
        .unwrap();
        let job = JobInfo::build(&request, Duration::from_secs(5));
        (request, job)
    }

    #[tokio::test]
    async fn test_squeue_command_uses_job_name() {
        assert_eq!(
            squeue_command("dep-Job"),
            "squeue --noheader --name=dep-Job -o %A"
        );
    }

    #[tokio::test]
    async fn test_retries_until_listed() {
        let transport = ScriptedTransport::new(vec![
            Ok(String::new()),
            Err(TransportError::new("exit status 1", "slurm_load_jobs error")),
            Ok("  9001\n".to_string()),
        ]);
        let lookup = SqueueJobIdLookup::new(transport.clone())
            .with_attempts(5)
            .with_delay(Duration::ZERO);

        let (request, job) = request_and_job();
        let id = lookup.retrieve_job_id(&request, &job).await.unwrap();

        assert_eq!(id, "9001");
        let expected = squeue_command(&job.name);
        let commands = transport.commands.lock().unwrap();
        assert_eq!(commands.len(), 3);
        assert!(commands.iter().all(|c| *c == expected));
    }

    #[tokio::test]
    async fn test_gives_up_after_attempts() {
        let transport = ScriptedTransport::new(vec![]);
        let lookup = SqueueJobIdLookup::new(transport.clone())
            .with_attempts(2)
            .with_delay(Duration::ZERO);

        let (request, job) = request_and_job();
        let err = lookup.retrieve_job_id(&request, &job).await.unwrap_err();

        match err {
            ExecError::JobIdLookup {
                job_name, attempts, ..
            } => {
                assert_eq!(job_name, job.name);
                assert_eq!(attempts, 2);
            }
            other => panic!("expected JobIdLookup, got {other:?}"),
        }
        assert_eq!(transport.commands.lock().unwrap().len(), 2);
    }
}
