//! Execution dispatcher.
//!
//! One [`Dispatcher::dispatch`] call runs the stages in a fixed order and stops
//! at the first failure:
//!
//! 1. validate the operation name (no side effects on mismatch)
//! 2. build job and container information, resolving the image
//! 3. compose the command and run it, exactly once
//! 4. interpret the scheduler output
//! 5. retrieve the job ID (interactive only)
//! 6. build the monitoring handle
//!
//! Errors carry the [`DispatchStage`] they came from.

use std::sync::Arc;
use std::time::Duration;

use deploy_state::RepositoryLookup;
use tracing::{debug, Instrument};

use crate::command::{CommandComposer, ComposedCommand};
use crate::config::ExecConfig;
use crate::domain::{
    is_runnable_run, ContainerInfo, ContainerSpec, DispatchError, DispatchStage, ExecError,
    ExecutionMode, JobInfo, OperationRequest,
};
use crate::image::resolve_image;
use crate::job_id::JobIdLookup;
use crate::metrics::{Metrics, METRICS};
use crate::monitoring::MonitoringHandle;
use crate::obs;
use crate::output::{interpret, Interpretation};
use crate::transport::RemoteTransport;

/// Everything known about a dispatch before anything runs remotely.
#[derive(Debug, Clone)]
pub struct PreparedDispatch {
    pub job: JobInfo,
    pub container: ContainerInfo,
    pub command: ComposedCommand,
}

pub struct Dispatcher {
    repositories: Arc<dyn RepositoryLookup>,
    transport: Arc<dyn RemoteTransport>,
    job_id_lookup: Option<Arc<dyn JobIdLookup>>,
    composer: CommandComposer,
    config: ExecConfig,
    metrics: &'static Metrics,
}

/// Only `runnable.run` is dispatched; anything else is rejected untouched.
pub fn validate_operation(req: &OperationRequest) -> Result<(), DispatchError> {
    if is_runnable_run(&req.operation) {
        return Ok(());
    }
    Err(DispatchError::new(
        DispatchStage::ValidateOperation,
        ExecError::UnsupportedOperation {
            operation: req.operation.clone(),
        },
    ))
}

impl Dispatcher {
    pub fn new(
        repositories: Arc<dyn RepositoryLookup>,
        transport: Arc<dyn RemoteTransport>,
        config: ExecConfig,
    ) -> Self {
        Self {
            repositories,
            transport,
            job_id_lookup: None,
            composer: CommandComposer::new(config.redirect_prefix.clone()),
            config,
            metrics: &METRICS,
        }
    }

    /// Count into `metrics` instead of the process-wide [`METRICS`].
    pub fn with_metrics(mut self, metrics: &'static Metrics) -> Self {
        self.metrics = metrics;
        self
    }

    /// Enable job ID retrieval for interactive submissions.
    pub fn with_job_id_lookup(mut self, lookup: Arc<dyn JobIdLookup>) -> Self {
        self.job_id_lookup = Some(lookup);
        self
    }

    pub fn config(&self) -> &ExecConfig {
        &self.config
    }

    /// Validate the request and compose its command without running it.
    pub async fn prepare(&self, req: &OperationRequest) -> Result<PreparedDispatch, DispatchError> {
        validate_operation(req)?;

        let job = JobInfo::build(req, self.config.monitoring_interval);
        let unresolved = ContainerSpec::from_request(req)
            .map_err(DispatchError::at(DispatchStage::BuildContainerInfo))?;
        let image_uri = resolve_image(
            &unresolved.image_name,
            self.repositories.as_ref(),
            &req.operation_key(),
        )
        .await
        .map_err(DispatchError::at(DispatchStage::BuildContainerInfo))?;
        let container = unresolved.resolved(image_uri);

        let command = self
            .composer
            .compose(job.mode, &container, &job, &job.options.render());

        Ok(PreparedDispatch {
            job,
            container,
            command,
        })
    }

    /// Submit the workload and hand back the monitoring handle and its poll
    /// interval.
    pub async fn dispatch(
        &self,
        req: &OperationRequest,
    ) -> Result<(MonitoringHandle, Duration), DispatchError> {
        let span = obs::dispatch_span(&req.deployment_id, &req.node_template);
        async {
            if let Err(err) = validate_operation(req) {
                self.metrics.record_rejected();
                obs::emit_operation_rejected(&req.deployment_id, &req.operation);
                return Err(err);
            }
            self.metrics.record_started();
            obs::emit_dispatch_started(&req.deployment_id, &req.operation, req.job.mode);

            match self.run_stages(req).await {
                Ok(handle) => {
                    self.metrics.record_submitted(req.job.mode);
                    let interval = handle.poll_interval;
                    Ok((handle, interval))
                }
                Err(err) => {
                    self.metrics.record_failure(&err);
                    obs::emit_dispatch_failed(&req.deployment_id, &err);
                    Err(err)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run_stages(&self, req: &OperationRequest) -> Result<MonitoringHandle, DispatchError> {
        let PreparedDispatch {
            mut job, command, ..
        } = self.prepare(req).await?;

        let raw_output = self.transport.run_command(&command.command).await.map_err(|source| {
            DispatchError::new(
                DispatchStage::SubmitCommand,
                ExecError::CommandExecution {
                    command: command.command.clone(),
                    output: source.output.clone(),
                    source,
                },
            )
        })?;
        obs::emit_command_submitted(&req.deployment_id, command.mode, &command.command);

        let Interpretation { job_id, outputs } = interpret(&command, &raw_output, &job.options)
            .map_err(DispatchError::at(DispatchStage::InterpretOutput))?;
        job.outputs = outputs;
        job.id = job_id;

        if job.mode == ExecutionMode::Interactive {
            job.id = Some(self.retrieve_job_id(req, &job).await?);
        }

        let job_id = job.id.clone().unwrap_or_default();
        let handle = MonitoringHandle::build(&req.deployment_id, job_id, job.monitoring_interval)
            .map_err(DispatchError::at(DispatchStage::BuildMonitoringHandle))?;

        obs::emit_job_submitted(&req.deployment_id, &handle.job_id, &job.outputs);
        Ok(handle)
    }

    async fn retrieve_job_id(
        &self,
        req: &OperationRequest,
        job: &JobInfo,
    ) -> Result<String, DispatchError> {
        match &self.job_id_lookup {
            Some(lookup) => lookup
                .retrieve_job_id(req, job)
                .await
                .map_err(DispatchError::at(DispatchStage::RetrieveJobId)),
            None => {
                debug!(job_name = %job.name, "No job ID lookup configured");
                Err(DispatchError::new(
                    DispatchStage::BuildMonitoringHandle,
                    ExecError::MissingJobId,
                ))
            }
        }
    }
}
