//! Slurmexec Core Library
//!
//! Submits containerized workloads to SLURM through Singularity: resolves the
//! image against deployment repositories, composes the batch or interactive
//! command, runs it over a [`RemoteTransport`] and returns a
//! [`MonitoringHandle`] for the external job poller.

pub mod command;
pub mod config;
pub mod dispatch;
pub mod domain;
pub mod image;
pub mod job_id;
pub mod metrics;
pub mod monitoring;
pub mod naming;
pub mod obs;
pub mod output;
pub mod telemetry;
pub mod transport;

pub use command::{CommandComposer, ComposedCommand, DEFAULT_REDIRECT_PREFIX};
pub use config::ExecConfig;
pub use dispatch::{validate_operation, Dispatcher, PreparedDispatch};
pub use domain::{
    ContainerInfo, ContainerSpec, DispatchError, DispatchStage, EnvInput, ErrorKind, ExecError,
    ExecutionMode, JobInfo, JobOptions, JobSettings, OperationRequest, Result, RuntimeCommand,
    RUNNABLE_RUN_OPERATION,
};
pub use image::{classify, resolve, resolve_image, ImageClass, RepositoryReference};
pub use job_id::{JobIdLookup, SqueueJobIdLookup};
pub use metrics::{Metrics, METRICS};
pub use monitoring::MonitoringHandle;
pub use output::{interpret, parse_job_id, Interpretation};
pub use telemetry::init_tracing;
pub use transport::{RemoteTransport, ShellTransport, TransportError};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
