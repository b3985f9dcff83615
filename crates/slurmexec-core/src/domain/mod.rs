//! Domain models for slurmexec.
//!
//! - `OperationRequest`: what the workflow engine asks for
//! - `ContainerSpec` / `ContainerInfo`: Singularity settings, before and after image resolution
//! - `JobInfo`: per-dispatch job state
//! - `ExecError` / `DispatchError`: failure taxonomy

pub mod container;
pub mod error;
pub mod job;
pub mod operation;

pub use container::{ContainerInfo, ContainerSpec, RuntimeCommand};
pub use error::{DispatchError, DispatchStage, ErrorKind, ExecError, Result};
pub use job::{JobInfo, JobOptions, EXEC_COMMAND_INPUT};
pub use operation::{
    is_runnable_run, EnvInput, ExecutionMode, JobSettings, OperationRequest,
    RUNNABLE_RUN_OPERATION,
};
