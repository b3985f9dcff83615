//! Error taxonomy for job submission.
//!
//! [`ExecError`] is what a single step reports; [`DispatchError`] wraps it with
//! the dispatch stage that failed. Callers branch on [`ErrorKind`].

use deploy_state::StorageError;
use serde::{Deserialize, Serialize};

use crate::transport::TransportError;

/// Coarse error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnsupportedOperation,
    MissingImageName,
    UnresolvableImage,
    InvalidRepositoryUrl,
    RepositoryLookupFailure,
    CommandExecutionFailure,
    JobIdParseFailure,
    MissingJobId,
    JobIdLookupFailure,
    Configuration,
}

/// Errors produced by the individual submission steps.
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("unsupported operation {operation:?}")]
    UnsupportedOperation { operation: String },

    #[error("the image name is mandatory and must be set on the operation implementation artifact")]
    MissingImageName,

    #[error("unable to resolve container image URI from image name {image:?}")]
    UnresolvableImage { image: String },

    #[error("invalid repository URL {url:?}: {reason}")]
    InvalidRepositoryUrl { url: String, reason: String },

    #[error("repository lookup failed for {context}: {source}")]
    RepositoryLookup {
        context: String,
        #[source]
        source: StorageError,
    },

    #[error("command {command:?} failed: {source} (output: {output:?})")]
    CommandExecution {
        command: String,
        output: String,
        #[source]
        source: TransportError,
    },

    #[error("unable to parse job ID from output {output:?}")]
    JobIdParse { output: String },

    #[error("a job ID is required to build a monitoring handle")]
    MissingJobId,

    #[error("unable to retrieve job ID for job {job_name:?} after {attempts} attempt(s): {reason}")]
    JobIdLookup {
        job_name: String,
        attempts: u32,
        reason: String,
    },

    #[error("invalid configuration: {0}")]
    Configuration(String),
}

impl ExecError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExecError::UnsupportedOperation { .. } => ErrorKind::UnsupportedOperation,
            ExecError::MissingImageName => ErrorKind::MissingImageName,
            ExecError::UnresolvableImage { .. } => ErrorKind::UnresolvableImage,
            ExecError::InvalidRepositoryUrl { .. } => ErrorKind::InvalidRepositoryUrl,
            ExecError::RepositoryLookup { .. } => ErrorKind::RepositoryLookupFailure,
            ExecError::CommandExecution { .. } => ErrorKind::CommandExecutionFailure,
            ExecError::JobIdParse { .. } => ErrorKind::JobIdParseFailure,
            ExecError::MissingJobId => ErrorKind::MissingJobId,
            ExecError::JobIdLookup { .. } => ErrorKind::JobIdLookupFailure,
            ExecError::Configuration(_) => ErrorKind::Configuration,
        }
    }
}

/// Dispatch stage, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchStage {
    ValidateOperation,
    BuildContainerInfo,
    SubmitCommand,
    InterpretOutput,
    RetrieveJobId,
    BuildMonitoringHandle,
}

impl std::fmt::Display for DispatchStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            DispatchStage::ValidateOperation => "validate operation",
            DispatchStage::BuildContainerInfo => "build container information",
            DispatchStage::SubmitCommand => "run command",
            DispatchStage::InterpretOutput => "interpret command output",
            DispatchStage::RetrieveJobId => "retrieve job ID",
            DispatchStage::BuildMonitoringHandle => "build job monitoring handle",
        };
        f.write_str(label)
    }
}

/// A failed dispatch: the stage that failed and why.
#[derive(Debug, thiserror::Error)]
#[error("failed to {stage}: {source}")]
pub struct DispatchError {
    pub stage: DispatchStage,
    #[source]
    pub source: ExecError,
}

impl DispatchError {
    pub fn new(stage: DispatchStage, source: ExecError) -> Self {
        Self { stage, source }
    }

    /// Adapter for `map_err`.
    pub fn at(stage: DispatchStage) -> impl FnOnce(ExecError) -> DispatchError {
        move |source| DispatchError::new(stage, source)
    }

    pub fn kind(&self) -> ErrorKind {
        self.source.kind()
    }
}

/// Result type for submission steps.
pub type Result<T> = std::result::Result<T, ExecError>;
