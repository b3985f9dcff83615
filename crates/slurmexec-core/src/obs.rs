//! Structured events for the dispatch lifecycle.
//!
//! Every dispatch runs inside a [`dispatch_span`]; the `emit_*` functions log
//! one `event = "..."` line per lifecycle step so log pipelines can key on it.

use tracing::{info, warn, Span};

use crate::domain::{DispatchError, ExecutionMode};

/// Span covering one dispatch, tagged with the deployment and node.
pub fn dispatch_span(deployment_id: &str, node_template: &str) -> Span {
    tracing::info_span!(
        "slurmexec.dispatch",
        deployment_id = %deployment_id,
        node_template = %node_template,
    )
}

pub fn emit_dispatch_started(deployment_id: &str, operation: &str, mode: ExecutionMode) {
    info!(
        event = "dispatch.started",
        deployment_id = %deployment_id,
        operation = %operation,
        mode = %mode,
    );
}

/// Emit event: the composed command was accepted by the transport.
pub fn emit_command_submitted(deployment_id: &str, mode: ExecutionMode, command: &str) {
    info!(
        event = "dispatch.command_submitted",
        deployment_id = %deployment_id,
        mode = %mode,
        command = %command,
    );
}

/// Emit event: a job ID is known and a monitoring handle was built.
pub fn emit_job_submitted(deployment_id: &str, job_id: &str, outputs: &[String]) {
    info!(
        event = "dispatch.job_submitted",
        deployment_id = %deployment_id,
        job_id = %job_id,
        outputs = ?outputs,
    );
}

/// Emit event: the request named an operation other than `runnable.run`.
pub fn emit_operation_rejected(deployment_id: &str, operation: &str) {
    info!(
        event = "dispatch.rejected",
        deployment_id = %deployment_id,
        operation = %operation,
    );
}

pub fn emit_dispatch_failed(deployment_id: &str, error: &DispatchError) {
    warn!(
        event = "dispatch.failed",
        deployment_id = %deployment_id,
        stage = %error.stage,
        kind = ?error.kind(),
        error = %error,
    );
}
