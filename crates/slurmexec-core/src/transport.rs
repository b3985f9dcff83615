//! Remote command transport.
//!
//! The dispatcher only needs `run_command`. Session management, auth and
//! retries belong to the implementation. [`ShellTransport`] covers the two
//! common cases: running on the login node itself (`sh -c`) or over `ssh`.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

/// A failed remote command, with whatever it printed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
    /// Combined stdout/stderr, kept for diagnosis.
    pub output: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            output: output.into(),
        }
    }
}

/// Runs a shell command on the cluster and returns its standard output.
#[async_trait]
pub trait RemoteTransport: Send + Sync {
    async fn run_command(&self, command: &str) -> Result<String, TransportError>;
}

/// Runs commands through a local program: `sh -c` or `ssh <destination>`.
#[derive(Debug, Clone)]
pub struct ShellTransport {
    program: String,
    args: Vec<String>,
    timeout: Option<Duration>,
}

impl ShellTransport {
    /// Run commands with the local `sh`.
    pub fn local() -> Self {
        Self {
            program: "sh".to_string(),
            args: vec!["-c".to_string()],
            timeout: None,
        }
    }

    /// Run commands on `destination` (e.g. `user@login-node`) over `ssh`.
    pub fn ssh(destination: impl Into<String>) -> Self {
        Self {
            program: "ssh".to_string(),
            args: vec![
                "-o".to_string(),
                "BatchMode=yes".to_string(),
                destination.into(),
            ],
            timeout: None,
        }
    }

    /// Bound each command's wall-clock time.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[async_trait]
impl RemoteTransport for ShellTransport {
    async fn run_command(&self, command: &str) -> Result<String, TransportError> {
        debug!(program = %self.program, command = %command, "Running command");

        let child = Command::new(&self.program)
            .args(&self.args)
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| TransportError::new(format!("failed to spawn {}: {e}", self.program), ""))?;

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| {
                    TransportError::new(
                        format!("command timed out after {}ms", limit.as_millis()),
                        "",
                    )
                })?,
            None => child.wait_with_output().await,
        }
        .map_err(|e| TransportError::new(format!("failed to wait for {}: {e}", self.program), ""))?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if output.status.success() {
            Ok(stdout)
        } else {
            let code = output
                .status
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            Err(TransportError::new(
                format!("command exited with status {code}"),
                format!("{stdout}{stderr}"),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_local_shell_returns_stdout() {
        let out = ShellTransport::local()
            .run_command("echo 'Submitted batch job 42'")
            .await
            .unwrap();
        assert_eq!(out.trim(), "Submitted batch job 42");
    }

    #[tokio::test]
    async fn test_local_shell_failure_keeps_output() {
        let err = ShellTransport::local()
            .run_command("echo 'sbatch: error: bad partition' >&2; exit 3")
            .await
            .unwrap_err();
        assert!(err.message.contains('3'));
        assert!(err.output.contains("bad partition"));
    }

    #[tokio::test]
    async fn test_local_shell_timeout() {
        let err = ShellTransport::local()
            .with_timeout(Duration::from_millis(100))
            .run_command("sleep 5")
            .await
            .unwrap_err();
        assert!(err.message.contains("timed out"));
    }
}
