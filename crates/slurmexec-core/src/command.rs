//! Shell command composition for batch and interactive submissions.
//!
//! Commands are built verbatim from their templates; values are not escaped.
//!
//! Batch:
//! `mkdir -p {dir};cd {dir};sbatch --wrap="{exports}srun {opts} singularity {subcmd} {image} {exec}"`
//!
//! Interactive:
//! `{exports}srun {opts} singularity {subcmd} {args} {image} {exec} > {redirect} &`

use tracing::debug;

use crate::domain::{ContainerInfo, EnvInput, ExecutionMode, JobInfo};
use crate::naming::unique_timestamped_name;

/// Default prefix for interactive redirect files.
pub const DEFAULT_REDIRECT_PREFIX: &str = "slurmexec_";

/// A command ready to hand to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedCommand {
    pub mode: ExecutionMode,
    pub command: String,
    /// Output capture file, interactive mode only.
    pub redirect_file: Option<String>,
}

/// `export NAME=VALUE;` for every input, in input order.
pub fn render_exports(inputs: &[EnvInput]) -> String {
    inputs
        .iter()
        .map(|input| {
            debug!("Add env var with key:{:?} and value:{:?}", input.name, input.value);
            format!("export {}={};", input.name, input.value)
        })
        .collect()
}

/// Builds submission commands. Pure: nothing is executed here.
#[derive(Debug, Clone)]
pub struct CommandComposer {
    redirect_prefix: String,
}

impl Default for CommandComposer {
    fn default() -> Self {
        Self::new(DEFAULT_REDIRECT_PREFIX)
    }
}

impl CommandComposer {
    pub fn new(redirect_prefix: impl Into<String>) -> Self {
        Self {
            redirect_prefix: redirect_prefix.into(),
        }
    }

    pub fn compose(
        &self,
        mode: ExecutionMode,
        container: &ContainerInfo,
        job: &JobInfo,
        opts: &str,
    ) -> ComposedCommand {
        match mode {
            ExecutionMode::Batch => ComposedCommand {
                mode,
                command: batch_command(container, job, opts),
                redirect_file: None,
            },
            ExecutionMode::Interactive => {
                let redirect_file = unique_timestamped_name(&self.redirect_prefix, ".out");
                ComposedCommand {
                    mode,
                    command: interactive_command(container, job, opts, &redirect_file),
                    redirect_file: Some(redirect_file),
                }
            }
        }
    }
}

/// Batch submission. Exec args are not part of the wrapped command.
pub fn batch_command(container: &ContainerInfo, job: &JobInfo, opts: &str) -> String {
    let exports = render_exports(&job.inputs);
    let inner = format!(
        "{exports}srun {opts} singularity {} {} {}",
        container.command, container.image_uri, container.exec
    );
    let dir = &job.remote_base_dir;
    format!("mkdir -p {dir};cd {dir};sbatch --wrap=\"{inner}\"")
}

/// Interactive run, detached in the remote shell.
pub fn interactive_command(
    container: &ContainerInfo,
    job: &JobInfo,
    opts: &str,
    redirect_file: &str,
) -> String {
    let exports = render_exports(&job.inputs);
    let cmd = format!(
        "{exports}srun {opts} singularity {} {} {} {} > {redirect_file} &",
        container.command,
        job.exec_args.join(" "),
        container.image_uri,
        container.exec
    );
    cmd.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{JobOptions, RuntimeCommand};
    use std::time::Duration;

    fn container(image_uri: &str) -> ContainerInfo {
        ContainerInfo {
            command: RuntimeCommand::Run,
            exec: String::new(),
            image_name: image_uri.to_string(),
            image_uri: image_uri.to_string(),
        }
    }

    fn job(mode: ExecutionMode, inputs: Vec<EnvInput>, exec_args: Vec<String>) -> JobInfo {
        JobInfo {
            mode,
            id: None,
            name: "job".to_string(),
            monitoring_interval: Duration::from_secs(5),
            inputs,
            outputs: Vec::new(),
            exec_args,
            options: JobOptions::default(),
            remote_base_dir: "/work".to_string(),
        }
    }

    #[test]
    fn test_batch_command_is_byte_exact() {
        let cmd = CommandComposer::default().compose(
            ExecutionMode::Batch,
            &container("docker://h/img"),
            &job(ExecutionMode::Batch, vec![], vec![]),
            "",
        );
        assert_eq!(
            cmd.command,
            "mkdir -p /work;cd /work;sbatch --wrap=\"srun  singularity run docker://h/img \""
        );
        assert!(cmd.redirect_file.is_none());
    }

    #[test]
    fn test_batch_command_with_exports_and_exec() {
        let mut info = container("/scratch/tool.simg");
        info.command = RuntimeCommand::Exec;
        info.exec = "python3 run.py".to_string();
        let j = job(
            ExecutionMode::Batch,
            vec![EnvInput::new("A", "1"), EnvInput::new("B", "two")],
            vec!["--nv".to_string()],
        );

        let cmd = batch_command(&info, &j, "--nodes=1");
        assert_eq!(
            cmd,
            "mkdir -p /work;cd /work;sbatch --wrap=\"export A=1;export B=two;srun --nodes=1 singularity exec /scratch/tool.simg python3 run.py\""
        );
        assert!(!cmd.contains("--nv"));
    }

    #[test]
    fn test_interactive_command_redirects_and_detaches() {
        let composed = CommandComposer::new("out_").compose(
            ExecutionMode::Interactive,
            &container("docker://h/img"),
            &job(
                ExecutionMode::Interactive,
                vec![EnvInput::new("A", "1")],
                vec!["--nv".to_string(), "-B /data".to_string()],
            ),
            "--job-name=job",
        );

        let redirect = composed.redirect_file.clone().unwrap();
        assert!(redirect.starts_with("out_"));
        assert_eq!(
            composed.command,
            format!(
                "export A=1;srun --job-name=job singularity run --nv -B /data docker://h/img  > {redirect} &"
            )
        );
        assert!(composed.command.ends_with(&format!("> {redirect} &")));
    }

    #[test]
    fn test_interactive_redirect_files_are_unique() {
        let composer = CommandComposer::default();
        let info = container("docker://h/img");
        let j = job(ExecutionMode::Interactive, vec![], vec![]);

        let first = composer.compose(ExecutionMode::Interactive, &info, &j, "");
        let second = composer.compose(ExecutionMode::Interactive, &info, &j, "");
        assert_ne!(first.redirect_file, second.redirect_file);
    }

    #[test]
    fn test_render_exports_empty() {
        assert_eq!(render_exports(&[]), "");
    }
}
