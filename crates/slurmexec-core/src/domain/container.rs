//! Container runtime information.
//!
//! [`ContainerSpec`] is what the request says; [`ContainerInfo`] is the same
//! thing once the image URI is resolved. Only the latter can be composed into
//! a command.

use serde::{Deserialize, Serialize};

use super::error::{ExecError, Result};
use super::job::EXEC_COMMAND_INPUT;
use super::operation::OperationRequest;

/// Verb passed to `singularity`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeCommand {
    /// Default entrypoint.
    #[default]
    Run,
    /// Explicit in-container command.
    Exec,
}

impl RuntimeCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuntimeCommand::Run => "run",
            RuntimeCommand::Exec => "exec",
        }
    }
}

impl std::fmt::Display for RuntimeCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Container settings before image resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    pub command: RuntimeCommand,
    /// In-container command; empty unless `command` is `Exec`.
    pub exec: String,
    pub image_name: String,
}

impl ContainerSpec {
    /// Extract container settings from a request.
    ///
    /// A non-empty `exec_command` input switches to `singularity exec`.
    pub fn from_request(req: &OperationRequest) -> Result<Self> {
        if req.primary.is_empty() {
            return Err(ExecError::MissingImageName);
        }

        let exec = req
            .env_inputs
            .iter()
            .rev()
            .find(|input| input.name == EXEC_COMMAND_INPUT && !input.value.is_empty())
            .map(|input| input.value.clone());

        Ok(match exec {
            Some(exec) => ContainerSpec {
                command: RuntimeCommand::Exec,
                exec,
                image_name: req.primary.clone(),
            },
            None => ContainerSpec {
                command: RuntimeCommand::Run,
                exec: String::new(),
                image_name: req.primary.clone(),
            },
        })
    }

    /// Attach a resolved image URI.
    pub fn resolved(self, image_uri: impl Into<String>) -> ContainerInfo {
        ContainerInfo {
            command: self.command,
            exec: self.exec,
            image_name: self.image_name,
            image_uri: image_uri.into(),
        }
    }
}

/// Container settings with a resolved image URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerInfo {
    pub command: RuntimeCommand,
    pub exec: String,
    pub image_name: String,
    pub image_uri: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::operation::{EnvInput, JobSettings, RUNNABLE_RUN_OPERATION};

    fn request(primary: &str, inputs: Vec<EnvInput>) -> OperationRequest {
        OperationRequest {
            operation: RUNNABLE_RUN_OPERATION.to_string(),
            deployment_id: "dep".to_string(),
            node_type: "hpc.nodes.SingularityJob".to_string(),
            node_template: "Job".to_string(),
            primary: primary.to_string(),
            env_inputs: inputs,
            exec_args: Vec::new(),
            remote_base_dir: "/work".to_string(),
            job: JobSettings::default(),
        }
    }

    #[test]
    fn test_empty_image_name_is_rejected() {
        let err = ContainerSpec::from_request(&request("", vec![])).unwrap_err();
        assert!(matches!(err, ExecError::MissingImageName));
    }

    #[test]
    fn test_default_command_is_run() {
        let spec = ContainerSpec::from_request(&request("img.simg", vec![])).unwrap();
        assert_eq!(spec.command, RuntimeCommand::Run);
        assert!(spec.exec.is_empty());
    }

    #[test]
    fn test_exec_command_input_selects_exec() {
        let spec = ContainerSpec::from_request(&request(
            "img.simg",
            vec![EnvInput::new(EXEC_COMMAND_INPUT, "python3 train.py")],
        ))
        .unwrap();
        assert_eq!(spec.command, RuntimeCommand::Exec);
        assert_eq!(spec.exec, "python3 train.py");
    }

    #[test]
    fn test_empty_exec_command_keeps_run() {
        let spec = ContainerSpec::from_request(&request(
            "img.simg",
            vec![EnvInput::new(EXEC_COMMAND_INPUT, "")],
        ))
        .unwrap();
        assert_eq!(spec.command, RuntimeCommand::Run);
    }

    #[test]
    fn test_resolved_keeps_fields() {
        let info = ContainerSpec::from_request(&request("docker://ubuntu", vec![]))
            .unwrap()
            .resolved("docker://registry.example.com/ubuntu");
        assert_eq!(info.image_name, "docker://ubuntu");
        assert_eq!(info.image_uri, "docker://registry.example.com/ubuntu");
        assert_eq!(info.command.to_string(), "run");
    }
}
