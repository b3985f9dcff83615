//! slurmexec - run containerized workloads on SLURM
//!
//! ## Commands
//!
//! - `resolve-image`: resolve an image name against a repository URL
//! - `compose`: print the command a request would submit, without running it
//! - `dispatch`: submit a request and print the monitoring handle

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use deploy_state::StaticRepositoryStore;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Level};

use slurmexec_core::metrics::METRICS;
use slurmexec_core::{
    resolve, Dispatcher, ExecConfig, OperationRequest, RemoteTransport, RepositoryReference,
    ShellTransport, SqueueJobIdLookup,
};

#[derive(Parser)]
#[command(name = "slurmexec")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Submit Singularity workloads to SLURM", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a container image name to the URI singularity will pull
    ResolveImage {
        /// Image name, e.g. docker://library/ubuntu:22.04
        image: String,

        /// Repository URL to substitute for the image's registry
        #[arg(long)]
        repository_url: Option<String>,
    },

    /// Print the command a request would submit, without running it
    Compose {
        /// Path to the operation request (JSON)
        #[arg(short, long)]
        request: PathBuf,

        /// Path to the repository declarations (JSON)
        #[arg(long)]
        repositories: Option<PathBuf>,
    },

    /// Submit a request and print its monitoring handle
    Dispatch {
        /// Path to the operation request (JSON)
        #[arg(short, long)]
        request: PathBuf,

        /// Path to the repository declarations (JSON)
        #[arg(long)]
        repositories: Option<PathBuf>,

        /// Run commands on this host over ssh instead of locally
        #[arg(long, env = "SLURMEXEC_SSH")]
        ssh: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    slurmexec_core::init_tracing(cli.json, level);

    match cli.command {
        Commands::ResolveImage {
            image,
            repository_url,
        } => cmd_resolve_image(&image, repository_url.as_deref()),
        Commands::Compose {
            request,
            repositories,
        } => cmd_compose(&request, repositories.as_deref()).await,
        Commands::Dispatch {
            request,
            repositories,
            ssh,
        } => cmd_dispatch(&request, repositories.as_deref(), ssh.as_deref()).await,
    }
}

fn cmd_resolve_image(image: &str, repository_url: Option<&str>) -> Result<()> {
    let reference = match repository_url {
        Some(url) => RepositoryReference::new("cli", url),
        None => RepositoryReference::none(),
    };
    let uri = resolve(image, &reference)
        .with_context(|| format!("Failed to resolve image {image:?}"))?;
    println!("{uri}");
    Ok(())
}

async fn cmd_compose(request: &Path, repositories: Option<&Path>) -> Result<()> {
    let req = load_request(request)?;
    let config = ExecConfig::from_env().context("Invalid slurmexec configuration")?;
    let dispatcher = Dispatcher::new(
        load_repositories(repositories)?,
        Arc::new(ShellTransport::local()),
        config,
    );

    let prepared = dispatcher
        .prepare(&req)
        .await
        .context("Failed to compose command")?;

    let out = json!({
        "mode": prepared.command.mode,
        "image_uri": prepared.container.image_uri,
        "command": prepared.command.command,
        "redirect_file": prepared.command.redirect_file,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

async fn cmd_dispatch(request: &Path, repositories: Option<&Path>, ssh: Option<&str>) -> Result<()> {
    let req = load_request(request)?;
    let config = ExecConfig::from_env().context("Invalid slurmexec configuration")?;
    let transport = build_transport(ssh, &config);

    let lookup = SqueueJobIdLookup::from_config(transport.clone(), &config);
    let dispatcher = Dispatcher::new(load_repositories(repositories)?, transport, config)
        .with_job_id_lookup(Arc::new(lookup));

    let result = dispatcher.dispatch(&req).await;
    METRICS.flush();
    let (handle, interval) = result.context("Dispatch failed")?;

    info!(job_id = %handle.job_id, "Job submitted");
    let out = json!({
        "deployment_id": handle.deployment_id,
        "job_id": handle.job_id,
        "poll_interval_secs": interval.as_secs(),
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn build_transport(ssh: Option<&str>, config: &ExecConfig) -> Arc<dyn RemoteTransport> {
    let transport = match ssh {
        Some(dest) => ShellTransport::ssh(dest),
        None => ShellTransport::local(),
    };
    match config.transport_timeout {
        Some(limit) => Arc::new(transport.with_timeout(limit)),
        None => Arc::new(transport),
    }
}

fn load_request(path: &Path) -> Result<OperationRequest> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read request {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid request {}", path.display()))
}

fn load_repositories(path: Option<&Path>) -> Result<Arc<StaticRepositoryStore>> {
    let store = match path {
        Some(p) => StaticRepositoryStore::from_json_file(p)
            .with_context(|| format!("Failed to load repositories from {}", p.display()))?,
        None => StaticRepositoryStore::new(),
    };
    Ok(Arc::new(store))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_request(dir: &Path, primary: &str) -> PathBuf {
        let path = dir.join("request.json");
        std::fs::write(
            &path,
            json!({
                "operation": slurmexec_core::RUNNABLE_RUN_OPERATION,
                "deployment_id": "dep",
                "node_type": "hpc.nodes.SingularityJob",
                "node_template": "Job",
                "primary": primary,
                "remote_base_dir": "/work"
            })
            .to_string(),
        )
        .unwrap();
        path
    }

    #[test]
    fn test_parse_dispatch_args() {
        let cli = Cli::try_parse_from([
            "slurmexec",
            "--json",
            "dispatch",
            "--request",
            "req.json",
            "--ssh",
            "user@login",
        ])
        .unwrap();

        assert!(cli.json);
        match cli.command {
            Commands::Dispatch { request, ssh, .. } => {
                assert_eq!(request, PathBuf::from("req.json"));
                assert_eq!(ssh.as_deref(), Some("user@login"));
            }
            _ => panic!("expected dispatch"),
        }
    }

    #[test]
    fn test_resolve_image_requires_image() {
        assert!(Cli::try_parse_from(["slurmexec", "resolve-image"]).is_err());
    }

    #[test]
    fn test_cmd_resolve_image() {
        cmd_resolve_image("docker://ubuntu", Some("https://registry.example.org")).unwrap();
        assert!(cmd_resolve_image("", None).is_err());
    }

    #[test]
    fn test_load_request() {
        let dir = tempfile::tempdir().unwrap();
        let req = load_request(&write_request(dir.path(), "docker://ubuntu")).unwrap();
        assert_eq!(req.deployment_id, "dep");
        assert!(load_request(&dir.path().join("missing.json")).is_err());
    }

    #[tokio::test]
    async fn test_cmd_compose_does_not_need_a_cluster() {
        let dir = tempfile::tempdir().unwrap();
        let req = write_request(dir.path(), "docker://ubuntu");
        cmd_compose(&req, None).await.unwrap();
    }

    #[tokio::test]
    async fn test_cmd_compose_rejects_empty_image() {
        let dir = tempfile::tempdir().unwrap();
        let req = write_request(dir.path(), "");
        let err = cmd_compose(&req, None).await.unwrap_err();
        assert!(format!("{err:#}").contains("image name is mandatory"));
    }
}
