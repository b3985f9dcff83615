//! Container image URI resolution.
//!
//! Image names are classified by an ordered predicate chain:
//!
//! 1. `docker://` prefix
//! 2. `shub://` prefix
//! 3. `.simg` / `.img` suffix (a file on the cluster)
//!
//! Prefixed images may be rewritten to point at the registry declared on the
//! operation's implementation artifact. File images are used as-is.

use deploy_state::{is_public_default, OperationKey, RepositoryLookup};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::domain::{ExecError, Result};

pub const DOCKER_PREFIX: &str = "docker://";
pub const SHUB_PREFIX: &str = "shub://";

/// Image reference grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageClass {
    Docker,
    SingularityHub,
    File,
    Unknown,
}

impl ImageClass {
    /// URI prefix for registry classes.
    pub fn prefix(&self) -> Option<&'static str> {
        match self {
            ImageClass::Docker => Some(DOCKER_PREFIX),
            ImageClass::SingularityHub => Some(SHUB_PREFIX),
            ImageClass::File | ImageClass::Unknown => None,
        }
    }
}

/// Classify an image name. Prefixes win over suffixes.
pub fn classify(image_name: &str) -> ImageClass {
    if image_name.starts_with(DOCKER_PREFIX) {
        ImageClass::Docker
    } else if image_name.starts_with(SHUB_PREFIX) {
        ImageClass::SingularityHub
    } else if image_name.ends_with(".simg") || image_name.ends_with(".img") {
        ImageClass::File
    } else {
        ImageClass::Unknown
    }
}

/// Repository declared for an implementation artifact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryReference {
    pub name: Option<String>,
    pub url: Option<String>,
}

impl RepositoryReference {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            url: Some(url.into()),
        }
    }
}

/// Resolve an image name against an already-fetched repository reference.
///
/// The repository URL must be absolute with a host (`https://host[:port]/...`).
/// A bare `registry.example.org` is rejected with `InvalidRepositoryUrl`
/// rather than silently leaving the image unrewritten, as a lenient URL parser
/// would.
pub fn resolve(image_name: &str, reference: &RepositoryReference) -> Result<String> {
    if image_name.is_empty() {
        return Err(ExecError::MissingImageName);
    }

    let prefix = match classify(image_name) {
        ImageClass::File => return Ok(image_name.to_string()),
        ImageClass::Unknown => {
            return Err(ExecError::UnresolvableImage {
                image: image_name.to_string(),
            })
        }
        class => class.prefix().unwrap_or_default(),
    };

    if reference.name.as_deref().map_or(true, str::is_empty) {
        return Ok(image_name.to_string());
    }

    let repo_url = match reference.url.as_deref().map(str::trim) {
        Some(url) if !url.is_empty() && !is_public_default(url) => url,
        _ => return Ok(image_name.to_string()),
    };

    let host = registry_host(repo_url)?;
    let path = image_name[prefix.len()..].trim_start_matches('/');
    let image_uri = format!("{prefix}{host}/{path}");
    debug!(image_uri = %image_uri, "Resolved image against repository {:?}", reference.name);
    Ok(image_uri)
}

/// Look up the artifact's repository, then [`resolve`].
///
/// File images never touch the store.
pub async fn resolve_image(
    image_name: &str,
    lookup: &dyn RepositoryLookup,
    key: &OperationKey,
) -> Result<String> {
    if image_name.is_empty() {
        return Err(ExecError::MissingImageName);
    }
    if classify(image_name).prefix().is_none() {
        return resolve(image_name, &RepositoryReference::none());
    }

    let name = lookup
        .operation_repository(key)
        .await
        .map_err(|source| ExecError::RepositoryLookup {
            context: key.to_string(),
            source,
        })?;

    let reference = match name.filter(|n| !n.is_empty()) {
        None => RepositoryReference::none(),
        Some(name) => {
            let url = lookup
                .repository_url(&key.deployment_id, &name)
                .await
                .map_err(|source| ExecError::RepositoryLookup {
                    context: format!("repository {name:?} of deployment {}", key.deployment_id),
                    source,
                })?;
            RepositoryReference {
                name: Some(name),
                url,
            }
        }
    };

    resolve(image_name, &reference)
}

/// `host[:port]` of a repository URL.
fn registry_host(repo_url: &str) -> Result<String> {
    let invalid = |reason: String| ExecError::InvalidRepositoryUrl {
        url: repo_url.to_string(),
        reason,
    };

    let parsed = Url::parse(repo_url).map_err(|e| invalid(e.to_string()))?;
    let host = parsed
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| invalid("URL has no host".to_string()))?;

    Ok(match parsed.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}
