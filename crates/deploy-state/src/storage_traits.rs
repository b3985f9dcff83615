//! Storage trait definitions for deployment repository metadata
//!
//! `RepositoryLookup` is backend-agnostic and async. A static in-memory
//! implementation lives in [`crate::static_store`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Default public Docker registry.
pub const DOCKER_HUB_URL: &str = "https://hub.docker.com/";

/// Default public Singularity registry.
pub const SINGULARITY_HUB_URL: &str = "https://singularity-hub.org/";

/// Returns `true` when `url` designates one of the public default registries.
///
/// A trailing `/` is not significant.
pub fn is_public_default(url: &str) -> bool {
    let trimmed = url.trim().trim_end_matches('/');
    [DOCKER_HUB_URL, SINGULARITY_HUB_URL]
        .iter()
        .any(|known| known.trim_end_matches('/') == trimmed)
}

/// Identifies the operation whose implementation artifact is being looked up.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationKey {
    pub deployment_id: String,
    pub node_template: String,
    pub node_type: String,
    pub operation: String,
}

impl OperationKey {
    pub fn new(
        deployment_id: impl Into<String>,
        node_template: impl Into<String>,
        node_type: impl Into<String>,
        operation: impl Into<String>,
    ) -> Self {
        Self {
            deployment_id: deployment_id.into(),
            node_template: node_template.into(),
            node_type: node_type.into(),
            operation: operation.into(),
        }
    }
}

impl std::fmt::Display for OperationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}({})/{}",
            self.deployment_id, self.node_template, self.node_type, self.operation
        )
    }
}

/// Deployment repository metadata lookup.
///
/// Guarantees:
/// - `Ok(None)` means "nothing declared", never an error.
/// - Errors are reserved for backend failures.
#[async_trait]
pub trait RepositoryLookup: Send + Sync {
    /// Repository name declared on the operation's implementation artifact.
    async fn operation_repository(&self, key: &OperationKey) -> StorageResult<Option<String>>;

    /// URL of a repository declared in the deployment.
    async fn repository_url(
        &self,
        deployment_id: &str,
        repository: &str,
    ) -> StorageResult<Option<String>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_defaults_are_recognised() {
        assert!(is_public_default(DOCKER_HUB_URL));
        assert!(is_public_default(SINGULARITY_HUB_URL));
        assert!(is_public_default("https://hub.docker.com"));
        assert!(is_public_default("https://singularity-hub.org"));
    }

    #[test]
    fn test_private_registry_is_not_default() {
        assert!(!is_public_default("https://registry.example.com/"));
        assert!(!is_public_default(""));
    }

    #[test]
    fn test_operation_key_display() {
        let key = OperationKey::new("dep", "Job", "hpc.nodes.SingularityJob", "run");
        assert_eq!(key.to_string(), "dep/Job(hpc.nodes.SingularityJob)/run");
    }
}
