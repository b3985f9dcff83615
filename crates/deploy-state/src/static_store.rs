//! In-memory repository store
//!
//! `StaticRepositoryStore` keeps operation → repository and repository → URL
//! declarations in memory. It backs the CLI (loaded from a JSON document) and
//! the test suites.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::storage_traits::{OperationKey, RepositoryLookup, StorageResult};

/// Repository declared on one operation's implementation artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationRepository {
    #[serde(flatten)]
    pub key: OperationKey,
    pub repository: String,
}

/// Repository declared at deployment level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryDeclaration {
    pub deployment_id: String,
    pub name: String,
    pub url: String,
}

/// Serialized form of a [`StaticRepositoryStore`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreDocument {
    #[serde(default)]
    pub operations: Vec<OperationRepository>,
    #[serde(default)]
    pub repositories: Vec<RepositoryDeclaration>,
}

#[derive(Debug, Default)]
struct Tables {
    operations: HashMap<OperationKey, String>,
    repositories: HashMap<(String, String), String>,
}

/// In-memory repository store.
///
/// Operation names are matched case-insensitively, the same way the
/// dispatcher matches lifecycle operation names.
#[derive(Debug, Default)]
pub struct StaticRepositoryStore {
    tables: Mutex<Tables>,
}

impl StaticRepositoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a decoded document.
    pub fn from_document(doc: StoreDocument) -> Self {
        let store = Self::new();
        for op in doc.operations {
            store.set_operation_repository(op.key, op.repository);
        }
        for repo in doc.repositories {
            store.set_repository_url(repo.deployment_id, repo.name, repo.url);
        }
        store
    }

    /// Load a store from a JSON file holding a [`StoreDocument`].
    pub fn from_json_file(path: &Path) -> StorageResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        let doc: StoreDocument = serde_json::from_str(&raw)?;
        debug!(
            operations = doc.operations.len(),
            repositories = doc.repositories.len(),
            "Loaded repository store from {:?}",
            path
        );
        Ok(Self::from_document(doc))
    }

    /// Declare the repository used by an operation's implementation artifact.
    pub fn set_operation_repository(&self, key: OperationKey, repository: impl Into<String>) {
        let mut tables = self.tables.lock().unwrap();
        tables
            .operations
            .insert(normalize(key), repository.into());
    }

    /// Declare a repository URL for a deployment.
    pub fn set_repository_url(
        &self,
        deployment_id: impl Into<String>,
        name: impl Into<String>,
        url: impl Into<String>,
    ) {
        let mut tables = self.tables.lock().unwrap();
        tables
            .repositories
            .insert((deployment_id.into(), name.into()), url.into());
    }

    /// Builder-style variant of [`Self::set_operation_repository`].
    pub fn with_operation_repository(
        self,
        key: OperationKey,
        repository: impl Into<String>,
    ) -> Self {
        self.set_operation_repository(key, repository);
        self
    }

    /// Builder-style variant of [`Self::set_repository_url`].
    pub fn with_repository_url(
        self,
        deployment_id: impl Into<String>,
        name: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        self.set_repository_url(deployment_id, name, url);
        self
    }
}

fn normalize(mut key: OperationKey) -> OperationKey {
    key.operation = key.operation.to_lowercase();
    key
}

#[async_trait]
impl RepositoryLookup for StaticRepositoryStore {
    async fn operation_repository(&self, key: &OperationKey) -> StorageResult<Option<String>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.operations.get(&normalize(key.clone())).cloned())
    }

    async fn repository_url(
        &self,
        deployment_id: &str,
        repository: &str,
    ) -> StorageResult<Option<String>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .repositories
            .get(&(deployment_id.to_string(), repository.to_string()))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(op: &str) -> OperationKey {
        OperationKey::new("dep-1", "Job", "hpc.nodes.SingularityJob", op)
    }

    #[tokio::test]
    async fn test_operation_lookup_ignores_operation_case() {
        let store = StaticRepositoryStore::new()
            .with_operation_repository(key("Tosca.Interfaces.Node.Lifecycle.Runnable.Run"), "hub");

        let found = store
            .operation_repository(&key("tosca.interfaces.node.lifecycle.runnable.run"))
            .await
            .unwrap();
        assert_eq!(found.as_deref(), Some("hub"));
    }

    #[tokio::test]
    async fn test_missing_entries_are_none() {
        let store = StaticRepositoryStore::new();
        assert!(store.operation_repository(&key("run")).await.unwrap().is_none());
        assert!(store.repository_url("dep-1", "hub").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_repository_urls_are_scoped_by_deployment() {
        let store = StaticRepositoryStore::new()
            .with_repository_url("dep-1", "hub", "https://registry.one.example/")
            .with_repository_url("dep-2", "hub", "https://registry.two.example/");

        assert_eq!(
            store.repository_url("dep-2", "hub").await.unwrap().as_deref(),
            Some("https://registry.two.example/")
        );
    }
}
