//! Deploy-State: deployment repository metadata for slurmexec
//!
//! The execution driver never talks to the deployment store directly. It goes
//! through the [`RepositoryLookup`] trait, which answers two questions:
//!
//! - which repository does an operation's implementation artifact come from?
//! - what URL does a named repository point at?
//!
//! ## Key Components
//!
//! - `RepositoryLookup`: async lookup contract
//! - `StaticRepositoryStore`: in-memory store, loadable from JSON
//! - `DOCKER_HUB_URL` / `SINGULARITY_HUB_URL`: public registries that never
//!   trigger an image rewrite

mod error;
pub mod static_store;
pub mod storage_traits;

pub use error::StorageError;
pub use static_store::{
    OperationRepository, RepositoryDeclaration, StaticRepositoryStore, StoreDocument,
};
pub use storage_traits::{
    is_public_default, OperationKey, RepositoryLookup, StorageResult, DOCKER_HUB_URL,
    SINGULARITY_HUB_URL,
};
