//! Repository backend abstraction for cohort.
//!
//! Every group owns one repository, addressed by a path. This crate defines the
//! `RepositoryBackend` contract the provisioner talks to and two implementations:
//! - [`MemoryRepository`] (single process, DashMap)
//! - [`FilesystemRepository`] (one directory per repository)

use async_trait::async_trait;
use cohort_config::BackendKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

mod filesystem;
mod memory;

pub use filesystem::FilesystemRepository;
pub use memory::MemoryRepository;

/// Access level granted to an identity on a repository
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    Read,
    ReadWrite,
}

/// Identity (user name) to permission mapping
pub type PermissionMap = BTreeMap<String, Permission>;

/// Error type for repository backend operations
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("repository already exists at {0}")]
    Collision(String),
    #[error("repository not found at {0}")]
    NotFound(String),
    #[error("repository I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to (de)serialize repository permissions: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// An opened repository.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RepositoryHandle {
    pub location: PathBuf,
    pub permissions: PermissionMap,
}

/// Backend that stores group repositories.
///
/// Implementations must reject a second `create` at the same path with
/// [`RepositoryError::Collision`], including when the two calls race.
#[cfg_attr(feature = "test-support", mockall::automock)]
#[async_trait]
pub trait RepositoryBackend: Send + Sync {
    /// Create an empty repository at `path`.
    async fn create(&self, path: &Path) -> Result<(), RepositoryError>;

    /// Whether a repository exists at `path`.
    async fn exists(&self, path: &Path) -> Result<bool, RepositoryError>;

    /// Grant every identity in `permissions` its access level on each of `paths`.
    ///
    /// Identities not mentioned keep whatever they had. Calling this twice with the
    /// same arguments leaves the same state.
    async fn set_bulk_permissions(
        &self,
        paths: &[PathBuf],
        permissions: &PermissionMap,
    ) -> Result<(), RepositoryError>;

    /// Open the repository at `path`.
    async fn open(&self, path: &Path) -> Result<RepositoryHandle, RepositoryError>;
}

/// Build the backend selected by configuration.
pub fn backend_for(kind: BackendKind) -> Arc<dyn RepositoryBackend> {
    match kind {
        BackendKind::Memory => Arc::new(MemoryRepository::new()),
        BackendKind::Filesystem => Arc::new(FilesystemRepository::new()),
    }
}
