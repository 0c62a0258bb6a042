//! Filesystem repository backend.
//!
//! Each repository is a directory. Access rules live next to the contents in
//! `.permissions.json`.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::{PermissionMap, RepositoryBackend, RepositoryError, RepositoryHandle};

const PERMISSIONS_FILE: &str = ".permissions.json";

/// Repositories stored as plain directories.
#[derive(Clone, Debug, Default)]
pub struct FilesystemRepository;

impl FilesystemRepository {
    pub fn new() -> Self {
        Self
    }

    async fn read_permissions(path: &Path) -> Result<PermissionMap, RepositoryError> {
        match tokio::fs::read(path.join(PERMISSIONS_FILE)).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(PermissionMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_permissions(
        path: &Path,
        permissions: &PermissionMap,
    ) -> Result<(), RepositoryError> {
        let contents = serde_json::to_vec_pretty(permissions)?;
        tokio::fs::write(path.join(PERMISSIONS_FILE), contents).await?;
        Ok(())
    }

    async fn require_dir(path: &Path) -> Result<(), RepositoryError> {
        match tokio::fs::metadata(path).await {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(RepositoryError::NotFound(path.display().to_string())),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(RepositoryError::NotFound(path.display().to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl RepositoryBackend for FilesystemRepository {
    async fn create(&self, path: &Path) -> Result<(), RepositoryError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        // create_dir (not create_dir_all) so that exactly one racing caller wins
        match tokio::fs::create_dir(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                Err(RepositoryError::Collision(path.display().to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, path: &Path) -> Result<bool, RepositoryError> {
        match tokio::fs::metadata(path).await {
            Ok(meta) => Ok(meta.is_dir()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn set_bulk_permissions(
        &self,
        paths: &[PathBuf],
        permissions: &PermissionMap,
    ) -> Result<(), RepositoryError> {
        for path in paths {
            Self::require_dir(path).await?;
        }
        for path in paths {
            let mut current = Self::read_permissions(path).await?;
            for (identity, permission) in permissions {
                current.insert(identity.clone(), *permission);
            }
            Self::write_permissions(path, &current).await?;
        }
        Ok(())
    }

    async fn open(&self, path: &Path) -> Result<RepositoryHandle, RepositoryError> {
        Self::require_dir(path).await?;
        Ok(RepositoryHandle {
            location: path.to_path_buf(),
            permissions: Self::read_permissions(path).await?,
        })
    }
}
