//! In-memory repository backend.
//!
//! Suitable for tests and dry runs. Nothing survives the process.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::{PermissionMap, RepositoryBackend, RepositoryError, RepositoryHandle};

/// Repositories kept in a concurrent map keyed by path.
#[derive(Clone, Default)]
pub struct MemoryRepository {
    repos: Arc<DashMap<PathBuf, PermissionMap>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of repositories created so far.
    pub fn len(&self) -> usize {
        self.repos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repos.is_empty()
    }
}

#[async_trait]
impl RepositoryBackend for MemoryRepository {
    async fn create(&self, path: &Path) -> Result<(), RepositoryError> {
        match self.repos.entry(path.to_path_buf()) {
            Entry::Occupied(_) => Err(RepositoryError::Collision(path.display().to_string())),
            Entry::Vacant(slot) => {
                slot.insert(PermissionMap::new());
                Ok(())
            }
        }
    }

    async fn exists(&self, path: &Path) -> Result<bool, RepositoryError> {
        Ok(self.repos.contains_key(path))
    }

    async fn set_bulk_permissions(
        &self,
        paths: &[PathBuf],
        permissions: &PermissionMap,
    ) -> Result<(), RepositoryError> {
        // Check everything first so a missing path leaves all repositories untouched
        if let Some(missing) = paths.iter().find(|p| !self.repos.contains_key(p.as_path())) {
            return Err(RepositoryError::NotFound(missing.display().to_string()));
        }
        for path in paths {
            if let Some(mut current) = self.repos.get_mut(path) {
                for (identity, permission) in permissions {
                    current.insert(identity.clone(), *permission);
                }
            }
        }
        Ok(())
    }

    async fn open(&self, path: &Path) -> Result<RepositoryHandle, RepositoryError> {
        let permissions = self
            .repos
            .get(path)
            .ok_or_else(|| RepositoryError::NotFound(path.display().to_string()))?
            .clone();
        Ok(RepositoryHandle {
            location: path.to_path_buf(),
            permissions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Permission;

    #[tokio::test]
    async fn create_then_collide() {
        let repo = MemoryRepository::new();
        let path = Path::new("repos/alice");

        repo.create(path).await.unwrap();
        assert!(repo.exists(path).await.unwrap());

        let err = repo.create(path).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Collision(p) if p == "repos/alice"));
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_creates_admit_one_winner() {
        let repo = MemoryRepository::new();
        let mut handles = Vec::new();
        for _ in 0..8 {
            let repo = repo.clone();
            handles.push(tokio::spawn(async move {
                repo.create(Path::new("repos/shared")).await.is_ok()
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn permissions_merge_and_are_idempotent() {
        let repo = MemoryRepository::new();
        let path = PathBuf::from("repos/group_0001");
        repo.create(&path).await.unwrap();

        let mut perms = PermissionMap::new();
        perms.insert("admin".to_string(), Permission::ReadWrite);
        repo.set_bulk_permissions(&[path.clone()], &perms).await.unwrap();
        repo.set_bulk_permissions(&[path.clone()], &perms).await.unwrap();

        let mut more = PermissionMap::new();
        more.insert("ta".to_string(), Permission::Read);
        repo.set_bulk_permissions(&[path.clone()], &more).await.unwrap();

        let handle = repo.open(&path).await.unwrap();
        assert_eq!(handle.permissions.len(), 2);
        assert_eq!(handle.permissions["admin"], Permission::ReadWrite);
        assert_eq!(handle.permissions["ta"], Permission::Read);
    }

    #[tokio::test]
    async fn permissions_on_missing_repository_fail() {
        let repo = MemoryRepository::new();
        let present = PathBuf::from("repos/present");
        repo.create(&present).await.unwrap();

        let mut perms = PermissionMap::new();
        perms.insert("admin".to_string(), Permission::ReadWrite);
        let err = repo
            .set_bulk_permissions(&[present.clone(), PathBuf::from("repos/absent")], &perms)
            .await
            .unwrap_err();

        assert!(matches!(err, RepositoryError::NotFound(_)));
        assert!(repo.open(&present).await.unwrap().permissions.is_empty());
    }

    #[tokio::test]
    async fn open_missing_is_not_found() {
        let repo = MemoryRepository::new();
        assert!(matches!(
            repo.open(Path::new("nope")).await,
            Err(RepositoryError::NotFound(_))
        ));
    }
}
