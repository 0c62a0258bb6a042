use cohort_repo::{
    FilesystemRepository, Permission, PermissionMap, RepositoryBackend, RepositoryError,
};
use std::path::PathBuf;

fn admins() -> PermissionMap {
    let mut perms = PermissionMap::new();
    perms.insert("instructor".to_string(), Permission::ReadWrite);
    perms.insert("ta1".to_string(), Permission::ReadWrite);
    perms
}

#[tokio::test]
async fn create_makes_nested_directory() {
    let dir = tempfile::tempdir().unwrap();
    let backend = FilesystemRepository::new();
    let path = dir.path().join("course").join("group_0001");

    assert!(!backend.exists(&path).await.unwrap());
    backend.create(&path).await.unwrap();
    assert!(backend.exists(&path).await.unwrap());
    assert!(path.is_dir());
}

#[tokio::test]
async fn second_create_collides() {
    let dir = tempfile::tempdir().unwrap();
    let backend = FilesystemRepository::new();
    let path = dir.path().join("alice");

    backend.create(&path).await.unwrap();
    let err = backend.create(&path).await.unwrap_err();
    assert!(matches!(err, RepositoryError::Collision(_)));
}

#[tokio::test]
async fn permissions_persist_across_backends() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("group_0007");
    FilesystemRepository::new().create(&path).await.unwrap();

    FilesystemRepository::new()
        .set_bulk_permissions(&[path.clone()], &admins())
        .await
        .unwrap();
    // Idempotent
    FilesystemRepository::new()
        .set_bulk_permissions(&[path.clone()], &admins())
        .await
        .unwrap();

    let handle = FilesystemRepository::new().open(&path).await.unwrap();
    assert_eq!(handle.location, path);
    assert_eq!(handle.permissions, admins());
}

#[tokio::test]
async fn open_and_permission_missing_repository() {
    let dir = tempfile::tempdir().unwrap();
    let backend = FilesystemRepository::new();
    let missing = dir.path().join("missing");

    assert!(matches!(
        backend.open(&missing).await,
        Err(RepositoryError::NotFound(_))
    ));
    assert!(matches!(
        backend
            .set_bulk_permissions(&[PathBuf::from(&missing)], &admins())
            .await,
        Err(RepositoryError::NotFound(_))
    ));
}
