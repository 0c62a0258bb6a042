//! Creates and permissions the repository behind each group.

use cohort_activity::{record_or_warn, ActivityLog, LogEntry};
use cohort_config::RepositoryConfig;
use cohort_repo::{
    Permission, PermissionMap, RepositoryBackend, RepositoryError, RepositoryHandle,
};
use cohort_storage::{Group, Transaction};
use std::path::PathBuf;
use std::sync::Arc;

use crate::ProvisionError;

/// What happened to a group's repository during provisioning.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Provisioned {
    /// This deployment does not administer repositories
    Skipped,
    Created,
    /// Something already lived at the path. The group keeps the message in
    /// `repository_error`.
    Collision(String),
}

pub struct RepositoryProvisioner {
    backend: Arc<dyn RepositoryBackend>,
    config: RepositoryConfig,
    log: Arc<dyn ActivityLog>,
}

impl RepositoryProvisioner {
    pub fn new(
        backend: Arc<dyn RepositoryBackend>,
        config: RepositoryConfig,
        log: Arc<dyn ActivityLog>,
    ) -> Self {
        Self {
            backend,
            config,
            log,
        }
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    pub fn repository_path(&self, group: &Group) -> PathBuf {
        self.config.storage_dir.join(&group.repository_name)
    }

    /// Create the group's repository as a step of `txn`.
    ///
    /// A collision does not fail the call: it is written to the group (both the row
    /// inside `txn` and `group` itself) and to the activity log.
    pub async fn provision<T: Transaction>(
        &self,
        txn: &mut T,
        group: &mut Group,
    ) -> Result<Provisioned, ProvisionError> {
        if !self.config.is_repository_admin {
            return Ok(Provisioned::Skipped);
        }

        let path = self.repository_path(group);
        match self.backend.create(&path).await {
            Ok(()) => {
                tracing::info!(group = %group.name, path = %path.display(), "Created group repository");
                Ok(Provisioned::Created)
            }
            Err(e @ RepositoryError::Collision(_)) => {
                let message = e.to_string();
                txn.annotate_repository_error(&group.id, &message).await?;
                group.repository_error = Some(message.clone());

                tracing::error!(
                    group = %group.name,
                    repository = %group.repository_name,
                    error = %message,
                    "Repository collision"
                );
                record_or_warn(
                    self.log.as_ref(),
                    LogEntry::error(format!(
                        "Could not create repository for group {}",
                        group.name
                    ))
                    .detail("group_name", &group.name)
                    .detail("repository_name", &group.repository_name)
                    .detail("error", &message)
                    .build(),
                )
                .await;
                Ok(Provisioned::Collision(message))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Give every admin and grader read-write access to the group's repository.
    pub async fn sync_permissions(
        &self,
        group: &Group,
        admins: &[String],
        graders: &[String],
    ) -> Result<(), ProvisionError> {
        if !self.config.is_repository_admin {
            return Ok(());
        }

        let permissions: PermissionMap = admins
            .iter()
            .chain(graders)
            .map(|identity| (identity.clone(), Permission::ReadWrite))
            .collect();
        self.backend
            .set_bulk_permissions(&[self.repository_path(group)], &permissions)
            .await?;
        Ok(())
    }

    /// Path of the group's repository, which must already exist.
    pub async fn repository_location(&self, group: &Group) -> Result<PathBuf, ProvisionError> {
        let path = self.repository_path(group);
        if !self.backend.exists(&path).await? {
            return Err(RepositoryError::NotFound(path.display().to_string()).into());
        }
        Ok(path)
    }

    pub async fn open_repository(&self, group: &Group) -> Result<RepositoryHandle, ProvisionError> {
        let path = self.repository_location(group).await?;
        Ok(self.backend.open(&path).await?)
    }

    /// URL students clone from, when repositories are exposed externally.
    pub fn external_access_url(&self, group: &Group) -> Option<String> {
        self.config
            .external_base_url
            .as_ref()
            .map(|base| format!("{}/{}", base, group.repository_name))
    }
}
