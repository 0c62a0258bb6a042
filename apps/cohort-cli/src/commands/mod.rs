pub mod assessment;
pub mod group;
pub mod student;

pub use assessment::{cmd_assessment_add, cmd_assessment_overtime, cmd_assessment_periods};
pub use group::{
    cmd_autogen, cmd_invite, cmd_join, cmd_penalty, cmd_repository, cmd_solo,
    cmd_sync_permissions,
};
pub use student::{cmd_student_add, cmd_student_credits, cmd_student_grace, cmd_student_hide};

use cohort_activity::ActivityLog;
use cohort_config::Settings;
use cohort_core::{
    GroupingOrchestrator, MembershipService, PenaltyEngine, RepositoryProvisioner, StudentRoster,
};
use cohort_storage::{Grouping, Store, StudentId};
use cohort_store_sqlite::SqliteStore;
use std::sync::Arc;

/// Everything the commands need, wired from settings.
pub struct App {
    pub store: Arc<SqliteStore>,
    pub provisioner: Arc<RepositoryProvisioner>,
    pub orchestrator: GroupingOrchestrator<SqliteStore>,
    pub memberships: MembershipService<SqliteStore>,
    pub roster: StudentRoster<SqliteStore>,
    pub penalties: PenaltyEngine<SqliteStore>,
}

impl App {
    pub fn new(store: SqliteStore, settings: &Settings, log: impl ActivityLog + 'static) -> Self {
        let store = Arc::new(store);
        let log: Arc<dyn ActivityLog> = Arc::new(log);
        let provisioner = Arc::new(RepositoryProvisioner::new(
            cohort_repo::backend_for(settings.repository.backend),
            settings.repository.clone(),
            log.clone(),
        ));
        Self {
            orchestrator: GroupingOrchestrator::new(store.clone(), provisioner.clone(), log),
            memberships: MembershipService::new(store.clone()),
            roster: StudentRoster::new(store.clone()),
            penalties: PenaltyEngine::new(store.clone()),
            provisioner,
            store,
        }
    }

    pub async fn student_ids(
        &self,
        user_names: &[String],
    ) -> Result<Vec<StudentId>, Box<dyn std::error::Error>> {
        let mut ids = Vec::with_capacity(user_names.len());
        for user_name in user_names {
            let student = self
                .store
                .get_student_by_user_name(user_name)
                .await
                .map_err(|e| format!("Student '{}': {}", user_name, e))?;
            ids.push(student.id);
        }
        Ok(ids)
    }

    /// The grouping of `group_name` for the assessment.
    pub async fn grouping(
        &self,
        assessment: &str,
        group_name: &str,
    ) -> Result<Grouping, Box<dyn std::error::Error>> {
        let assessment = self
            .store
            .get_assessment_by_short_identifier(assessment)
            .await?;
        let group = self.store.get_group_by_name(group_name).await?;
        self.store
            .list_groupings(&assessment.id)
            .await?
            .into_iter()
            .find(|g| g.group_id == group.id)
            .ok_or_else(|| {
                format!(
                    "Group '{}' has no grouping for {}",
                    group_name, assessment.short_identifier
                )
                .into()
            })
    }
}
