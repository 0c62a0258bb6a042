#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use cohort_activity::MemoryActivityLog;
use cohort_config::{BackendKind, RepositoryConfig};
use cohort_core::{GroupingOrchestrator, MembershipService, RepositoryProvisioner};
use cohort_repo::{MemoryRepository, RepositoryBackend};
use cohort_storage::{
    AssessmentId, CreateAssessmentParams, CreateStudentParams, Store, StudentId,
};
use cohort_store_sqlite::SqliteStore;
use std::path::PathBuf;
use std::sync::Arc;

pub struct Harness {
    pub store: Arc<SqliteStore>,
    pub log: Arc<MemoryActivityLog>,
    pub orchestrator: GroupingOrchestrator<SqliteStore>,
    pub memberships: MembershipService<SqliteStore>,
}

pub fn config() -> RepositoryConfig {
    RepositoryConfig {
        is_repository_admin: true,
        storage_dir: PathBuf::from("repos"),
        backend: BackendKind::Memory,
        external_base_url: None,
    }
}

pub async fn harness() -> (Harness, MemoryRepository) {
    let backend = MemoryRepository::new();
    let h = harness_with(Arc::new(backend.clone()), config()).await;
    (h, backend)
}

pub async fn harness_with(backend: Arc<dyn RepositoryBackend>, config: RepositoryConfig) -> Harness {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    let log = Arc::new(MemoryActivityLog::new());
    let provisioner = Arc::new(RepositoryProvisioner::new(backend, config, log.clone()));
    Harness {
        orchestrator: GroupingOrchestrator::new(store.clone(), provisioner, log.clone()),
        memberships: MembershipService::new(store.clone()),
        store,
        log,
    }
}

pub fn due() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

pub async fn student(store: &SqliteStore, user_name: &str) -> StudentId {
    store
        .create_student(&CreateStudentParams {
            user_name: user_name.to_string(),
            grace_credits: 3,
        })
        .await
        .unwrap()
        .id
}

pub async fn assessment(store: &SqliteStore, short_identifier: &str, is_timed: bool) -> AssessmentId {
    store
        .create_assessment(&CreateAssessmentParams {
            short_identifier: short_identifier.to_string(),
            is_timed,
            due_date: due(),
        })
        .await
        .unwrap()
        .id
}
