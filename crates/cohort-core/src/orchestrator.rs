//! Atomic group-creation workflows.
//!
//! A group id is reserved up front, outside the transaction, so it is never reused
//! even when the workflow rolls back. The rest runs as one transaction:
//! 1. find or create the group
//! 2. provision the repository of a newly created group
//! 3. find or create the grouping for the assessment
//! 4. add the student as inviter
//! 5. drop the student's other pending invitations for the assessment
//!
//! Any failure after the transaction opens rolls everything back.

use cohort_activity::{record_or_warn, ActivityLog, LogEntry};
use cohort_storage::{
    Assessment, AssessmentId, Group, GroupId, Grouping, Membership, MembershipStatus, NewGroup,
    Store, StoreError, Student, StudentId, Transaction,
};
use std::sync::Arc;

use crate::membership::destroy_all_pending_in;
use crate::naming::{autogenerated_name, validate_group_name};
use crate::provisioner::{Provisioned, RepositoryProvisioner};
use crate::{GroupingError, ProvisionError, ValidationError};

/// Shown to the user when a workflow had to be rolled back.
pub const RETRY_MESSAGE: &str = "The group could not be created. Please try again.";

/// Everything a successful workflow produced.
#[derive(Clone, Debug)]
pub struct GroupingOutcome {
    pub group: Group,
    pub grouping: Grouping,
    pub membership: Membership,
    /// `None` when an existing group was reused
    pub repository: Option<Provisioned>,
}

enum GroupTarget {
    Autogenerated,
    Named(String),
}

enum StepError {
    Validation(ValidationError),
    Operational(Box<dyn std::error::Error + Send + Sync>),
}

impl From<ValidationError> for StepError {
    fn from(e: ValidationError) -> Self {
        StepError::Validation(e)
    }
}

impl From<StoreError> for StepError {
    fn from(e: StoreError) -> Self {
        StepError::Operational(Box::new(e))
    }
}

impl From<ProvisionError> for StepError {
    fn from(e: ProvisionError) -> Self {
        StepError::Operational(Box::new(e))
    }
}

/// Rows written so far, kept for the failure report.
#[derive(Default)]
struct Progress {
    group: Option<Group>,
    grouping: Option<Grouping>,
}

pub struct GroupingOrchestrator<S: Store> {
    store: Arc<S>,
    provisioner: Arc<RepositoryProvisioner>,
    log: Arc<dyn ActivityLog>,
}

impl<S: Store> GroupingOrchestrator<S> {
    pub fn new(
        store: Arc<S>,
        provisioner: Arc<RepositoryProvisioner>,
        log: Arc<dyn ActivityLog>,
    ) -> Self {
        Self {
            store,
            provisioner,
            log,
        }
    }

    /// Put a student in a group of their own for an assessment.
    ///
    /// Timed assessments always get a fresh autogenerated group. Otherwise the group
    /// named after the student's user name is reused, or created with that name as its
    /// repository name too.
    pub async fn create_solo_group(
        &self,
        student_id: &StudentId,
        assessment_id: &AssessmentId,
    ) -> Result<GroupingOutcome, GroupingError> {
        let student = self.store.get_student(student_id).await?;
        let assessment = self.store.get_assessment(assessment_id).await?;
        let target = if assessment.is_timed {
            GroupTarget::Autogenerated
        } else {
            GroupTarget::Named(student.user_name.clone())
        };
        self.run(&student, &assessment, target).await
    }

    /// Found a new anonymous group for the student.
    pub async fn create_autogenerated_group(
        &self,
        student_id: &StudentId,
        assessment_id: &AssessmentId,
    ) -> Result<GroupingOutcome, GroupingError> {
        let student = self.store.get_student(student_id).await?;
        let assessment = self.store.get_assessment(assessment_id).await?;
        self.run(&student, &assessment, GroupTarget::Autogenerated)
            .await
    }

    async fn run(
        &self,
        student: &Student,
        assessment: &Assessment,
        target: GroupTarget,
    ) -> Result<GroupingOutcome, GroupingError> {
        let mut progress = Progress::default();
        // Unused when an existing named group is picked up
        let reserved = match self.store.reserve_group_id().await {
            Ok(id) => id,
            Err(e) => {
                return Err(self
                    .fail(student, assessment, &progress, Box::new(e))
                    .await)
            }
        };
        let mut txn = match self.store.begin_txn().await {
            Ok(txn) => txn,
            Err(e) => {
                return Err(self
                    .fail(student, assessment, &progress, Box::new(e))
                    .await)
            }
        };

        let outcome = match self
            .steps(&mut txn, student, assessment, target, reserved, &mut progress)
            .await
        {
            Ok(outcome) => outcome,
            Err(step_error) => {
                if let Err(e) = txn.rollback().await {
                    tracing::warn!(error = %e, "Rollback failed");
                }
                return Err(match step_error {
                    StepError::Validation(e) => GroupingError::Validation(e),
                    StepError::Operational(source) => {
                        self.fail(student, assessment, &progress, source).await
                    }
                });
            }
        };

        if let Err(e) = txn.commit().await {
            return Err(self
                .fail(student, assessment, &progress, Box::new(e))
                .await);
        }

        tracing::info!(
            student = %student.user_name,
            assessment = %assessment.short_identifier,
            group = %outcome.group.name,
            grouping = %outcome.grouping.id,
            "Created grouping"
        );
        record_or_warn(
            self.log.as_ref(),
            LogEntry::info(format!(
                "Student {} founded group {} for {}",
                student.user_name, outcome.group.name, assessment.short_identifier
            ))
            .build(),
        )
        .await;
        Ok(outcome)
    }

    async fn steps(
        &self,
        txn: &mut S::Txn,
        student: &Student,
        assessment: &Assessment,
        target: GroupTarget,
        reserved: GroupId,
        progress: &mut Progress,
    ) -> Result<GroupingOutcome, StepError> {
        let (mut group, created) = match target {
            GroupTarget::Autogenerated => {
                let name = autogenerated_name(reserved);
                (insert_group(txn, reserved, name).await?, true)
            }
            GroupTarget::Named(name) => match txn.find_group_by_name(&name).await? {
                Some(existing) => (existing, false),
                None => {
                    validate_group_name(&name)?;
                    (insert_group(txn, reserved, name).await?, true)
                }
            },
        };
        progress.group = Some(group.clone());

        let repository = if created {
            Some(self.provisioner.provision(txn, &mut group).await?)
        } else {
            None
        };
        progress.group = Some(group.clone());

        let grouping = match txn.find_grouping(&assessment.id, &group.id).await? {
            Some(grouping) => grouping,
            None => txn.insert_grouping(&assessment.id, &group.id).await?,
        };
        progress.grouping = Some(grouping.clone());

        let membership = txn
            .insert_membership(&student.id, &grouping.id, MembershipStatus::Inviter)
            .await?;
        destroy_all_pending_in(txn, &student.id, &assessment.id).await?;

        Ok(GroupingOutcome {
            group,
            grouping,
            membership,
            repository,
        })
    }

    /// Log everything known about a failed workflow and build the user-facing error.
    async fn fail(
        &self,
        student: &Student,
        assessment: &Assessment,
        progress: &Progress,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> GroupingError {
        tracing::error!(
            student = %student.user_name,
            assessment = %assessment.short_identifier,
            error = %source,
            "Group creation rolled back"
        );
        record_or_warn(
            self.log.as_ref(),
            LogEntry::error(format!(
                "Failed to create a group for {} on {}",
                student.user_name, assessment.short_identifier
            ))
            .detail("student", student)
            .detail("assessment", assessment)
            .detail("group", &progress.group)
            .detail("grouping", &progress.grouping)
            .detail("error", &source.to_string())
            .build(),
        )
        .await;

        GroupingError::Operational {
            user_message: RETRY_MESSAGE.to_string(),
            source,
        }
    }
}

async fn insert_group<T: Transaction>(
    txn: &mut T,
    id: GroupId,
    name: String,
) -> Result<Group, StepError> {
    let new_group = NewGroup {
        id,
        repository_name: name.clone(),
        name,
    };
    match txn.insert_group(&new_group).await {
        Ok(group) => Ok(group),
        Err(StoreError::AlreadyExists) => Err(ValidationError::NameTaken(new_group.name).into()),
        Err(e) => Err(e.into()),
    }
}
