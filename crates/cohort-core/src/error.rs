//! Error types for the core workflows.

use cohort_repo::RepositoryError;
use cohort_storage::{AssessmentId, GroupingId, StoreError, StudentId};
use thiserror::Error;

/// Invalid group names
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("group name must not be empty")]
    EmptyName,
    #[error("group name '{name}' is longer than {max} characters")]
    NameTooLong { name: String, max: usize },
    #[error("group name '{0}' is already taken")]
    NameTaken(String),
}

/// Invalid grace-period rule definitions
#[derive(Debug, Error, PartialEq)]
pub enum RuleError {
    #[error("period {index} has negative hours ({hours})")]
    NegativeHours { index: usize, hours: f64 },
    #[error("period {index} has a non-finite value")]
    NonFinite { index: usize },
}

#[derive(Debug, Error)]
pub enum PenaltyError {
    #[error(transparent)]
    Rule(#[from] RuleError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum MembershipError {
    #[error("student {student} has no pending or rejected membership in grouping {grouping}")]
    NotFound {
        student: StudentId,
        grouping: GroupingId,
    },
    #[error("student {student} already has an active membership for assessment {assessment}")]
    AlreadyActive {
        student: StudentId,
        assessment: AssessmentId,
    },
    #[error("student {student} is already a member of grouping {grouping}")]
    AlreadyMember {
        student: StudentId,
        grouping: GroupingId,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum GroupingError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The transaction was rolled back. `user_message` is safe to show; `source` is
    /// for diagnostics.
    #[error("{user_message}")]
    Operational {
        user_message: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}
