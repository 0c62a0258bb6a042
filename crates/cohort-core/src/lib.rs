//! Core workflows for cohort: group creation and provisioning, membership
//! transitions, grace-period penalties and roster maintenance.
//!
//! Everything here is written against the `Store` trait from `cohort-storage`, a
//! `RepositoryBackend` from `cohort-repo` and an injected `ActivityLog`.

pub mod error;
pub mod membership;
pub mod naming;
pub mod orchestrator;
pub mod penalty;
pub mod provisioner;
pub mod roster;

pub use error::*;
pub use membership::MembershipService;
pub use naming::{autogenerated_name, validate_group_name, AUTOGENERATED_PREFIX, MAX_GROUP_NAME_LEN};
pub use orchestrator::{GroupingOrchestrator, GroupingOutcome, RETRY_MESSAGE};
pub use penalty::{compute_penalty, overtime_between, GracePeriodRule, PenaltyEngine};
pub use provisioner::{Provisioned, RepositoryProvisioner};
pub use roster::{BulkOutcome, StudentRoster};
