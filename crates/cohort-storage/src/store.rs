//! The Store and Transaction traits that backends implement.

use chrono::{DateTime, Utc};

use crate::types::*;
use crate::StoreError;

/// A unit of work spanning several writes.
///
/// Dropping a transaction without calling [`Transaction::commit`] discards its writes.
/// Every multi-row workflow (group creation, joining) goes through one of these.
#[async_trait::async_trait]
pub trait Transaction: Send {
    // ───────────────────────────────────── Groups ─────────────────────────────────────────

    /// Insert a group row (returns `AlreadyExists` on a duplicate name).
    async fn insert_group(&mut self, group: &NewGroup) -> Result<Group, StoreError>;

    /// Find a group by its unique name.
    async fn find_group_by_name(&mut self, name: &str) -> Result<Option<Group>, StoreError>;

    /// Record a repository provisioning problem on the group.
    async fn annotate_repository_error(
        &mut self,
        group_id: &GroupId,
        message: &str,
    ) -> Result<(), StoreError>;

    // ───────────────────────────────────── Groupings ──────────────────────────────────────

    /// Find the grouping for a (assessment, group) pair.
    async fn find_grouping(
        &mut self,
        assessment_id: &AssessmentId,
        group_id: &GroupId,
    ) -> Result<Option<Grouping>, StoreError>;

    /// Insert a grouping for a (assessment, group) pair.
    async fn insert_grouping(
        &mut self,
        assessment_id: &AssessmentId,
        group_id: &GroupId,
    ) -> Result<Grouping, StoreError>;

    /// Get a grouping by ID.
    async fn get_grouping(&mut self, grouping_id: &GroupingId) -> Result<Grouping, StoreError>;

    // ───────────────────────────────────── Memberships ────────────────────────────────────

    /// Find a student's membership in a grouping whose status is one of `statuses`.
    async fn find_membership(
        &mut self,
        student_id: &StudentId,
        grouping_id: &GroupingId,
        statuses: &[MembershipStatus],
    ) -> Result<Option<Membership>, StoreError>;

    /// Insert a membership (returns `AlreadyExists` if the student is already in the grouping
    /// or a second inviter is added).
    async fn insert_membership(
        &mut self,
        student_id: &StudentId,
        grouping_id: &GroupingId,
        status: MembershipStatus,
    ) -> Result<Membership, StoreError>;

    /// Change the status of a single membership.
    async fn update_membership_status(
        &mut self,
        membership_id: &MembershipId,
        status: MembershipStatus,
    ) -> Result<(), StoreError>;

    /// List a student's memberships for an assessment whose status is one of `statuses`.
    async fn student_memberships(
        &mut self,
        student_id: &StudentId,
        assessment_id: &AssessmentId,
        statuses: &[MembershipStatus],
    ) -> Result<Vec<Membership>, StoreError>;

    /// Move every pending membership of the student for the assessment to `rejected`.
    /// Returns the number of rows changed.
    async fn reject_pending_memberships(
        &mut self,
        student_id: &StudentId,
        assessment_id: &AssessmentId,
    ) -> Result<u64, StoreError>;

    /// Delete every pending membership of the student for the assessment.
    /// Returns the number of rows removed.
    async fn delete_pending_memberships(
        &mut self,
        student_id: &StudentId,
        assessment_id: &AssessmentId,
    ) -> Result<u64, StoreError>;

    // ─────────────────────────────── Lifecycle  ───────────────────────────────

    async fn commit(self) -> Result<(), StoreError>;
    async fn rollback(self) -> Result<(), StoreError>;
}

/// The storage trait `cohort-core` depends on.
///
/// Methods here run on their own (each one is atomic); anything that must happen
/// together goes through [`Store::begin_txn`].
#[async_trait::async_trait]
pub trait Store: Send + Sync {
    type Txn: Transaction;

    // ─────────────────────────────── Lifecycle  ───────────────────────────────

    /// Open a transaction.
    async fn begin_txn(&self) -> Result<Self::Txn, StoreError>;

    // ───────────────────────────────────── Students ───────────────────────────────────────

    /// Create a new student (returns `AlreadyExists` on a duplicate user name).
    async fn create_student(&self, params: &CreateStudentParams) -> Result<Student, StoreError>;

    /// Get student by ID.
    async fn get_student(&self, student_id: &StudentId) -> Result<Student, StoreError>;

    /// Get student by user name.
    async fn get_student_by_user_name(&self, user_name: &str) -> Result<Student, StoreError>;

    /// Hide or unhide a student.
    async fn set_student_hidden(
        &self,
        student_id: &StudentId,
        hidden: bool,
    ) -> Result<(), StoreError>;

    /// Overwrite a student's grace credit balance.
    async fn set_grace_credits(
        &self,
        student_id: &StudentId,
        grace_credits: i32,
    ) -> Result<(), StoreError>;

    /// Record grace credits consumed through a membership.
    async fn create_grace_deduction(
        &self,
        membership_id: &MembershipId,
        deduction: i32,
    ) -> Result<GraceDeduction, StoreError>;

    /// List grace deductions across all of a student's memberships.
    async fn list_grace_deductions(
        &self,
        student_id: &StudentId,
    ) -> Result<Vec<GraceDeduction>, StoreError>;

    // ───────────────────────────────────── Assessments ────────────────────────────────────

    /// Create a new assessment.
    async fn create_assessment(
        &self,
        params: &CreateAssessmentParams,
    ) -> Result<Assessment, StoreError>;

    /// Get assessment by ID.
    async fn get_assessment(&self, assessment_id: &AssessmentId)
        -> Result<Assessment, StoreError>;

    /// Get assessment by short identifier.
    async fn get_assessment_by_short_identifier(
        &self,
        short_identifier: &str,
    ) -> Result<Assessment, StoreError>;

    /// Replace the penalty periods of an assessment, keeping the given order.
    async fn set_penalty_periods(
        &self,
        assessment_id: &AssessmentId,
        periods: &[DeductionPeriod],
    ) -> Result<(), StoreError>;

    /// List penalty periods in stored order.
    async fn list_penalty_periods(
        &self,
        assessment_id: &AssessmentId,
    ) -> Result<Vec<DeductionPeriod>, StoreError>;

    // ───────────────────────────────────── Groups ─────────────────────────────────────────

    /// Hand out a fresh group id before any group row exists, so names derived from the
    /// id are final when the row becomes visible.
    ///
    /// The reservation is committed on its own and survives a rolled-back transaction:
    /// an id is never handed out twice.
    async fn reserve_group_id(&self) -> Result<GroupId, StoreError>;

    /// Get group by ID.
    async fn get_group(&self, group_id: &GroupId) -> Result<Group, StoreError>;

    /// Get group by name.
    async fn get_group_by_name(&self, name: &str) -> Result<Group, StoreError>;

    /// List all groups.
    async fn list_groups(&self) -> Result<Vec<Group>, StoreError>;

    // ───────────────────────────────────── Groupings ──────────────────────────────────────

    /// Get grouping by ID.
    async fn get_grouping(&self, grouping_id: &GroupingId) -> Result<Grouping, StoreError>;

    /// List all groupings of an assessment.
    async fn list_groupings(&self, assessment_id: &AssessmentId)
        -> Result<Vec<Grouping>, StoreError>;

    /// Groupings of an assessment in which the student holds one of `statuses`.
    async fn student_groupings(
        &self,
        student_id: &StudentId,
        assessment_id: &AssessmentId,
        statuses: &[MembershipStatus],
    ) -> Result<Vec<Grouping>, StoreError>;

    // ───────────────────────────────────── Memberships ────────────────────────────────────

    /// Create a membership (returns `AlreadyExists` if the student is already in the grouping).
    async fn create_membership(
        &self,
        student_id: &StudentId,
        grouping_id: &GroupingId,
        status: MembershipStatus,
    ) -> Result<Membership, StoreError>;

    /// List memberships of a grouping.
    async fn list_memberships(&self, grouping_id: &GroupingId)
        -> Result<Vec<Membership>, StoreError>;

    /// List a student's memberships for an assessment, in any status.
    async fn list_student_memberships(
        &self,
        student_id: &StudentId,
        assessment_id: &AssessmentId,
    ) -> Result<Vec<Membership>, StoreError>;

    // ───────────────────────────────────── Submissions ────────────────────────────────────

    /// Record a submission for a grouping.
    async fn create_submission(
        &self,
        grouping_id: &GroupingId,
        revision_timestamp: DateTime<Utc>,
    ) -> Result<Submission, StoreError>;

    /// Get submission by ID.
    async fn get_submission(&self, submission_id: &SubmissionId)
        -> Result<Submission, StoreError>;

    /// Attach a new grading result to a submission.
    async fn create_result(&self, submission_id: &SubmissionId)
        -> Result<MarkingResult, StoreError>;

    /// The first result ever created for the submission.
    async fn original_result(
        &self,
        submission_id: &SubmissionId,
    ) -> Result<MarkingResult, StoreError>;

    /// Create an extra mark on a result.
    async fn create_extra_mark(
        &self,
        params: &CreateExtraMarkParams,
    ) -> Result<ExtraMark, StoreError>;

    /// List extra marks of a result, oldest first.
    async fn list_extra_marks(&self, result_id: &ResultId) -> Result<Vec<ExtraMark>, StoreError>;
}
