//! Membership state machine.
//!
//! ```text
//! pending  ──join──▶ accepted
//! pending  ──join elsewhere──▶ rejected ──join──▶ accepted
//! pending  ──destroy_all_pending──▶ (deleted)
//! ```
//!
//! `inviter` is only assigned when a grouping is founded and counts as accepted.

use cohort_storage::{
    AssessmentId, Grouping, GroupingId, Membership, MembershipStatus, Store, StoreError,
    StudentId, Transaction,
};
use std::sync::Arc;

use crate::MembershipError;

pub struct MembershipService<S: Store> {
    store: Arc<S>,
}

impl<S: Store> MembershipService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Invite a student into a grouping as `pending`.
    ///
    /// Hidden students are silently skipped and `Ok(None)` is returned.
    pub async fn invite(
        &self,
        student_id: &StudentId,
        grouping_id: &GroupingId,
    ) -> Result<Option<Membership>, MembershipError> {
        let student = self.store.get_student(student_id).await?;
        if student.hidden {
            tracing::debug!(student = %student_id, grouping = %grouping_id, "Not inviting hidden student");
            return Ok(None);
        }

        match self
            .store
            .create_membership(student_id, grouping_id, MembershipStatus::Pending)
            .await
        {
            Ok(membership) => Ok(Some(membership)),
            Err(StoreError::AlreadyExists) => Err(MembershipError::AlreadyMember {
                student: *student_id,
                grouping: *grouping_id,
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Accept a pending or previously rejected invitation.
    ///
    /// Every other pending invitation the student holds for the same assessment is
    /// rejected in the same transaction.
    pub async fn join(
        &self,
        student_id: &StudentId,
        grouping_id: &GroupingId,
    ) -> Result<Membership, MembershipError> {
        let mut txn = self.store.begin_txn().await?;
        let grouping = txn.get_grouping(grouping_id).await?;

        let Some(membership) = txn
            .find_membership(student_id, grouping_id, &MembershipStatus::JOINABLE)
            .await?
        else {
            txn.rollback().await?;
            return Err(MembershipError::NotFound {
                student: *student_id,
                grouping: *grouping_id,
            });
        };

        let active_elsewhere = txn
            .student_memberships(student_id, &grouping.assessment_id, &MembershipStatus::ACTIVE)
            .await?
            .into_iter()
            .any(|m| m.grouping_id != *grouping_id);
        if active_elsewhere {
            txn.rollback().await?;
            return Err(MembershipError::AlreadyActive {
                student: *student_id,
                assessment: grouping.assessment_id,
            });
        }

        txn.update_membership_status(&membership.id, MembershipStatus::Accepted)
            .await?;
        let rejected = txn
            .reject_pending_memberships(student_id, &grouping.assessment_id)
            .await?;
        txn.commit().await?;

        tracing::info!(
            student = %student_id,
            grouping = %grouping_id,
            rejected,
            "Student joined grouping"
        );
        Ok(Membership {
            status: MembershipStatus::Accepted,
            ..membership
        })
    }

    /// Delete every pending membership the student holds for the assessment.
    pub async fn destroy_all_pending(
        &self,
        student_id: &StudentId,
        assessment_id: &AssessmentId,
    ) -> Result<u64, MembershipError> {
        let mut txn = self.store.begin_txn().await?;
        let removed = destroy_all_pending_in(&mut txn, student_id, assessment_id).await?;
        txn.commit().await?;
        Ok(removed)
    }

    // ───────────────────────────────────── Queries ────────────────────────────────────────

    /// The grouping the student is an accepted member (or inviter) of, if any.
    pub async fn accepted_grouping_for(
        &self,
        student_id: &StudentId,
        assessment_id: &AssessmentId,
    ) -> Result<Option<Grouping>, MembershipError> {
        let groupings = self
            .store
            .student_groupings(student_id, assessment_id, &MembershipStatus::ACTIVE)
            .await?;
        Ok(groupings.into_iter().next())
    }

    pub async fn has_accepted_grouping_for(
        &self,
        student_id: &StudentId,
        assessment_id: &AssessmentId,
    ) -> Result<bool, MembershipError> {
        Ok(self
            .accepted_grouping_for(student_id, assessment_id)
            .await?
            .is_some())
    }

    pub async fn pending_groupings_for(
        &self,
        student_id: &StudentId,
        assessment_id: &AssessmentId,
    ) -> Result<Vec<Grouping>, MembershipError> {
        Ok(self
            .store
            .student_groupings(student_id, assessment_id, &[MembershipStatus::Pending])
            .await?)
    }

    pub async fn has_pending_groupings_for(
        &self,
        student_id: &StudentId,
        assessment_id: &AssessmentId,
    ) -> Result<bool, MembershipError> {
        Ok(!self
            .pending_groupings_for(student_id, assessment_id)
            .await?
            .is_empty())
    }

    pub async fn rejected_groupings_for(
        &self,
        student_id: &StudentId,
        assessment_id: &AssessmentId,
    ) -> Result<Vec<Grouping>, MembershipError> {
        Ok(self
            .store
            .student_groupings(student_id, assessment_id, &[MembershipStatus::Rejected])
            .await?)
    }
}

/// `destroy_all_pending` as a step of a larger transaction.
pub async fn destroy_all_pending_in<T: Transaction>(
    txn: &mut T,
    student_id: &StudentId,
    assessment_id: &AssessmentId,
) -> Result<u64, StoreError> {
    let removed = txn
        .delete_pending_memberships(student_id, assessment_id)
        .await?;
    if removed > 0 {
        tracing::debug!(student = %student_id, assessment = %assessment_id, removed, "Removed pending memberships");
    }
    Ok(removed)
}
