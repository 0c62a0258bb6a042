//! Bulk student maintenance.
//!
//! These operations go row by row: a failure on one student is reported and the
//! rest still apply.

use cohort_storage::{Store, StoreError, StudentId};
use std::sync::Arc;

/// Per-student result of a bulk operation.
#[derive(Debug, Default)]
pub struct BulkOutcome {
    pub updated: Vec<StudentId>,
    pub failed: Vec<(StudentId, StoreError)>,
}

impl BulkOutcome {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    fn record(&mut self, student_id: StudentId, result: Result<(), StoreError>) {
        match result {
            Ok(()) => self.updated.push(student_id),
            Err(e) => {
                tracing::warn!(student = %student_id, error = %e, "Bulk update skipped student");
                self.failed.push((student_id, e));
            }
        }
    }
}

pub struct StudentRoster<S: Store> {
    store: Arc<S>,
}

impl<S: Store> StudentRoster<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn hide_students(&self, student_ids: &[StudentId]) -> BulkOutcome {
        self.set_hidden(student_ids, true).await
    }

    pub async fn unhide_students(&self, student_ids: &[StudentId]) -> BulkOutcome {
        self.set_hidden(student_ids, false).await
    }

    async fn set_hidden(&self, student_ids: &[StudentId], hidden: bool) -> BulkOutcome {
        let mut outcome = BulkOutcome::default();
        for student_id in student_ids {
            let result = self.store.set_student_hidden(student_id, hidden).await;
            outcome.record(*student_id, result);
        }
        outcome
    }

    /// Add `amount` grace credits to each student (negative to take away). Balances
    /// never drop below zero.
    pub async fn give_grace_credits(&self, student_ids: &[StudentId], amount: i32) -> BulkOutcome {
        let mut outcome = BulkOutcome::default();
        for student_id in student_ids {
            let result = self.adjust_grace_credits(student_id, amount).await;
            outcome.record(*student_id, result);
        }
        outcome
    }

    async fn adjust_grace_credits(
        &self,
        student_id: &StudentId,
        amount: i32,
    ) -> Result<(), StoreError> {
        let student = self.store.get_student(student_id).await?;
        let credits = student.grace_credits.saturating_add(amount).max(0);
        self.store.set_grace_credits(student_id, credits).await
    }

    /// Credits left after every grace-period deduction the student has taken.
    ///
    /// Summed as `i64` so any number of `i32` deductions fits.
    pub async fn remaining_grace_credits(&self, student_id: &StudentId) -> Result<i64, StoreError> {
        let student = self.store.get_student(student_id).await?;
        let used: i64 = self
            .store
            .list_grace_deductions(student_id)
            .await?
            .iter()
            .map(|d| i64::from(d.deduction))
            .sum();
        Ok(i64::from(student.grace_credits) - used)
    }
}
