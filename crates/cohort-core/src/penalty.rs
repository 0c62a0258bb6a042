//! Grace-period penalties.
//!
//! A rule is an ordered list of periods. Each period that overtime reaches charges its
//! whole deduction; there is no proration inside a period.

use chrono::{DateTime, Duration, Utc};
use cohort_storage::{
    AssessmentId, CreateExtraMarkParams, DeductionPeriod, ExtraMark, MarkUnit, Store, Submission,
};
use std::sync::Arc;

use crate::{PenaltyError, RuleError};

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

fn as_hours(duration: Duration) -> f64 {
    duration.num_milliseconds() as f64 / MILLIS_PER_HOUR
}

/// Penalty percentage for `overtime` under `periods`.
pub fn compute_penalty(periods: &[DeductionPeriod], overtime: Duration) -> f64 {
    let mut remaining = as_hours(overtime);
    if remaining <= 0.0 {
        return 0.0;
    }

    let mut total = 0.0;
    for period in periods {
        total += period.deduction.abs();
        remaining -= period.hours;
        if remaining <= 0.0 {
            break;
        }
    }
    total
}

/// Time past the due date. Negative when `at` is before `due`.
pub fn overtime_between(due: DateTime<Utc>, at: DateTime<Utc>) -> Duration {
    at - due
}

/// A validated, ordered sequence of deduction periods.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GracePeriodRule {
    periods: Vec<DeductionPeriod>,
}

impl GracePeriodRule {
    pub fn new(periods: Vec<DeductionPeriod>) -> Result<Self, RuleError> {
        for (index, period) in periods.iter().enumerate() {
            if !period.hours.is_finite() || !period.deduction.is_finite() {
                return Err(RuleError::NonFinite { index });
            }
            if period.hours < 0.0 {
                return Err(RuleError::NegativeHours {
                    index,
                    hours: period.hours,
                });
            }
        }
        Ok(Self { periods })
    }

    pub fn periods(&self) -> &[DeductionPeriod] {
        &self.periods
    }

    /// Total hours covered by all periods.
    pub fn hours_sum(&self) -> f64 {
        self.periods.iter().map(|p| p.hours).sum()
    }

    /// Penalty charged once overtime runs past every period.
    pub fn maximum_penalty(&self) -> f64 {
        self.periods.iter().map(|p| p.deduction.abs()).sum()
    }

    pub fn penalty_for(&self, overtime: Duration) -> f64 {
        compute_penalty(&self.periods, overtime)
    }
}

/// Applies grace-period rules to submissions and records the resulting extra marks.
pub struct PenaltyEngine<S: Store> {
    store: Arc<S>,
}

impl<S: Store> PenaltyEngine<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Store `rule` as the assessment's penalty periods, replacing any previous ones.
    pub async fn configure(
        &self,
        assessment_id: &AssessmentId,
        rule: &GracePeriodRule,
    ) -> Result<(), PenaltyError> {
        self.store
            .set_penalty_periods(assessment_id, rule.periods())
            .await?;
        Ok(())
    }

    pub async fn rule(&self, assessment_id: &AssessmentId) -> Result<GracePeriodRule, PenaltyError> {
        let periods = self.store.list_penalty_periods(assessment_id).await?;
        Ok(GracePeriodRule::new(periods)?)
    }

    /// Record a penalty for `submission` if `overtime` earns one.
    ///
    /// The extra mark goes on the submission's original result. Calling this twice
    /// records two marks.
    pub async fn apply_penalty(
        &self,
        submission: &Submission,
        overtime: Duration,
        periods: &[DeductionPeriod],
    ) -> Result<Option<ExtraMark>, PenaltyError> {
        let penalty = compute_penalty(periods, overtime);
        if penalty <= 0.0 {
            return Ok(None);
        }

        let result = self.store.original_result(&submission.id).await?;
        let mark = self
            .store
            .create_extra_mark(&CreateExtraMarkParams {
                result_id: result.id,
                amount: -penalty,
                unit: MarkUnit::Percentage,
                description: format!(
                    "Late submission penalty: {:.2} hours late, {}% deducted",
                    as_hours(overtime),
                    penalty
                ),
            })
            .await?;

        tracing::info!(
            submission = submission.id.0,
            result = result.id.0,
            penalty,
            "Applied late submission penalty"
        );
        Ok(Some(mark))
    }

    /// Apply the assessment's stored rule using the submission's revision time.
    pub async fn apply_submission_rule(
        &self,
        submission: &Submission,
    ) -> Result<Option<ExtraMark>, PenaltyError> {
        let grouping = self.store.get_grouping(&submission.grouping_id).await?;
        let assessment = self.store.get_assessment(&grouping.assessment_id).await?;
        let rule = self.rule(&assessment.id).await?;
        let overtime = overtime_between(assessment.due_date, submission.revision_timestamp);
        self.apply_penalty(submission, overtime, rule.periods()).await
    }

    /// Message telling students what submitting at `now` would cost them.
    pub async fn overtime_message(
        &self,
        assessment_id: &AssessmentId,
        now: DateTime<Utc>,
    ) -> Result<String, PenaltyError> {
        let assessment = self.store.get_assessment(assessment_id).await?;
        let rule = self.rule(assessment_id).await?;
        let penalty = rule.penalty_for(overtime_between(assessment.due_date, now));
        Ok(format!(
            "The due date has passed. Submitting now carries a {}% late penalty.",
            penalty
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn two_tiers() -> Vec<DeductionPeriod> {
        vec![DeductionPeriod::new(1.0, 10.0), DeductionPeriod::new(2.0, 20.0)]
    }

    #[test]
    fn penalty_by_overtime() {
        let periods = two_tiers();
        assert_eq!(compute_penalty(&periods, Duration::minutes(30)), 10.0);
        assert_eq!(compute_penalty(&periods, Duration::minutes(90)), 30.0);
        assert_eq!(compute_penalty(&periods, Duration::zero()), 0.0);
        assert_eq!(compute_penalty(&periods, Duration::hours(-1)), 0.0);
        assert_eq!(compute_penalty(&periods, Duration::hours(10)), 30.0);
    }

    #[test]
    fn tier_boundary_is_inclusive() {
        let periods = two_tiers();
        assert_eq!(compute_penalty(&periods, Duration::hours(1)), 10.0);
        assert_eq!(compute_penalty(&periods, Duration::hours(1) + Duration::seconds(1)), 30.0);
        assert_eq!(compute_penalty(&periods, Duration::hours(3)), 30.0);
    }

    #[test]
    fn negative_deductions_count_as_their_magnitude() {
        let periods = vec![DeductionPeriod::new(1.0, -5.0), DeductionPeriod::new(1.0, 15.0)];
        assert_eq!(compute_penalty(&periods, Duration::minutes(90)), 20.0);
    }

    #[test]
    fn no_periods_means_no_penalty() {
        assert_eq!(compute_penalty(&[], Duration::hours(5)), 0.0);
    }

    #[test]
    fn zero_hour_period_is_charged_and_stops() {
        let periods = vec![DeductionPeriod::new(0.0, 50.0), DeductionPeriod::new(1.0, 10.0)];
        assert_eq!(compute_penalty(&periods, Duration::minutes(1)), 60.0);
    }

    #[test]
    fn rule_rejects_negative_hours() {
        let err = GracePeriodRule::new(vec![
            DeductionPeriod::new(1.0, 10.0),
            DeductionPeriod::new(-2.0, 10.0),
        ])
        .unwrap_err();
        assert_eq!(err, RuleError::NegativeHours { index: 1, hours: -2.0 });
    }

    #[test]
    fn rule_rejects_non_finite_values() {
        assert_eq!(
            GracePeriodRule::new(vec![DeductionPeriod::new(f64::NAN, 10.0)]),
            Err(RuleError::NonFinite { index: 0 })
        );
        assert_eq!(
            GracePeriodRule::new(vec![DeductionPeriod::new(1.0, f64::INFINITY)]),
            Err(RuleError::NonFinite { index: 0 })
        );
    }

    #[test]
    fn rule_totals() {
        let rule = GracePeriodRule::new(two_tiers()).unwrap();
        assert_eq!(rule.hours_sum(), 3.0);
        assert_eq!(rule.maximum_penalty(), 30.0);
        assert_eq!(rule.penalty_for(Duration::minutes(30)), 10.0);
    }

    #[test]
    fn overtime_is_signed() {
        let due = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2024, 3, 1, 13, 30, 0).unwrap();
        assert_eq!(overtime_between(due, late), Duration::minutes(90));
        assert_eq!(overtime_between(late, due), Duration::minutes(-90));
    }
}
