//! Assessment and penalty-period types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::AssessmentId;

/// Assessment (assignment) record
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Assessment {
    pub id: AssessmentId,
    pub short_identifier: String,
    pub is_timed: bool,
    pub due_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Parameters for creating an assessment
#[derive(Clone, Debug)]
pub struct CreateAssessmentParams {
    pub short_identifier: String,
    pub is_timed: bool,
    pub due_date: DateTime<Utc>,
}

/// One tier of a penalty rule: once `hours` of overtime are entered,
/// `deduction` percent is charged in full.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeductionPeriod {
    pub hours: f64,
    pub deduction: f64,
}

impl DeductionPeriod {
    pub fn new(hours: f64, deduction: f64) -> Self {
        Self { hours, deduction }
    }
}
