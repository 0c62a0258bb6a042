//! Submission, result and extra mark types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ExtraMarkId, GroupingId, ResultId, SubmissionId};

/// Submission record
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Submission {
    pub id: SubmissionId,
    pub grouping_id: GroupingId,
    pub revision_timestamp: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Grading result attached to a submission. The earliest one is the original.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MarkingResult {
    pub id: ResultId,
    pub submission_id: SubmissionId,
    pub created_at: DateTime<Utc>,
}

/// Unit an extra mark is expressed in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkUnit {
    Percentage,
    Points,
}

impl MarkUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarkUnit::Percentage => "percentage",
            MarkUnit::Points => "points",
        }
    }
}

impl std::str::FromStr for MarkUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "percentage" => Ok(MarkUnit::Percentage),
            "points" => Ok(MarkUnit::Points),
            _ => Err(format!("Unknown mark unit: {}", s)),
        }
    }
}

/// Bonus or penalty attached to a result
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExtraMark {
    pub id: ExtraMarkId,
    pub result_id: ResultId,
    pub amount: f64, // Negative for penalties
    pub unit: MarkUnit,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Parameters for creating an extra mark
#[derive(Clone, Debug)]
pub struct CreateExtraMarkParams {
    pub result_id: ResultId,
    pub amount: f64,
    pub unit: MarkUnit,
    pub description: String,
}
