//! Student types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{MembershipId, StudentId};

/// Student record
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub user_name: String,
    pub hidden: bool, // Hidden students cannot be invited
    pub grace_credits: i32,
    pub created_at: DateTime<Utc>,
}

/// Parameters for creating a student
#[derive(Clone, Debug)]
pub struct CreateStudentParams {
    pub user_name: String,
    pub grace_credits: i32,
}

/// Grace credits consumed by a membership's late submission
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GraceDeduction {
    pub membership_id: MembershipId,
    pub deduction: i32,
    pub created_at: DateTime<Utc>,
}
