//! Membership types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{GroupingId, MembershipId, StudentId};

/// Standing of a student within a grouping.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipStatus {
    Pending,
    Accepted,
    /// Founding member; a flavour of `Accepted`.
    Inviter,
    Rejected,
}

impl MembershipStatus {
    /// Statuses that count as holding the grouping.
    pub const ACTIVE: [MembershipStatus; 2] = [MembershipStatus::Accepted, MembershipStatus::Inviter];

    /// Statuses from which a student may join.
    pub const JOINABLE: [MembershipStatus; 2] =
        [MembershipStatus::Pending, MembershipStatus::Rejected];

    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipStatus::Pending => "pending",
            MembershipStatus::Accepted => "accepted",
            MembershipStatus::Inviter => "inviter",
            MembershipStatus::Rejected => "rejected",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, MembershipStatus::Accepted | MembershipStatus::Inviter)
    }
}

impl std::fmt::Display for MembershipStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MembershipStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(MembershipStatus::Pending),
            "accepted" => Ok(MembershipStatus::Accepted),
            "inviter" => Ok(MembershipStatus::Inviter),
            "rejected" => Ok(MembershipStatus::Rejected),
            _ => Err(format!("Unknown membership status: {}", s)),
        }
    }
}

/// Membership record
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub id: MembershipId,
    pub student_id: StudentId,
    pub grouping_id: GroupingId,
    pub status: MembershipStatus,
    pub created_at: DateTime<Utc>,
}
