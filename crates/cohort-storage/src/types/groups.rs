//! Group and grouping types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AssessmentId, GroupId, GroupingId};

/// Group record
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub repository_name: String,
    /// Set when creating the repository collided with an existing one.
    pub repository_error: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A group row ready for insertion. The id comes from
/// [`crate::Store::reserve_group_id`].
#[derive(Clone, Debug)]
pub struct NewGroup {
    pub id: GroupId,
    pub name: String,
    pub repository_name: String,
}

/// Group x assessment junction
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grouping {
    pub id: GroupingId,
    pub group_id: GroupId,
    pub assessment_id: AssessmentId,
    pub created_at: DateTime<Utc>,
}
