//! Group naming rules.

use cohort_storage::GroupId;

use crate::ValidationError;

pub const AUTOGENERATED_PREFIX: &str = "group_";
pub const MAX_GROUP_NAME_LEN: usize = 30;

/// Name given to anonymous groups: the prefix followed by the id padded to four digits.
/// Wider ids are printed in full.
pub fn autogenerated_name(id: GroupId) -> String {
    format!("{}{:04}", AUTOGENERATED_PREFIX, id.0)
}

pub fn validate_group_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::EmptyName);
    }
    if name.chars().count() > MAX_GROUP_NAME_LEN {
        return Err(ValidationError::NameTooLong {
            name: name.to_string(),
            max: MAX_GROUP_NAME_LEN,
        });
    }
    Ok(())
}
