//! Type definitions for cohort storage.

mod assessments;
mod groups;
mod ids;
mod marks;
mod memberships;
mod students;

// Re-export all types from submodules
pub use assessments::*;
pub use groups::*;
pub use ids::*;
pub use marks::*;
pub use memberships::*;
pub use students::*;
