//! The aggregation passes over one project's task tree. Each pass is a pure
//! function from in-memory rows to a change set; callers load rows through
//! the store and persist whatever came back.

pub mod assignee;
pub mod completion;
pub mod hours;
pub mod status;

pub use assignee::resolve_planned_assignees;
pub use completion::compute_completion;
pub use hours::{roll_up_estimated_hours, HOURS_EPSILON};
pub use status::sync_status_from_children;

pub use crate::tree::MAX_ANCESTOR_HOPS;
