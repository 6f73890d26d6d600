use std::collections::HashMap;

use crate::model::{HoursChange, Task};
use crate::tree::TaskTree;

/// Differences below this are floating-point drift, not a real change.
pub const HOURS_EPSILON: f64 = 0.01;

/// Recompute every parent's estimated hours as the sum of its direct
/// children's, bottom-up, and return the parents whose value actually moved.
///
/// Parents are processed in ascending depth-from-leaves order against a
/// working map of current values, so a grandparent sums its children's
/// freshly recomputed totals and the whole tree converges in a single pass.
/// Rerunning with no intervening mutation returns an empty change set.
pub fn roll_up_estimated_hours(tasks: &[Task]) -> Vec<HoursChange> {
    let tree = TaskTree::new(tasks);
    let depths = tree.depths_from_leaves();

    let mut parents: Vec<i64> = tasks
        .iter()
        .filter(|t| tree.has_children(t.id))
        .map(|t| t.id)
        .collect();
    parents.sort_by_key(|id| (depths.get(id).copied().unwrap_or(0), *id));

    let mut current: HashMap<i64, f64> = tasks
        .iter()
        .map(|t| (t.id, t.estimated_hours))
        .collect();

    let mut changes = Vec::new();
    for id in parents {
        let sum: f64 = tree
            .children_of(id)
            .iter()
            .map(|c| current.get(c).copied().unwrap_or(0.0))
            .sum();
        let old = current.get(&id).copied().unwrap_or(0.0);
        if (sum - old).abs() >= HOURS_EPSILON {
            changes.push(HoursChange {
                task_id: id,
                old_hours: old,
                new_hours: sum,
            });
        }
        current.insert(id, sum);
    }
    changes
}
