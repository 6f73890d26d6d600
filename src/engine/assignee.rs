use std::collections::HashMap;

use chrono::NaiveDate;

use crate::model::{Allocation, AssigneeChange, Task};
use crate::tree::{TaskTree, MAX_ANCESTOR_HOPS};

/// Resolve every task's planned user from the nearest ancestor (itself
/// included) carrying a scheduling allocation, and return the tasks whose
/// current assignee disagrees.
///
/// When a task holds several allocations, the one with the earliest
/// `(date, id)` decides the user. Walks up the parent chain are capped at
/// [`MAX_ANCESTOR_HOPS`]; a walk that runs out of hops, or finds no
/// allocated ancestor, resolves to no planned user and reports nothing.
pub fn resolve_planned_assignees(
    tasks: &[Task],
    allocations: &[Allocation],
) -> Vec<AssigneeChange> {
    let tree = TaskTree::new(tasks);

    // For each allocated task, the user its earliest allocation names.
    let mut allocated: HashMap<i64, (NaiveDate, i64, i64)> = HashMap::new();
    for a in allocations {
        match allocated.get(&a.task_id) {
            Some(&(date, id, _)) if (date, id) <= (a.date, a.id) => {}
            _ => {
                allocated.insert(a.task_id, (a.date, a.id, a.user_id));
            }
        }
    }

    let mut changes = Vec::new();
    for task in tasks {
        let Some(planned) = planned_user(&tree, task.id, &allocated) else {
            continue;
        };
        if task.assigned_user_id != Some(planned) {
            changes.push(AssigneeChange {
                task_id: task.id,
                old_user: task.assigned_user_id,
                new_user: planned,
            });
        }
    }
    changes
}

fn planned_user(
    tree: &TaskTree,
    id: i64,
    allocated: &HashMap<i64, (NaiveDate, i64, i64)>,
) -> Option<i64> {
    let mut current = id;
    for _ in 0..=MAX_ANCESTOR_HOPS {
        if let Some(&(_, _, user)) = allocated.get(&current) {
            return Some(user);
        }
        current = tree.parent_of(current)?;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: i64, parent: Option<i64>, assignee: Option<i64>) -> Task {
        Task {
            id,
            project_id: 1,
            parent_id: parent,
            title: format!("task {id}"),
            status_id: 1,
            assigned_user_id: assignee,
            estimated_hours: 0.0,
            worked_hours: 0.0,
            planned_start: None,
            planned_end: None,
            created_at: "2025-01-01T00:00:00Z".to_string(),
            updated_at: "2025-01-01T00:00:00Z".to_string(),
        }
    }

    fn alloc(id: i64, task_id: i64, user_id: i64, date: &str) -> Allocation {
        Allocation {
            id,
            task_id,
            user_id,
            date: date.parse().unwrap(),
            hours: 4.0,
        }
    }

    #[test]
    fn inherits_from_allocated_root() {
        // C under B under A; only A is allocated, to user 7.
        let tasks = vec![task(1, None, None), task(2, Some(1), None), task(3, Some(2), None)];
        let allocations = vec![alloc(1, 1, 7, "2025-03-01")];
        let changes = resolve_planned_assignees(&tasks, &allocations);
        assert_eq!(changes.len(), 3);
        assert!(changes.iter().all(|c| c.new_user == 7));
    }

    #[test]
    fn nearest_ancestor_wins() {
        // A allocated to 7, B (closer to C) allocated to 9.
        let tasks = vec![task(1, None, None), task(2, Some(1), None), task(3, Some(2), None)];
        let allocations = vec![alloc(1, 1, 7, "2025-03-01"), alloc(2, 2, 9, "2025-03-05")];
        let changes = resolve_planned_assignees(&tasks, &allocations);
        let c = changes.iter().find(|c| c.task_id == 3).unwrap();
        assert_eq!(c.new_user, 9);
    }

    #[test]
    fn earliest_allocation_on_a_task_decides() {
        let tasks = vec![task(1, None, None)];
        let allocations = vec![alloc(2, 1, 9, "2025-03-05"), alloc(1, 1, 7, "2025-03-01")];
        let changes = resolve_planned_assignees(&tasks, &allocations);
        assert_eq!(changes[0].new_user, 7);
    }

    #[test]
    fn matching_assignee_is_not_reported() {
        let tasks = vec![task(1, None, Some(7)), task(2, Some(1), None)];
        let allocations = vec![alloc(1, 1, 7, "2025-03-01")];
        let changes = resolve_planned_assignees(&tasks, &allocations);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].task_id, 2);
        assert_eq!(changes[0].old_user, None);
    }

    #[test]
    fn mismatched_assignee_is_reported() {
        let tasks = vec![task(1, None, Some(3))];
        let allocations = vec![alloc(1, 1, 7, "2025-03-01")];
        let changes = resolve_planned_assignees(&tasks, &allocations);
        assert_eq!(
            changes,
            vec![AssigneeChange {
                task_id: 1,
                old_user: Some(3),
                new_user: 7
            }]
        );
    }

    #[test]
    fn no_allocated_ancestor_means_no_change() {
        let tasks = vec![task(1, None, Some(3)), task(2, Some(1), None)];
        assert!(resolve_planned_assignees(&tasks, &[]).is_empty());
    }

    #[test]
    fn walk_past_cap_yields_no_planned_user() {
        // A chain deeper than the hop cap with the allocation at the root.
        let depth = MAX_ANCESTOR_HOPS as i64 + 5;
        let mut tasks = vec![task(1, None, None)];
        for id in 2..=depth {
            tasks.push(task(id, Some(id - 1), None));
        }
        let allocations = vec![alloc(1, 1, 7, "2025-03-01")];
        let changes = resolve_planned_assignees(&tasks, &allocations);
        // Tasks within reach of the root get user 7; the deepest ones resolve
        // to nothing and stay unreported.
        assert!(changes.iter().all(|c| c.new_user == 7));
        assert!(!changes.iter().any(|c| c.task_id == depth));
    }

    #[test]
    fn cycle_is_bounded() {
        let tasks = vec![task(1, Some(2), None), task(2, Some(1), None)];
        let allocations = vec![alloc(1, 3, 7, "2025-03-01")];
        let first = resolve_planned_assignees(&tasks, &allocations);
        let second = resolve_planned_assignees(&tasks, &allocations);
        assert_eq!(first, second);
        assert!(first.is_empty());
    }
}
