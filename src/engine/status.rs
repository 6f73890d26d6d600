use std::collections::HashMap;

use crate::model::{StatusCatalog, StatusCategory, StatusChange, Task};
use crate::tree::TaskTree;

/// Derive every parent's status from its children and return the parents
/// whose status would change.
///
/// Precedence: all children closed wins, then any child with work started
/// (in progress, or closed without the rest being closed), then all children
/// not started. Mixed cancelled/not-started sets match none of the rules and
/// leave the parent untouched. Parents are evaluated bottom-up
/// against a working status map, so closing every leaf settles grandparents
/// in the same pass.
pub fn sync_status_from_children(tasks: &[Task], catalog: &StatusCatalog) -> Vec<StatusChange> {
    let tree = TaskTree::new(tasks);
    let depths = tree.depths_from_leaves();

    let mut parents: Vec<i64> = tasks
        .iter()
        .filter(|t| tree.has_children(t.id))
        .map(|t| t.id)
        .collect();
    parents.sort_by_key(|id| (depths.get(id).copied().unwrap_or(0), *id));

    let mut current: HashMap<i64, i64> = tasks.iter().map(|t| (t.id, t.status_id)).collect();

    let mut changes = Vec::new();
    for id in parents {
        let categories: Vec<StatusCategory> = tree
            .children_of(id)
            .iter()
            .filter_map(|c| current.get(c).copied())
            .map(|status| catalog.category(status))
            .collect();
        let Some(candidate) = derive(&categories, catalog) else {
            continue;
        };
        let Some(&old) = current.get(&id) else {
            continue;
        };
        if candidate != old {
            changes.push(StatusChange {
                task_id: id,
                old_status: old,
                new_status: candidate,
            });
            current.insert(id, candidate);
        }
    }
    changes
}

fn derive(children: &[StatusCategory], catalog: &StatusCatalog) -> Option<i64> {
    if children.is_empty() {
        return None;
    }
    if children.iter().all(|c| *c == StatusCategory::Closed) {
        Some(catalog.closed_id())
    } else if children
        .iter()
        .any(|c| matches!(c, StatusCategory::InProgress | StatusCategory::Closed))
    {
        // Work has started somewhere below but is not all finished.
        Some(catalog.in_progress_id())
    } else if children.iter().all(|c| *c == StatusCategory::NotStarted) {
        Some(catalog.not_started_id())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Status;

    const NOT_STARTED: i64 = 1;
    const IN_PROGRESS: i64 = 2;
    const DONE: i64 = 3;
    const CANCELLED: i64 = 4;

    fn catalog() -> StatusCatalog {
        let row = |id: i64, name: &str, closed: bool, cancelled: bool, default: bool| Status {
            id,
            name: name.to_string(),
            is_closed: closed,
            is_cancelled: cancelled,
            is_default: default,
        };
        StatusCatalog::new(vec![
            row(NOT_STARTED, "Not Started", false, false, true),
            row(IN_PROGRESS, "In Progress", false, false, false),
            row(DONE, "Done", true, false, false),
            row(CANCELLED, "Cancelled", false, true, false),
        ])
        .unwrap()
    }

    fn task(id: i64, parent: Option<i64>, status: i64) -> Task {
        Task {
            id,
            project_id: 1,
            parent_id: parent,
            title: format!("task {id}"),
            status_id: status,
            assigned_user_id: None,
            estimated_hours: 0.0,
            worked_hours: 0.0,
            planned_start: None,
            planned_end: None,
            created_at: "2025-01-01T00:00:00Z".to_string(),
            updated_at: "2025-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn all_children_closed_closes_parent() {
        let tasks = vec![
            task(1, None, IN_PROGRESS),
            task(2, Some(1), DONE),
            task(3, Some(1), DONE),
        ];
        let changes = sync_status_from_children(&tasks, &catalog());
        assert_eq!(
            changes,
            vec![StatusChange {
                task_id: 1,
                old_status: IN_PROGRESS,
                new_status: DONE
            }]
        );
    }

    #[test]
    fn mixed_closed_and_not_started_is_in_progress() {
        let tasks = vec![
            task(1, None, NOT_STARTED),
            task(2, Some(1), DONE),
            task(3, Some(1), NOT_STARTED),
        ];
        let changes = sync_status_from_children(&tasks, &catalog());
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].new_status, IN_PROGRESS);
    }

    #[test]
    fn all_not_started_stays_put() {
        let tasks = vec![
            task(1, None, NOT_STARTED),
            task(2, Some(1), NOT_STARTED),
            task(3, Some(1), NOT_STARTED),
        ];
        assert!(sync_status_from_children(&tasks, &catalog()).is_empty());
    }

    #[test]
    fn all_not_started_resets_started_parent() {
        let tasks = vec![
            task(1, None, IN_PROGRESS),
            task(2, Some(1), NOT_STARTED),
            task(3, Some(1), NOT_STARTED),
        ];
        let changes = sync_status_from_children(&tasks, &catalog());
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].new_status, NOT_STARTED);
    }

    #[test]
    fn cancelled_mix_is_left_alone() {
        let tasks = vec![
            task(1, None, NOT_STARTED),
            task(2, Some(1), CANCELLED),
            task(3, Some(1), NOT_STARTED),
        ];
        assert!(sync_status_from_children(&tasks, &catalog()).is_empty());
    }

    #[test]
    fn closure_cascades_bottom_up() {
        // every leaf done: mid rolls to done, and root sees the *new* mid value.
        let tasks = vec![
            task(1, None, IN_PROGRESS),
            task(2, Some(1), IN_PROGRESS),
            task(3, Some(2), DONE),
            task(4, Some(2), DONE),
        ];
        let changes = sync_status_from_children(&tasks, &catalog());
        assert_eq!(changes.len(), 2);
        assert!(changes.iter().all(|c| c.new_status == DONE));
    }

    #[test]
    fn idempotent_when_settled() {
        let tasks = vec![task(1, None, DONE), task(2, Some(1), DONE)];
        assert!(sync_status_from_children(&tasks, &catalog()).is_empty());
    }

    #[test]
    fn cycle_is_bounded() {
        let tasks = vec![task(1, Some(2), DONE), task(2, Some(1), DONE)];
        let first = sync_status_from_children(&tasks, &catalog());
        let second = sync_status_from_children(&tasks, &catalog());
        assert_eq!(first, second);
    }
}
