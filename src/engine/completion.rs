use std::collections::{HashMap, HashSet};

use crate::model::Task;
use crate::tree::TaskTree;

/// Compute a 0..=100 completion percentage for every task in the input.
///
/// Leaves compare worked against estimated hours; parents take the weighted
/// average of their children's percentages, weighted by each child's
/// estimated hours, falling back to an unweighted mean when no child carries
/// a positive estimate. Memoization is scoped to this call, and a task
/// revisited while its own percentage is being computed (a parent cycle)
/// counts as 0 rather than recursing without bound.
pub fn compute_completion(tasks: &[Task]) -> HashMap<i64, u8> {
    let tree = TaskTree::new(tasks);
    let mut memo = HashMap::new();
    for t in tasks {
        let mut visiting = HashSet::new();
        percentage(&tree, t.id, &mut memo, &mut visiting);
    }
    memo
}

fn percentage(
    tree: &TaskTree,
    id: i64,
    memo: &mut HashMap<i64, u8>,
    visiting: &mut HashSet<i64>,
) -> u8 {
    if let Some(&pct) = memo.get(&id) {
        return pct;
    }
    if !visiting.insert(id) {
        return 0;
    }

    let children = tree.children_of(id);
    let pct = if children.is_empty() {
        match tree.get(id) {
            Some(task) => leaf_percentage(task),
            None => 0,
        }
    } else {
        let mut weight_sum = 0.0;
        let mut weighted = 0.0;
        let mut plain_sum = 0.0;
        for &child in children {
            let child_pct = percentage(tree, child, memo, visiting) as f64;
            let weight = tree.get(child).map(|t| t.estimated_hours).unwrap_or(0.0);
            weight_sum += weight;
            weighted += child_pct * weight;
            plain_sum += child_pct;
        }
        let avg = if weight_sum > 0.0 {
            weighted / weight_sum
        } else {
            plain_sum / children.len() as f64
        };
        avg.round() as u8
    };

    visiting.remove(&id);
    memo.insert(id, pct);
    pct
}

fn leaf_percentage(task: &Task) -> u8 {
    if task.estimated_hours <= 0.0 {
        if task.worked_hours > 0.0 {
            100
        } else {
            0
        }
    } else {
        let pct = (100.0 * task.worked_hours / task.estimated_hours).round();
        pct.min(100.0) as u8
    }
}
