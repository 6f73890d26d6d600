use std::collections::{HashMap, HashSet, VecDeque};

use crate::model::Task;

/// Cap on ancestor-chain walks so corrupt cyclic parent data terminates.
pub const MAX_ANCESTOR_HOPS: usize = 20;

/// In-memory index over one project's tasks: id lookups and a
/// parent-to-children map, built in a single pass over the input.
///
/// A `parent_id` pointing outside the input set (or at the task itself) is
/// ignored and the task is treated as a root, so a partial or corrupt fetch
/// still produces a locally consistent tree.
pub struct TaskTree<'a> {
    by_id: HashMap<i64, &'a Task>,
    children: HashMap<i64, Vec<i64>>,
    roots: Vec<i64>,
}

impl<'a> TaskTree<'a> {
    pub fn new(tasks: &'a [Task]) -> Self {
        let by_id: HashMap<i64, &Task> = tasks.iter().map(|t| (t.id, t)).collect();
        let mut children: HashMap<i64, Vec<i64>> = HashMap::new();
        let mut roots = Vec::new();
        for t in tasks {
            match t.parent_id {
                Some(p) if p != t.id && by_id.contains_key(&p) => {
                    children.entry(p).or_default().push(t.id);
                }
                _ => roots.push(t.id),
            }
        }
        for v in children.values_mut() {
            v.sort_unstable();
        }
        TaskTree {
            by_id,
            children,
            roots,
        }
    }

    pub fn get(&self, id: i64) -> Option<&'a Task> {
        self.by_id.get(&id).copied()
    }

    /// Roots in input order. Note a parent cycle has no root at all; callers
    /// that need every task iterate the input slice, not the roots.
    pub fn roots(&self) -> &[i64] {
        &self.roots
    }

    /// Child ids sorted ascending, for deterministic traversal.
    pub fn children_of(&self, id: i64) -> &[i64] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_children(&self, id: i64) -> bool {
        !self.children_of(id).is_empty()
    }

    /// The resolvable parent of `id`, if any.
    pub fn parent_of(&self, id: i64) -> Option<i64> {
        let task = self.get(id)?;
        let p = task.parent_id?;
        if p != id && self.by_id.contains_key(&p) {
            Some(p)
        } else {
            None
        }
    }

    /// Parent chain from `id` outward, excluding `id`, capped at
    /// [`MAX_ANCESTOR_HOPS`].
    pub fn ancestors(&self, id: i64) -> Vec<i64> {
        let mut chain = Vec::new();
        let mut current = id;
        while chain.len() < MAX_ANCESTOR_HOPS {
            match self.parent_of(current) {
                Some(p) => {
                    chain.push(p);
                    current = p;
                }
                None => break,
            }
        }
        chain
    }

    /// All descendant ids of `id`, breadth-first. Iterating the result in
    /// reverse visits children before their parents, which is the order a
    /// cascading delete needs.
    pub fn descendants(&self, id: i64) -> Vec<i64> {
        let mut result = Vec::new();
        let mut seen = HashSet::new();
        seen.insert(id);
        let mut queue = VecDeque::new();
        queue.push_back(id);
        while let Some(current) = queue.pop_front() {
            for &child in self.children_of(current) {
                if seen.insert(child) {
                    result.push(child);
                    queue.push_back(child);
                }
            }
        }
        result
    }

    /// Depth-from-leaves for every task: 0 for leaves, otherwise one more
    /// than the deepest child. Processing parents in ascending depth order
    /// guarantees children are finalized before their parent is visited.
    /// A task revisited while its own depth is being computed (a parent
    /// cycle) contributes 0 instead of recursing forever.
    pub fn depths_from_leaves(&self) -> HashMap<i64, usize> {
        let mut memo = HashMap::new();
        // Visit in id order so cyclic inputs resolve the same way every run.
        let mut ids: Vec<i64> = self.by_id.keys().copied().collect();
        ids.sort_unstable();
        for id in ids {
            let mut visiting = HashSet::new();
            self.depth_of(id, &mut memo, &mut visiting);
        }
        memo
    }

    fn depth_of(
        &self,
        id: i64,
        memo: &mut HashMap<i64, usize>,
        visiting: &mut HashSet<i64>,
    ) -> usize {
        if let Some(&d) = memo.get(&id) {
            return d;
        }
        if !visiting.insert(id) {
            return 0;
        }
        let kids = self.children_of(id);
        let depth = if kids.is_empty() {
            0
        } else {
            1 + kids
                .iter()
                .map(|&c| self.depth_of(c, memo, visiting))
                .max()
                .unwrap_or(0)
        };
        visiting.remove(&id);
        memo.insert(id, depth);
        depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: i64, parent: Option<i64>) -> Task {
        Task {
            id,
            project_id: 1,
            parent_id: parent,
            title: format!("task {id}"),
            status_id: 1,
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
    fn builds_children_and_roots() {
        let tasks = vec![task(1, None), task(2, Some(1)), task(3, Some(1)), task(4, None)];
        let tree = TaskTree::new(&tasks);
        assert_eq!(tree.roots(), &[1, 4]);
        assert_eq!(tree.children_of(1), &[2, 3]);
        assert!(tree.children_of(2).is_empty());
    }

    #[test]
    fn missing_parent_is_root() {
        let tasks = vec![task(1, Some(99)), task(2, Some(1))];
        let tree = TaskTree::new(&tasks);
        assert_eq!(tree.roots(), &[1]);
        assert_eq!(tree.parent_of(1), None);
        assert_eq!(tree.parent_of(2), Some(1));
    }

    #[test]
    fn self_parent_is_root() {
        let tasks = vec![task(1, Some(1))];
        let tree = TaskTree::new(&tasks);
        assert_eq!(tree.roots(), &[1]);
        assert!(tree.children_of(1).is_empty());
    }

    #[test]
    fn ancestors_walk_up() {
        let tasks = vec![task(1, None), task(2, Some(1)), task(3, Some(2))];
        let tree = TaskTree::new(&tasks);
        assert_eq!(tree.ancestors(3), vec![2, 1]);
        assert!(tree.ancestors(1).is_empty());
    }

    #[test]
    fn ancestors_bounded_on_cycle() {
        let tasks = vec![task(1, Some(2)), task(2, Some(1))];
        let tree = TaskTree::new(&tasks);
        let chain = tree.ancestors(1);
        assert_eq!(chain.len(), MAX_ANCESTOR_HOPS);
    }

    #[test]
    fn descendants_deepest_last() {
        let tasks = vec![task(1, None), task(2, Some(1)), task(3, Some(2)), task(4, Some(1))];
        let tree = TaskTree::new(&tasks);
        let descendants = tree.descendants(1);
        assert_eq!(descendants, vec![2, 4, 3]);
    }

    #[test]
    fn descendants_bounded_on_cycle() {
        let tasks = vec![task(1, Some(2)), task(2, Some(1)), task(3, Some(1))];
        let tree = TaskTree::new(&tasks);
        let descendants = tree.descendants(1);
        assert_eq!(descendants.len(), 2);
    }

    #[test]
    fn depths_multi_level() {
        let tasks = vec![task(1, None), task(2, Some(1)), task(3, Some(2)), task(4, Some(1))];
        let tree = TaskTree::new(&tasks);
        let depths = tree.depths_from_leaves();
        assert_eq!(depths[&3], 0);
        assert_eq!(depths[&4], 0);
        assert_eq!(depths[&2], 1);
        assert_eq!(depths[&1], 2);
    }

    #[test]
    fn depths_bounded_on_cycle() {
        let tasks = vec![task(1, Some(2)), task(2, Some(1))];
        let tree = TaskTree::new(&tasks);
        let depths = tree.depths_from_leaves();
        assert_eq!(depths.len(), 2);
    }
}
