use std::collections::HashMap;

use serde::Serialize;

use crate::model::{
    Allocation, AssigneeChange, HoursChange, StatusCatalog, StatusChange, Task,
};
use crate::tree::TaskTree;

/// JSON shape for a single task plus its derived and related data.
#[derive(Serialize)]
pub struct TaskDetail<'a> {
    #[serde(flatten)]
    pub task: &'a Task,
    pub status: &'a str,
    pub completion_pct: u8,
    pub allocations: &'a [Allocation],
}

/// JSON shape for the output of the three bulk passes.
#[derive(Serialize)]
pub struct ChangeReport<'a> {
    pub applied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hours: Option<&'a [HoursChange]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statuses: Option<&'a [StatusChange]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignees: Option<&'a [AssigneeChange]>,
}

fn task_line(task: &Task, catalog: &StatusCatalog, pct: &HashMap<i64, u8>) -> String {
    let assignee = task
        .assigned_user_id
        .map(|u| format!("  @{u}"))
        .unwrap_or_default();
    format!(
        "#{} {}  [{}] {:.1}/{:.1}h {}%{}",
        task.id,
        task.title,
        catalog.name(task.status_id),
        task.worked_hours,
        task.estimated_hours,
        pct.get(&task.id).copied().unwrap_or(0),
        assignee,
    )
}

pub fn format_task_detail(
    task: &Task,
    catalog: &StatusCatalog,
    completion_pct: u8,
    allocations: &[Allocation],
    ancestors: &[&Task],
) -> String {
    let mut out = String::new();
    out.push_str(&format!("Task:       #{} {}\n", task.id, task.title));
    out.push_str(&format!("Status:     {}\n", catalog.name(task.status_id)));
    out.push_str(&format!("Completion: {completion_pct}%\n"));
    out.push_str(&format!(
        "Hours:      {:.1} worked / {:.1} estimated\n",
        task.worked_hours, task.estimated_hours
    ));
    if let Some(user) = task.assigned_user_id {
        out.push_str(&format!("Assignee:   {user}\n"));
    }
    if let Some(start) = task.planned_start {
        out.push_str(&format!("Planned:    {start}"));
        if let Some(end) = task.planned_end {
            out.push_str(&format!(" .. {end}"));
        }
        out.push('\n');
    }
    if !ancestors.is_empty() {
        let path: Vec<String> = ancestors
            .iter()
            .rev()
            .map(|t| format!("#{} {}", t.id, t.title))
            .collect();
        out.push_str(&format!("Under:      {}\n", path.join(" > ")));
    }
    out.push_str(&format!("Created:    {}\n", task.created_at));
    out.push_str(&format!("Updated:    {}\n", task.updated_at));
    if !allocations.is_empty() {
        out.push('\n');
        out.push_str("Allocations:\n");
        for a in allocations {
            out.push_str(&format!("  {}  user {}  {:.1}h\n", a.date, a.user_id, a.hours));
        }
    }
    out
}

pub fn format_task_list(
    tasks: &[Task],
    catalog: &StatusCatalog,
    pct: &HashMap<i64, u8>,
) -> String {
    let mut out = String::new();
    for task in tasks {
        out.push_str(&task_line(task, catalog, pct));
        out.push('\n');
    }
    out
}

pub fn format_task_tree(
    tasks: &[Task],
    catalog: &StatusCatalog,
    pct: &HashMap<i64, u8>,
) -> String {
    let tree = TaskTree::new(tasks);
    let mut out = String::new();
    for &root in tree.roots() {
        write_tree(&mut out, &tree, root, catalog, pct, "", "");
    }
    out
}

fn write_tree(
    out: &mut String,
    tree: &TaskTree,
    id: i64,
    catalog: &StatusCatalog,
    pct: &HashMap<i64, u8>,
    line_prefix: &str,
    child_prefix: &str,
) {
    let Some(task) = tree.get(id) else {
        return;
    };
    out.push_str(line_prefix);
    out.push_str(&task_line(task, catalog, pct));
    out.push('\n');

    let children = tree.children_of(id);
    for (i, &child) in children.iter().enumerate() {
        let is_last = i == children.len() - 1;
        let (connector, extension) = if is_last {
            ("└── ", "    ")
        } else {
            ("├── ", "│   ")
        };
        write_tree(
            out,
            tree,
            child,
            catalog,
            pct,
            &format!("{child_prefix}{connector}"),
            &format!("{child_prefix}{extension}"),
        );
    }
}

pub fn format_status_catalog(catalog: &StatusCatalog) -> String {
    let mut out = String::new();
    for s in catalog.statuses() {
        let mut flags = Vec::new();
        if s.is_default {
            flags.push("default");
        }
        if s.is_closed {
            flags.push("closed");
        }
        if s.is_cancelled {
            flags.push("cancelled");
        }
        let suffix = if flags.is_empty() {
            String::new()
        } else {
            format!("  ({})", flags.join(", "))
        };
        out.push_str(&format!("#{} {}{}\n", s.id, s.name, suffix));
    }
    out
}

pub fn format_hours_report(changes: &[HoursChange]) -> String {
    let mut out = String::new();
    for c in changes {
        out.push_str(&format!(
            "#{}  estimated {:.2}h -> {:.2}h\n",
            c.task_id, c.old_hours, c.new_hours
        ));
    }
    out
}

pub fn format_status_report(changes: &[StatusChange], catalog: &StatusCatalog) -> String {
    let mut out = String::new();
    for c in changes {
        out.push_str(&format!(
            "#{}  '{}' -> '{}'\n",
            c.task_id,
            catalog.name(c.old_status),
            catalog.name(c.new_status)
        ));
    }
    out
}

pub fn format_assignee_report(changes: &[AssigneeChange]) -> String {
    let mut out = String::new();
    for c in changes {
        let old = c
            .old_user
            .map(|u| u.to_string())
            .unwrap_or_else(|| "unassigned".to_string());
        out.push_str(&format!("#{}  {} -> {}\n", c.task_id, old, c.new_user));
    }
    out
}
