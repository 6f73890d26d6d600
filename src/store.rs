//! Row-level reads and writes for tasks, projects, and allocations. The
//! aggregation passes never touch the database themselves; callers load rows
//! here, run a pass, and hand the resulting change set back to the
//! `apply_*_changes` functions.

use std::collections::HashSet;

use anyhow::{bail, Result};
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension};

use crate::model::{
    Allocation, AssigneeChange, HoursChange, Project, Status, StatusCatalog, StatusChange, Task,
};
use crate::tree::TaskTree;

const TASK_COLUMNS: &str = "id, project_id, parent_id, title, status_id, assigned_user_id, \
     estimated_hours, worked_hours, planned_start, planned_end, created_at, updated_at";

fn read_task_row(row: &rusqlite::Row) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get(0)?,
        project_id: row.get(1)?,
        parent_id: row.get(2)?,
        title: row.get(3)?,
        status_id: row.get(4)?,
        assigned_user_id: row.get(5)?,
        estimated_hours: row.get(6)?,
        worked_hours: row.get(7)?,
        planned_start: row.get(8)?,
        planned_end: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

fn task_exists(conn: &Connection, id: i64) -> Result<bool> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM tasks WHERE id = ?1", [id], |row| {
        row.get(0)
    })?;
    Ok(count > 0)
}

fn require_task(conn: &Connection, id: i64) -> Result<()> {
    if !task_exists(conn, id)? {
        bail!("task {id} not found");
    }
    Ok(())
}

// Projects

pub fn add_project(conn: &Connection, name: &str) -> Result<i64> {
    if name.trim().is_empty() {
        bail!("project name must not be empty");
    }
    conn.execute("INSERT INTO projects (name) VALUES (?1)", [name])?;
    Ok(conn.last_insert_rowid())
}

pub fn project_id(conn: &Connection, name: &str) -> Result<i64> {
    let id: Option<i64> = conn
        .query_row("SELECT id FROM projects WHERE name = ?1", [name], |row| {
            row.get(0)
        })
        .optional()?;
    match id {
        Some(id) => Ok(id),
        None => bail!("project '{name}' not found"),
    }
}

pub fn list_projects(conn: &Connection) -> Result<Vec<Project>> {
    let mut stmt = conn.prepare("SELECT id, name, created_at FROM projects ORDER BY id")?;
    let rows = stmt.query_map([], |row| {
        Ok(Project {
            id: row.get(0)?,
            name: row.get(1)?,
            created_at: row.get(2)?,
        })
    })?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
}

// Status catalog

pub fn load_status_catalog(conn: &Connection) -> Result<StatusCatalog> {
    let mut stmt = conn.prepare(
        "SELECT id, name, is_closed, is_cancelled, is_default FROM statuses ORDER BY id",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(Status {
            id: row.get(0)?,
            name: row.get(1)?,
            is_closed: row.get(2)?,
            is_cancelled: row.get(3)?,
            is_default: row.get(4)?,
        })
    })?;
    let statuses = rows.collect::<rusqlite::Result<Vec<_>>>()?;
    StatusCatalog::new(statuses)
}

pub fn status_id_by_name(conn: &Connection, name: &str) -> Result<i64> {
    let id: Option<i64> = conn
        .query_row("SELECT id FROM statuses WHERE name = ?1 COLLATE NOCASE", [name], |row| {
            row.get(0)
        })
        .optional()?;
    match id {
        Some(id) => Ok(id),
        None => bail!("status '{name}' not found"),
    }
}

// Task reads

pub fn get_task(conn: &Connection, id: i64) -> Result<Task> {
    require_task(conn, id)?;
    let query = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1");
    let task = conn.query_row(&query, [id], read_task_row)?;
    Ok(task)
}

pub fn project_tasks(conn: &Connection, project_id: i64) -> Result<Vec<Task>> {
    let query = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE project_id = ?1 ORDER BY id");
    let mut stmt = conn.prepare(&query)?;
    let rows = stmt.query_map([project_id], read_task_row)?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
}

pub fn project_allocations(conn: &Connection, project_id: i64) -> Result<Vec<Allocation>> {
    let mut stmt = conn.prepare(
        "SELECT a.id, a.task_id, a.user_id, a.date, a.hours
         FROM allocations a JOIN tasks t ON t.id = a.task_id
         WHERE t.project_id = ?1 ORDER BY a.id",
    )?;
    let rows = stmt.query_map([project_id], |row| {
        Ok(Allocation {
            id: row.get(0)?,
            task_id: row.get(1)?,
            user_id: row.get(2)?,
            date: row.get(3)?,
            hours: row.get(4)?,
        })
    })?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
}

pub fn task_allocations(conn: &Connection, task_id: i64) -> Result<Vec<Allocation>> {
    let mut stmt = conn.prepare(
        "SELECT id, task_id, user_id, date, hours FROM allocations
         WHERE task_id = ?1 ORDER BY date, id",
    )?;
    let rows = stmt.query_map([task_id], |row| {
        Ok(Allocation {
            id: row.get(0)?,
            task_id: row.get(1)?,
            user_id: row.get(2)?,
            date: row.get(3)?,
            hours: row.get(4)?,
        })
    })?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
}

// Task writes

const INSERT_TASK: &str = "
INSERT INTO tasks (project_id, parent_id, title, status_id, estimated_hours,
                   planned_start, planned_end)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
";

pub fn add_task(
    conn: &Connection,
    project: i64,
    parent: Option<i64>,
    title: &str,
    estimated_hours: f64,
    planned_start: Option<NaiveDate>,
    planned_end: Option<NaiveDate>,
) -> Result<i64> {
    if title.trim().is_empty() {
        bail!("task title must not be empty");
    }
    if estimated_hours < 0.0 {
        bail!("estimated hours must not be negative");
    }
    if let Some(p) = parent {
        let parent_project: Option<i64> = conn
            .query_row("SELECT project_id FROM tasks WHERE id = ?1", [p], |row| {
                row.get(0)
            })
            .optional()?;
        match parent_project {
            Some(pp) if pp == project => {}
            Some(_) => bail!("parent task {p} belongs to a different project"),
            None => bail!("parent task {p} not found"),
        }
    }
    let catalog = load_status_catalog(conn)?;
    conn.execute(
        INSERT_TASK,
        rusqlite::params![
            project,
            parent,
            title,
            catalog.not_started_id(),
            estimated_hours,
            planned_start,
            planned_end
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

const TOUCH: &str = "updated_at = strftime('%Y-%m-%dT%H:%M:%SZ', 'now')";

pub fn set_title(conn: &Connection, id: i64, title: &str) -> Result<()> {
    require_task(conn, id)?;
    if title.trim().is_empty() {
        bail!("task title must not be empty");
    }
    let sql = format!("UPDATE tasks SET title = ?1, {TOUCH} WHERE id = ?2");
    conn.execute(&sql, rusqlite::params![title, id])?;
    Ok(())
}

pub fn set_estimate(conn: &Connection, id: i64, hours: f64) -> Result<()> {
    require_task(conn, id)?;
    if hours < 0.0 {
        bail!("estimated hours must not be negative");
    }
    let sql = format!("UPDATE tasks SET estimated_hours = ?1, {TOUCH} WHERE id = ?2");
    conn.execute(&sql, rusqlite::params![hours, id])?;
    Ok(())
}

/// Add logged time to a task's own worked hours.
pub fn log_work(conn: &Connection, id: i64, hours: f64) -> Result<()> {
    require_task(conn, id)?;
    if hours <= 0.0 {
        bail!("logged hours must be positive");
    }
    let sql = format!("UPDATE tasks SET worked_hours = worked_hours + ?1, {TOUCH} WHERE id = ?2");
    conn.execute(&sql, rusqlite::params![hours, id])?;
    Ok(())
}

pub fn set_status(conn: &Connection, id: i64, status_id: i64) -> Result<()> {
    require_task(conn, id)?;
    let known: i64 = conn.query_row(
        "SELECT COUNT(*) FROM statuses WHERE id = ?1",
        [status_id],
        |row| row.get(0),
    )?;
    if known == 0 {
        bail!("status {status_id} not found");
    }
    let sql = format!("UPDATE tasks SET status_id = ?1, {TOUCH} WHERE id = ?2");
    conn.execute(&sql, rusqlite::params![status_id, id])?;
    Ok(())
}

pub fn assign(conn: &Connection, id: i64, user: Option<i64>) -> Result<()> {
    require_task(conn, id)?;
    let sql = format!("UPDATE tasks SET assigned_user_id = ?1, {TOUCH} WHERE id = ?2");
    conn.execute(&sql, rusqlite::params![user, id])?;
    Ok(())
}

pub fn set_planned_dates(
    conn: &Connection,
    id: i64,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<()> {
    require_task(conn, id)?;
    if let (Some(s), Some(e)) = (start, end) {
        if e < s {
            bail!("planned end date is before planned start date");
        }
    }
    let sql = format!("UPDATE tasks SET planned_start = ?1, planned_end = ?2, {TOUCH} WHERE id = ?3");
    conn.execute(&sql, rusqlite::params![start, end, id])?;
    Ok(())
}

/// Detect whether setting `id`'s parent to `new_parent` would create a cycle:
/// walk up from `new_parent` and see if the chain reaches `id`. A repeated
/// node means the stored chain is already cyclic; refuse the write then too.
fn creates_parent_cycle(conn: &Connection, id: i64, new_parent: i64) -> Result<bool> {
    if id == new_parent {
        return Ok(true);
    }
    let mut seen = HashSet::new();
    let mut current = Some(new_parent);
    while let Some(node) = current {
        if node == id || !seen.insert(node) {
            return Ok(true);
        }
        current = conn.query_row("SELECT parent_id FROM tasks WHERE id = ?1", [node], |row| {
            row.get(0)
        })?;
    }
    Ok(false)
}

pub fn reparent_task(conn: &Connection, id: i64, parent: Option<i64>) -> Result<()> {
    let task = get_task(conn, id)?;
    if let Some(new_parent) = parent {
        let parent_task = get_task(conn, new_parent)?;
        if parent_task.project_id != task.project_id {
            bail!("parent task {new_parent} belongs to a different project");
        }
        if creates_parent_cycle(conn, id, new_parent)? {
            bail!("setting parent to {new_parent} would create a cycle");
        }
    }
    let sql = format!("UPDATE tasks SET parent_id = ?1, {TOUCH} WHERE id = ?2");
    conn.execute(&sql, rusqlite::params![parent, id])?;
    Ok(())
}

/// Delete a task. With `recursive`, the project's tree is built and the
/// task's descendants are deleted deepest-first so no row ever points at a
/// missing parent; allocations cascade at the database level.
pub fn remove_task(conn: &Connection, id: i64, recursive: bool) -> Result<()> {
    let task = get_task(conn, id)?;
    if recursive {
        let tasks = project_tasks(conn, task.project_id)?;
        let tree = TaskTree::new(&tasks);
        for desc in tree.descendants(id).iter().rev() {
            conn.execute("DELETE FROM tasks WHERE id = ?1", [desc])?;
        }
        conn.execute("DELETE FROM tasks WHERE id = ?1", [id])?;
    } else {
        let child_count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM tasks WHERE parent_id = ?1",
            [id],
            |row| row.get(0),
        )?;
        if child_count > 0 {
            bail!("task {id} has children; use --recursive to remove");
        }
        conn.execute("DELETE FROM tasks WHERE id = ?1", [id])?;
    }
    Ok(())
}

// Allocations

pub fn allocate(
    conn: &Connection,
    task_id: i64,
    user_id: i64,
    date: NaiveDate,
    hours: f64,
) -> Result<()> {
    require_task(conn, task_id)?;
    if hours <= 0.0 {
        bail!("allocated hours must be positive");
    }
    conn.execute(
        "INSERT INTO allocations (task_id, user_id, date, hours) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT (task_id, user_id, date) DO UPDATE SET hours = excluded.hours",
        rusqlite::params![task_id, user_id, date, hours],
    )?;
    Ok(())
}

pub fn remove_allocation(
    conn: &Connection,
    task_id: i64,
    user_id: i64,
    date: NaiveDate,
) -> Result<()> {
    let changed = conn.execute(
        "DELETE FROM allocations WHERE task_id = ?1 AND user_id = ?2 AND date = ?3",
        rusqlite::params![task_id, user_id, date],
    )?;
    if changed == 0 {
        bail!("no allocation for task {task_id}, user {user_id} on {date}");
    }
    Ok(())
}

// Persisting engine output

pub fn apply_hours_changes(conn: &Connection, changes: &[HoursChange]) -> Result<()> {
    let sql = format!("UPDATE tasks SET estimated_hours = ?1, {TOUCH} WHERE id = ?2");
    for change in changes {
        conn.execute(&sql, rusqlite::params![change.new_hours, change.task_id])?;
    }
    Ok(())
}

pub fn apply_status_changes(conn: &Connection, changes: &[StatusChange]) -> Result<()> {
    let sql = format!("UPDATE tasks SET status_id = ?1, {TOUCH} WHERE id = ?2");
    for change in changes {
        conn.execute(&sql, rusqlite::params![change.new_status, change.task_id])?;
    }
    Ok(())
}

pub fn apply_assignee_changes(conn: &Connection, changes: &[AssigneeChange]) -> Result<()> {
    let sql = format!("UPDATE tasks SET assigned_user_id = ?1, {TOUCH} WHERE id = ?2");
    for change in changes {
        conn.execute(&sql, rusqlite::params![change.new_user, change.task_id])?;
    }
    Ok(())
}
