use anyhow::{bail, Result};
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub created_at: String,
}

/// One row of the status catalog.
#[derive(Debug, Clone, Serialize)]
pub struct Status {
    pub id: i64,
    pub name: String,
    pub is_closed: bool,
    pub is_cancelled: bool,
    pub is_default: bool,
}

/// Broad category a status falls into, derived from its flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCategory {
    NotStarted,
    InProgress,
    Closed,
    Cancelled,
}

/// The full status catalog plus its three designated rows: the canonical
/// "not started" status (the default row), the "in progress" status parents
/// roll into when any child has begun, and the "closed" status they roll
/// into when every child is closed.
#[derive(Debug, Clone)]
pub struct StatusCatalog {
    statuses: Vec<Status>,
    not_started: i64,
    in_progress: i64,
    closed: i64,
}

impl StatusCatalog {
    pub fn new(statuses: Vec<Status>) -> Result<Self> {
        let Some(not_started) = statuses.iter().find(|s| s.is_default) else {
            bail!("status catalog has no default (not-started) status");
        };
        let Some(closed) = statuses.iter().find(|s| s.is_closed && !s.is_cancelled) else {
            bail!("status catalog has no closed status");
        };
        let Some(in_progress) = statuses
            .iter()
            .find(|s| !s.is_closed && !s.is_cancelled && !s.is_default)
        else {
            bail!("status catalog has no in-progress status");
        };
        let (not_started, in_progress, closed) = (not_started.id, in_progress.id, closed.id);
        Ok(Self {
            statuses,
            not_started,
            in_progress,
            closed,
        })
    }

    pub fn get(&self, id: i64) -> Option<&Status> {
        self.statuses.iter().find(|s| s.id == id)
    }

    pub fn name(&self, id: i64) -> &str {
        self.get(id).map(|s| s.name.as_str()).unwrap_or("?")
    }

    /// An id not present in the catalog categorizes as in-progress, so that
    /// stray rows never let a parent roll to closed or not-started.
    pub fn category(&self, id: i64) -> StatusCategory {
        match self.get(id) {
            Some(s) if s.is_cancelled => StatusCategory::Cancelled,
            Some(s) if s.is_closed => StatusCategory::Closed,
            Some(s) if s.is_default => StatusCategory::NotStarted,
            _ => StatusCategory::InProgress,
        }
    }

    pub fn not_started_id(&self) -> i64 {
        self.not_started
    }

    pub fn in_progress_id(&self) -> i64 {
        self.in_progress
    }

    pub fn closed_id(&self) -> i64 {
        self.closed
    }

    pub fn statuses(&self) -> &[Status] {
        &self.statuses
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Task {
    pub id: i64,
    pub project_id: i64,
    pub parent_id: Option<i64>,
    pub title: String,
    pub status_id: i64,
    pub assigned_user_id: Option<i64>,
    pub estimated_hours: f64,
    pub worked_hours: f64,
    pub planned_start: Option<NaiveDate>,
    pub planned_end: Option<NaiveDate>,
    pub created_at: String,
    pub updated_at: String,
}

/// A planned assignment of a user to a task on a specific date.
#[derive(Debug, Clone, Serialize)]
pub struct Allocation {
    pub id: i64,
    pub task_id: i64,
    pub user_id: i64,
    pub date: NaiveDate,
    pub hours: f64,
}

/// A parent whose estimated hours were recomputed from its children.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoursChange {
    pub task_id: i64,
    pub old_hours: f64,
    pub new_hours: f64,
}

/// A parent whose status was derived from its children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusChange {
    pub task_id: i64,
    pub old_status: i64,
    pub new_status: i64,
}

/// A task whose current assignee disagrees with its resolved planned user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssigneeChange {
    pub task_id: i64,
    pub old_user: Option<i64>,
    pub new_user: i64,
}
