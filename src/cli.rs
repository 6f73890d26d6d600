use chrono::NaiveDate;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "taskline",
    about = "Project and task tracker with hierarchical roll-ups",
    version
)]
pub struct Cli {
    /// Path to the SQLite database [default: ~/.taskline/taskline.db]
    #[arg(long, env = "TASKLINE_DB", global = true)]
    pub db: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create a project
    #[command(name = "add-project")]
    AddProject {
        /// Project name
        name: String,
    },

    /// List projects
    Projects,

    /// List the status catalog
    Statuses,

    /// Add a task
    Add {
        /// Project name
        project: String,
        /// Task title
        title: String,
        /// Parent task id
        #[arg(short, long)]
        parent: Option<i64>,
        /// Estimated hours
        #[arg(short, long, default_value_t = 0.0)]
        estimate: f64,
        /// Planned start date (YYYY-MM-DD)
        #[arg(long)]
        start: Option<NaiveDate>,
        /// Planned end date (YYYY-MM-DD)
        #[arg(long)]
        end: Option<NaiveDate>,
        /// Output the created task as JSON
        #[arg(long)]
        json: bool,
    },

    /// List a project's tasks with completion percentages
    List {
        /// Project name
        project: String,
        /// Render as a tree
        #[arg(long)]
        tree: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one task
    Show {
        /// Task id
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Change a task's title
    Rename {
        /// Task id
        id: i64,
        /// New title
        title: String,
    },

    /// Set a task's estimated hours
    Estimate {
        /// Task id
        id: i64,
        /// New estimate in hours
        hours: f64,
    },

    /// Log worked hours against a task
    Log {
        /// Task id
        id: i64,
        /// Hours to add
        hours: f64,
    },

    /// Set a task's status by name
    Status {
        /// Task id
        id: i64,
        /// Status name (e.g. "In Progress")
        status: String,
    },

    /// Assign a task to a user (omit user to unassign)
    Assign {
        /// Task id
        id: i64,
        /// User id
        user: Option<i64>,
    },

    /// Set a task's planned start and end dates
    Schedule {
        /// Task id
        id: i64,
        /// Planned start date (YYYY-MM-DD)
        #[arg(long)]
        start: Option<NaiveDate>,
        /// Planned end date (YYYY-MM-DD)
        #[arg(long)]
        end: Option<NaiveDate>,
    },

    /// Change a task's parent
    Reparent {
        /// Task id
        id: i64,
        /// New parent task id (omit to make root-level)
        #[arg(short, long)]
        parent: Option<i64>,
    },

    /// Remove a task
    Remove {
        /// Task id
        id: i64,
        /// Also remove all descendants
        #[arg(long)]
        recursive: bool,
    },

    /// Allocate a user to a task for a date
    Allocate {
        /// Task id
        task: i64,
        /// User id
        user: i64,
        /// Date (YYYY-MM-DD)
        date: NaiveDate,
        /// Allocated hours
        hours: f64,
    },

    /// Remove an allocation
    Deallocate {
        /// Task id
        task: i64,
        /// User id
        user: i64,
        /// Date (YYYY-MM-DD)
        date: NaiveDate,
    },

    /// Recompute parent estimated hours from children
    Rollup {
        /// Project name
        project: String,
        /// Report changes without writing them
        #[arg(long)]
        dry_run: bool,
        /// Output the change set as JSON
        #[arg(long)]
        json: bool,
    },

    /// Derive parent statuses from children
    #[command(name = "sync-status")]
    SyncStatus {
        /// Project name
        project: String,
        /// Report changes without writing them
        #[arg(long)]
        dry_run: bool,
        /// Output the change set as JSON
        #[arg(long)]
        json: bool,
    },

    /// Resolve planned assignees from scheduling allocations
    Plan {
        /// Project name
        project: String,
        /// Report changes without writing them
        #[arg(long)]
        dry_run: bool,
        /// Output the change set as JSON
        #[arg(long)]
        json: bool,
    },
}
