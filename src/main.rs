mod cli;

use std::collections::HashMap;

use anyhow::{Context, Result};
use clap::Parser;
use rusqlite::Connection;

use cli::{Cli, Command};
use taskline::model::Allocation;
use taskline::tree::TaskTree;
use taskline::{db, engine, output, paths, store};

fn resolve_db_path(cli_db: Option<String>) -> String {
    cli_db.unwrap_or_else(paths::db_path)
}

fn ensure_db_dir(db_path: &str) -> Result<()> {
    if let Some(parent) = std::path::Path::new(db_path).parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
    }
    Ok(())
}

fn open_db(db_path: &str) -> Result<Connection> {
    let conn = db::open(db_path)?;
    db::init(&conn)?;
    Ok(conn)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let db_path = resolve_db_path(cli.db);
    ensure_db_dir(&db_path)?;
    let conn = open_db(&db_path)?;
    dispatch(&conn, cli.command)
}

fn print_task_json(conn: &Connection, id: i64) -> Result<()> {
    let task = store::get_task(conn, id)?;
    let catalog = store::load_status_catalog(conn)?;
    let tasks = store::project_tasks(conn, task.project_id)?;
    let pct = engine::compute_completion(&tasks);
    let allocations = store::task_allocations(conn, id)?;
    let detail = output::TaskDetail {
        task: &task,
        status: catalog.name(task.status_id),
        completion_pct: pct.get(&id).copied().unwrap_or(0),
        allocations: &allocations,
    };
    println!("{}", serde_json::to_string_pretty(&detail)?);
    Ok(())
}

fn dispatch(conn: &Connection, command: Command) -> Result<()> {
    match command {
        Command::AddProject { name } => {
            let id = store::add_project(conn, &name)?;
            eprintln!("Added project '{name}' (#{id})");
        }

        Command::Projects => {
            for p in store::list_projects(conn)? {
                println!("#{} {}", p.id, p.name);
            }
        }

        Command::Statuses => {
            let catalog = store::load_status_catalog(conn)?;
            print!("{}", output::format_status_catalog(&catalog));
        }

        Command::Add {
            project,
            title,
            parent,
            estimate,
            start,
            end,
            json,
        } => {
            let project_id = store::project_id(conn, &project)?;
            let id = store::add_task(conn, project_id, parent, &title, estimate, start, end)?;
            if json {
                print_task_json(conn, id)?;
            }
            eprintln!("Added task #{id} '{title}'");
        }

        Command::List {
            project,
            tree,
            json,
        } => {
            let project_id = store::project_id(conn, &project)?;
            let tasks = store::project_tasks(conn, project_id)?;
            let catalog = store::load_status_catalog(conn)?;
            let pct = engine::compute_completion(&tasks);
            if json {
                let allocations = store::project_allocations(conn, project_id)?;
                let mut by_task: HashMap<i64, Vec<Allocation>> = HashMap::new();
                for a in allocations {
                    by_task.entry(a.task_id).or_default().push(a);
                }
                let details: Vec<output::TaskDetail> = tasks
                    .iter()
                    .map(|t| output::TaskDetail {
                        task: t,
                        status: catalog.name(t.status_id),
                        completion_pct: pct.get(&t.id).copied().unwrap_or(0),
                        allocations: by_task.get(&t.id).map(Vec::as_slice).unwrap_or(&[]),
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&details)?);
            } else if tree {
                print!("{}", output::format_task_tree(&tasks, &catalog, &pct));
            } else {
                print!("{}", output::format_task_list(&tasks, &catalog, &pct));
            }
        }

        Command::Show { id, json } => {
            if json {
                print_task_json(conn, id)?;
            } else {
                let task = store::get_task(conn, id)?;
                let catalog = store::load_status_catalog(conn)?;
                let tasks = store::project_tasks(conn, task.project_id)?;
                let pct = engine::compute_completion(&tasks);
                let tree = TaskTree::new(&tasks);
                let ancestors: Vec<_> = tree
                    .ancestors(id)
                    .into_iter()
                    .filter_map(|a| tree.get(a))
                    .collect();
                let allocations = store::task_allocations(conn, id)?;
                print!(
                    "{}",
                    output::format_task_detail(
                        &task,
                        &catalog,
                        pct.get(&id).copied().unwrap_or(0),
                        &allocations,
                        &ancestors,
                    )
                );
            }
        }

        Command::Rename { id, title } => {
            store::set_title(conn, id, &title)?;
            eprintln!("Renamed task #{id} to '{title}'");
        }

        Command::Estimate { id, hours } => {
            store::set_estimate(conn, id, hours)?;
            eprintln!("Set estimate of task #{id} to {hours}h");
        }

        Command::Log { id, hours } => {
            store::log_work(conn, id, hours)?;
            eprintln!("Logged {hours}h on task #{id}");
        }

        Command::Status { id, status } => {
            let status_id = store::status_id_by_name(conn, &status)?;
            store::set_status(conn, id, status_id)?;
            eprintln!("Set status of task #{id} to '{status}'");
        }

        Command::Assign { id, user } => {
            store::assign(conn, id, user)?;
            match user {
                Some(u) => eprintln!("Assigned task #{id} to user {u}"),
                None => eprintln!("Unassigned task #{id}"),
            }
        }

        Command::Schedule { id, start, end } => {
            store::set_planned_dates(conn, id, start, end)?;
            eprintln!("Updated planned dates of task #{id}");
        }

        Command::Reparent { id, parent } => {
            store::reparent_task(conn, id, parent)?;
            match parent {
                Some(p) => eprintln!("Moved task #{id} under #{p}"),
                None => eprintln!("Moved task #{id} to root level"),
            }
        }

        Command::Remove { id, recursive } => {
            store::remove_task(conn, id, recursive)?;
            eprintln!("Removed task #{id}");
        }

        Command::Allocate {
            task,
            user,
            date,
            hours,
        } => {
            store::allocate(conn, task, user, date, hours)?;
            eprintln!("Allocated user {user} to task #{task} on {date} for {hours}h");
        }

        Command::Deallocate { task, user, date } => {
            store::remove_allocation(conn, task, user, date)?;
            eprintln!("Removed allocation of user {user} on task #{task} for {date}");
        }

        Command::Rollup {
            project,
            dry_run,
            json,
        } => {
            let project_id = store::project_id(conn, &project)?;
            let tasks = store::project_tasks(conn, project_id)?;
            let changes = engine::roll_up_estimated_hours(&tasks);
            if !dry_run {
                store::apply_hours_changes(conn, &changes)?;
            }
            if json {
                let report = output::ChangeReport {
                    applied: !dry_run,
                    hours: Some(&changes),
                    statuses: None,
                    assignees: None,
                };
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", output::format_hours_report(&changes));
            }
            report_summary(changes.len(), dry_run);
        }

        Command::SyncStatus {
            project,
            dry_run,
            json,
        } => {
            let project_id = store::project_id(conn, &project)?;
            let tasks = store::project_tasks(conn, project_id)?;
            let catalog = store::load_status_catalog(conn)?;
            let changes = engine::sync_status_from_children(&tasks, &catalog);
            if !dry_run {
                store::apply_status_changes(conn, &changes)?;
            }
            if json {
                let report = output::ChangeReport {
                    applied: !dry_run,
                    hours: None,
                    statuses: Some(&changes),
                    assignees: None,
                };
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", output::format_status_report(&changes, &catalog));
            }
            report_summary(changes.len(), dry_run);
        }

        Command::Plan {
            project,
            dry_run,
            json,
        } => {
            let project_id = store::project_id(conn, &project)?;
            let tasks = store::project_tasks(conn, project_id)?;
            let allocations = store::project_allocations(conn, project_id)?;
            let changes = engine::resolve_planned_assignees(&tasks, &allocations);
            if !dry_run {
                store::apply_assignee_changes(conn, &changes)?;
            }
            if json {
                let report = output::ChangeReport {
                    applied: !dry_run,
                    hours: None,
                    statuses: None,
                    assignees: Some(&changes),
                };
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", output::format_assignee_report(&changes));
            }
            report_summary(changes.len(), dry_run);
        }
    }
    Ok(())
}

fn report_summary(count: usize, dry_run: bool) {
    if count == 0 {
        eprintln!("Nothing to update");
    } else if dry_run {
        eprintln!("{count} task(s) would change");
    } else {
        eprintln!("{count} task(s) updated");
    }
}
