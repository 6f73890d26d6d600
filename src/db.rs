use anyhow::Result;
use rusqlite::Connection;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS projects (
    id         INTEGER PRIMARY KEY,
    name       TEXT NOT NULL UNIQUE CHECK(length(name) > 0),
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
);

CREATE TABLE IF NOT EXISTS statuses (
    id           INTEGER PRIMARY KEY,
    name         TEXT NOT NULL UNIQUE CHECK(length(name) > 0),
    is_closed    INTEGER NOT NULL DEFAULT 0,
    is_cancelled INTEGER NOT NULL DEFAULT 0,
    is_default   INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS tasks (
    id               INTEGER PRIMARY KEY,
    project_id       INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    parent_id        INTEGER REFERENCES tasks(id) ON DELETE RESTRICT,
    title            TEXT NOT NULL CHECK(length(title) > 0),
    status_id        INTEGER NOT NULL REFERENCES statuses(id),
    assigned_user_id INTEGER,
    estimated_hours  REAL NOT NULL DEFAULT 0 CHECK(estimated_hours >= 0),
    worked_hours     REAL NOT NULL DEFAULT 0 CHECK(worked_hours >= 0),
    planned_start    TEXT,
    planned_end      TEXT,
    created_at       TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now')),
    updated_at       TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
);

CREATE INDEX IF NOT EXISTS tasks_project ON tasks(project_id);
CREATE INDEX IF NOT EXISTS tasks_parent ON tasks(parent_id);

CREATE TABLE IF NOT EXISTS allocations (
    id      INTEGER PRIMARY KEY,
    task_id INTEGER NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
    user_id INTEGER NOT NULL,
    date    TEXT NOT NULL,
    hours   REAL NOT NULL CHECK(hours > 0),
    UNIQUE (task_id, user_id, date)
);
";

/// Statuses seeded into an empty catalog: (name, is_closed, is_cancelled, is_default).
const DEFAULT_STATUSES: &[(&str, bool, bool, bool)] = &[
    ("Not Started", false, false, true),
    ("In Progress", false, false, false),
    ("Done", true, false, false),
    ("Cancelled", false, true, false),
];

fn set_pragmas(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;",
    )?;
    Ok(())
}

pub fn open(path: &str) -> Result<Connection> {
    let conn = Connection::open(path)?;
    set_pragmas(&conn)?;
    Ok(conn)
}

pub fn init(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM statuses", [], |row| row.get(0))?;
    if count == 0 {
        for (name, closed, cancelled, default) in DEFAULT_STATUSES {
            conn.execute(
                "INSERT INTO statuses (name, is_closed, is_cancelled, is_default)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![name, closed, cancelled, default],
            )?;
        }
    }
    Ok(())
}

#[cfg(test)]
pub fn open_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    set_pragmas(&conn)?;
    init(&conn)?;
    Ok(conn)
}
