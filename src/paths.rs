/// Resolve the taskline database path.
/// Checks `TASKLINE_DB` env var, falls back to `$HOME/.taskline/taskline.db`.
pub fn db_path() -> String {
    std::env::var("TASKLINE_DB").unwrap_or_else(|_| {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
        format!("{home}/.taskline/taskline.db")
    })
}
