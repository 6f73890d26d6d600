//! End-to-end run over a file-backed database: build a small project tree,
//! then drive all three bulk passes through load, apply, and reload.

use taskline::{db, engine, store};

#[test]
fn full_cycle_over_project_tree() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("taskline.db");
    let conn = db::open(path.to_str().unwrap()).unwrap();
    db::init(&conn).unwrap();

    let project = store::add_project(&conn, "launch").unwrap();
    let root = store::add_task(&conn, project, None, "release", 0.0, None, None).unwrap();
    let build = store::add_task(&conn, project, Some(root), "build", 0.0, None, None).unwrap();
    let code = store::add_task(&conn, project, Some(build), "code", 6.0, None, None).unwrap();
    let test = store::add_task(&conn, project, Some(build), "test", 2.0, None, None).unwrap();
    let docs = store::add_task(&conn, project, Some(root), "docs", 4.0, None, None).unwrap();

    store::log_work(&conn, code, 3.0).unwrap();
    store::allocate(&conn, root, 7, "2025-03-01".parse().unwrap(), 8.0).unwrap();

    // Estimated-hours roll-up converges over all three levels in one pass.
    let tasks = store::project_tasks(&conn, project).unwrap();
    let changes = engine::roll_up_estimated_hours(&tasks);
    assert_eq!(changes.len(), 2);
    store::apply_hours_changes(&conn, &changes).unwrap();
    assert_eq!(store::get_task(&conn, build).unwrap().estimated_hours, 8.0);
    assert_eq!(store::get_task(&conn, root).unwrap().estimated_hours, 12.0);

    let tasks = store::project_tasks(&conn, project).unwrap();
    assert!(engine::roll_up_estimated_hours(&tasks).is_empty());

    // Completion reflects the persisted roll-up.
    let pct = engine::compute_completion(&tasks);
    assert_eq!(pct[&code], 50);
    assert_eq!(pct[&test], 0);
    assert_eq!(pct[&build], 38); // (50*6 + 0*2) / 8
    assert_eq!(pct[&root], 25); // (38*8 + 0*4) / 12

    // Closing the leaves rolls 'build' to done and starts 'release'.
    let catalog = store::load_status_catalog(&conn).unwrap();
    store::set_status(&conn, code, catalog.closed_id()).unwrap();
    store::set_status(&conn, test, catalog.closed_id()).unwrap();
    let tasks = store::project_tasks(&conn, project).unwrap();
    let changes = engine::sync_status_from_children(&tasks, &catalog);
    store::apply_status_changes(&conn, &changes).unwrap();
    assert_eq!(store::get_task(&conn, build).unwrap().status_id, catalog.closed_id());
    assert_eq!(
        store::get_task(&conn, root).unwrap().status_id,
        catalog.in_progress_id()
    );

    // The allocation on the root plans user 7 for the whole subtree.
    let tasks = store::project_tasks(&conn, project).unwrap();
    let allocations = store::project_allocations(&conn, project).unwrap();
    let changes = engine::resolve_planned_assignees(&tasks, &allocations);
    assert_eq!(changes.len(), 5);
    store::apply_assignee_changes(&conn, &changes).unwrap();
    for id in [root, build, code, test, docs] {
        assert_eq!(store::get_task(&conn, id).unwrap().assigned_user_id, Some(7));
    }

    // Everything is settled; a second sweep writes nothing.
    let tasks = store::project_tasks(&conn, project).unwrap();
    let allocations = store::project_allocations(&conn, project).unwrap();
    assert!(engine::roll_up_estimated_hours(&tasks).is_empty());
    assert!(engine::sync_status_from_children(&tasks, &catalog).is_empty());
    assert!(engine::resolve_planned_assignees(&tasks, &allocations).is_empty());
}
