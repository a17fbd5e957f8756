use anyhow::Result;
use pretty_assertions::assert_eq;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::tempdir;

use folder_wizard::Error;
use folder_wizard::events::{Discard, Event};
use folder_wizard::journal::OperationLog;
use folder_wizard::model::{MoveMode, OperationStatus};
use folder_wizard::mover::{MoveEngine, RunState};
use folder_wizard::rollback::RollbackEngine;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// Relative file path -> content for every file under `root`.
fn files(root: &Path) -> BTreeMap<PathBuf, String> {
    walkdir::WalkDir::new(root)
        .into_iter()
        .map(|e| e.unwrap())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let rel = e.path().strip_prefix(root).unwrap().to_path_buf();
            (rel, fs::read_to_string(e.path()).unwrap())
        })
        .collect()
}

fn dirs(root: &Path) -> BTreeSet<PathBuf> {
    walkdir::WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .map(|e| e.unwrap())
        .filter(|e| e.file_type().is_dir())
        .map(|e| e.path().strip_prefix(root).unwrap().to_path_buf())
        .collect()
}

fn down(delimiters: &[&str], remove: &[&str]) -> MoveMode {
    MoveMode::Downward {
        delimiters: delimiters.iter().map(|s| s.to_string()).collect(),
        remove: remove.iter().map(|s| s.to_string()).collect(),
    }
}

fn up(levels: usize, delete_empty: bool) -> MoveMode {
    MoveMode::Upward {
        levels,
        delete_empty,
    }
}

#[test]
fn downward_split_creates_nested_dirs() -> Result<()> {
    let tree = tempdir()?;
    let store = tempdir()?;
    let log = OperationLog::open(store.path())?;
    write(tree.path(), "2024_01_meeting.txt", "minutes");

    let report = MoveEngine::new(&log).run(tree.path(), &down(&["_"], &[]), &mut Discard)?;

    assert_eq!(report.state, RunState::Completed);
    assert_eq!(report.stats.moved_files, 1);
    assert_eq!(
        fs::read_to_string(tree.path().join("2024/01/meeting.txt"))?,
        "minutes"
    );
    let op = log.find(&report.operation_id)?;
    assert_eq!(op.status, OperationStatus::Completed);
    assert!(op.completed_at.is_some());
    assert_eq!(op.moves.len(), 1);
    assert!(op.moves[0].source.ends_with("2024_01_meeting.txt"));
    assert!(op.moves[0].destination.ends_with("2024/01/meeting.txt"));
    Ok(())
}

#[test]
fn downward_with_removal_skips_empty_fragment() -> Result<()> {
    let tree = tempdir()?;
    let store = tempdir()?;
    let log = OperationLog::open(store.path())?;
    write(tree.path(), "IMG_2024_01.jpg", "pixels");

    MoveEngine::new(&log).run(tree.path(), &down(&["_"], &["IMG"]), &mut Discard)?;

    assert_eq!(
        files(tree.path()).into_keys().collect::<Vec<_>>(),
        vec![PathBuf::from("2024/01.jpg")]
    );
    Ok(())
}

#[test]
fn upward_flattens_to_root_and_deletes_empty_dirs() -> Result<()> {
    let tree = tempdir()?;
    let store = tempdir()?;
    let log = OperationLog::open(store.path())?;
    write(tree.path(), "2024/01/file.txt", "a");
    write(tree.path(), "2024/02/other.txt", "b");
    write(tree.path(), "top.txt", "c");

    let report = MoveEngine::new(&log).run(tree.path(), &up(2, true), &mut Discard)?;

    assert_eq!(report.stats.total_files, 3);
    assert_eq!(report.stats.moved_files, 2);
    assert_eq!(report.stats.skipped_files, 1);
    assert_eq!(
        files(tree.path()).into_keys().collect::<Vec<_>>(),
        vec![
            PathBuf::from("file.txt"),
            PathBuf::from("other.txt"),
            PathBuf::from("top.txt")
        ]
    );
    assert!(dirs(tree.path()).is_empty());
    // In-place files never reach the log.
    assert_eq!(log.find(&report.operation_id)?.moves.len(), 2);
    Ok(())
}

#[test]
fn collisions_get_counter_suffixes_and_distinct_destinations() -> Result<()> {
    let tree = tempdir()?;
    let store = tempdir()?;
    let log = OperationLog::open(store.path())?;
    write(tree.path(), "x.txt", "root");
    write(tree.path(), "a/x.txt", "from a");
    write(tree.path(), "b/x.txt", "from b");

    let report = MoveEngine::new(&log).run(tree.path(), &up(1, false), &mut Discard)?;

    assert_eq!(fs::read_to_string(tree.path().join("x.txt"))?, "root");
    assert_eq!(fs::read_to_string(tree.path().join("x (1).txt"))?, "from a");
    assert_eq!(fs::read_to_string(tree.path().join("x (2).txt"))?, "from b");

    let op = log.find(&report.operation_id)?;
    let destinations: BTreeSet<_> = op.moves.iter().map(|m| m.destination.clone()).collect();
    assert_eq!(destinations.len(), op.moves.len());
    Ok(())
}

#[test]
fn rollback_restores_original_tree() -> Result<()> {
    let tree = tempdir()?;
    let store = tempdir()?;
    let log = OperationLog::open(store.path())?;
    write(tree.path(), "2023_12_a.txt", "1");
    write(tree.path(), "2023_12_b.txt", "2");
    write(tree.path(), "nested/2024_05_c.txt", "3");
    write(tree.path(), "plain.txt", "4");
    let before_files = files(tree.path());
    let before_dirs = dirs(tree.path());

    let report = MoveEngine::new(&log).run(tree.path(), &down(&["_"], &[]), &mut Discard)?;
    assert_eq!(report.stats.moved_files, 3);
    assert_ne!(files(tree.path()), before_files);

    let rollback = RollbackEngine::new(&log).rollback(&report.operation_id, &mut Discard)?;
    assert!(rollback.is_success());
    assert_eq!(rollback.reverted.len(), 3);
    assert_eq!(files(tree.path()), before_files);
    assert_eq!(dirs(tree.path()), before_dirs);
    // Rollback leaves the lifecycle status alone.
    assert_eq!(log.find(&report.operation_id)?.status, OperationStatus::Completed);
    Ok(())
}

#[test]
fn rollback_recreates_deleted_dirs_after_upward_move() -> Result<()> {
    let tree = tempdir()?;
    let store = tempdir()?;
    let log = OperationLog::open(store.path())?;
    write(tree.path(), "a/b/c/deep.txt", "deep");
    write(tree.path(), "a/b/mid.txt", "mid");
    let before = files(tree.path());

    let report = MoveEngine::new(&log).run(tree.path(), &up(1, true), &mut Discard)?;
    assert!(!tree.path().join("a/b/c").exists());

    RollbackEngine::new(&log).rollback(&report.operation_id, &mut Discard)?;
    assert_eq!(files(tree.path()), before);
    Ok(())
}

#[test]
fn rerun_is_a_noop() -> Result<()> {
    let tree = tempdir()?;
    let store = tempdir()?;
    let log = OperationLog::open(store.path())?;
    write(tree.path(), "2024_01_meeting.txt", "");
    let engine = MoveEngine::new(&log);

    engine.run(tree.path(), &down(&["_"], &[]), &mut Discard)?;
    let after_first = files(tree.path());
    let second = engine.run(tree.path(), &down(&["_"], &[]), &mut Discard)?;

    assert_eq!(second.stats.moved_files, 0);
    assert_eq!(files(tree.path()), after_first);
    assert!(log.find(&second.operation_id)?.moves.is_empty());
    Ok(())
}

#[test]
fn cancel_after_three_moves_rolls_back_exactly_those() -> Result<()> {
    let tree = tempdir()?;
    let store = tempdir()?;
    let log = OperationLog::open(store.path())?;
    for i in 0..10 {
        write(tree.path(), &format!("sub/f{i}.txt"), &i.to_string());
    }
    let before = files(tree.path());

    let engine = MoveEngine::new(&log);
    let control = engine.control().clone();
    let mut moved = 0;
    let mut reverted = Vec::new();
    let mut sink = |event: Event| match event {
        Event::FileMoved { .. } => {
            moved += 1;
            if moved == 3 {
                control.cancel();
            }
        }
        Event::MoveReverted { source, .. } => reverted.push(source),
        _ => {}
    };
    let report = engine.run(tree.path(), &up(1, false), &mut sink)?;

    assert_eq!(report.state, RunState::Cancelled);
    assert_eq!(moved, 3);
    let rollback = report.rollback.expect("cancelled run is rolled back");
    assert_eq!(rollback.reverted.len(), 3);
    assert!(rollback.is_success());
    // Reverse order of execution.
    let names: Vec<_> = reverted
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["f2.txt", "f1.txt", "f0.txt"]);
    assert_eq!(files(tree.path()), before);

    let op = log.find(&report.operation_id)?;
    assert_eq!(op.status, OperationStatus::Cancelled);
    assert_eq!(op.moves.len(), 3);
    Ok(())
}

#[test]
fn public_rollback_rejects_cancelled_and_unknown_operations() -> Result<()> {
    let tree = tempdir()?;
    let store = tempdir()?;
    let log = OperationLog::open(store.path())?;
    write(tree.path(), "a/f.txt", "");

    let engine = MoveEngine::new(&log);
    engine.control().cancel();
    let report = engine.run(tree.path(), &up(1, false), &mut Discard)?;
    assert_eq!(report.state, RunState::Cancelled);
    assert_eq!(report.stats.processed_files, 0);

    let rollback = RollbackEngine::new(&log);
    assert!(matches!(
        rollback.rollback(&report.operation_id, &mut Discard),
        Err(Error::NotRollbackable {
            status: OperationStatus::Cancelled,
            ..
        })
    ));
    assert!(matches!(
        rollback.rollback(&uuid::Uuid::new_v4(), &mut Discard),
        Err(Error::NotFound(_))
    ));
    Ok(())
}

#[test]
fn pause_and_resume_mid_run() -> Result<()> {
    let tree = tempdir()?;
    let store = tempdir()?;
    let log = OperationLog::open(store.path())?;
    for i in 0..4 {
        write(tree.path(), &format!("d/{i}.txt"), "");
    }

    let engine = MoveEngine::new(&log);
    let control = engine.control().clone();
    let mut resumer = None;
    let mut sink = |event: Event| {
        if let Event::FileMoved { .. } = event
            && resumer.is_none()
        {
            control.pause();
            let remote = control.clone();
            resumer = Some(std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(30));
                remote.resume();
            }));
        }
    };
    let report = engine.run(tree.path(), &up(1, false), &mut sink)?;
    drop(sink);
    resumer.take().unwrap().join().unwrap();

    assert_eq!(report.state, RunState::Completed);
    assert_eq!(report.stats.moved_files, 4);
    assert!(report.stats.paused >= Duration::from_millis(30));
    Ok(())
}

#[test]
fn single_file_failure_does_not_stop_the_run() -> Result<()> {
    let tree = tempdir()?;
    let store = tempdir()?;
    let log = OperationLog::open(store.path())?;
    // A plain file named "a" blocks the directory "a/" that "a_b.txt" needs.
    write(tree.path(), "a", "blocker");
    write(tree.path(), "a_b.txt", "blocked");
    write(tree.path(), "c_d.txt", "fine");

    let report = MoveEngine::new(&log).run(tree.path(), &down(&["_"], &[]), &mut Discard)?;

    assert_eq!(report.state, RunState::Completed);
    assert_eq!(report.stats.processed_files, 3);
    assert_eq!(report.stats.errors.len(), 1);
    assert!(report.stats.errors[0].path.ends_with("a_b.txt"));
    assert!(tree.path().join("a_b.txt").exists());
    assert!(tree.path().join("c/d.txt").exists());
    assert_eq!(log.find(&report.operation_id)?.moves.len(), 1);
    Ok(())
}

#[test]
fn lost_log_aborts_and_undoes_the_unlogged_move() -> Result<()> {
    let tree = tempdir()?;
    let store = tempdir()?;
    let store_dir = store.path().join("ops");
    let log = OperationLog::open(&store_dir)?;
    write(tree.path(), "d/first.txt", "1");
    write(tree.path(), "d/second.txt", "2");

    let mut sink = |event: Event| {
        if let Event::FileMoved { .. } = event {
            fs::remove_dir_all(&store_dir).unwrap();
        }
    };
    let err = MoveEngine::new(&log)
        .run(tree.path(), &up(1, false), &mut sink)
        .unwrap_err();

    assert!(matches!(err, Error::Aborted { .. }));
    assert!(tree.path().join("first.txt").exists());
    assert!(tree.path().join("d/second.txt").exists());
    assert!(!tree.path().join("second.txt").exists());
    Ok(())
}

#[test]
fn store_failure_before_first_move_is_not_an_abort() -> Result<()> {
    let tree = tempdir()?;
    let store = tempdir()?;
    let store_dir = store.path().join("ops");
    let log = OperationLog::open(&store_dir)?;
    fs::remove_dir(&store_dir)?;
    write(tree.path(), "d/f.txt", "f");

    let err = MoveEngine::new(&log)
        .run(tree.path(), &up(1, false), &mut Discard)
        .unwrap_err();

    assert!(matches!(err, Error::Storage { .. }));
    assert!(tree.path().join("d/f.txt").exists());
    Ok(())
}

#[cfg(unix)]
#[test]
fn non_utf8_name_fails_alone() -> Result<()> {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let tree = tempdir()?;
    let store = tempdir()?;
    let log = OperationLog::open(store.path())?;
    let odd = tree.path().join("d").join(OsStr::from_bytes(b"b\xff.txt"));
    write(tree.path(), "d/a.txt", "a");
    fs::write(&odd, "b")?;
    write(tree.path(), "d/c.txt", "c");

    let report = MoveEngine::new(&log).run(tree.path(), &up(1, false), &mut Discard)?;

    assert_eq!(report.state, RunState::Completed);
    assert_eq!(report.stats.moved_files, 2);
    assert_eq!(report.stats.errors.len(), 1);
    assert_eq!(report.stats.errors[0].path, odd);
    assert!(tree.path().join("a.txt").exists());
    assert!(tree.path().join("c.txt").exists());
    assert!(odd.exists());
    assert_eq!(log.find(&report.operation_id)?.moves.len(), 2);
    Ok(())
}

#[test]
fn rollback_keeps_directories_that_predate_the_run() -> Result<()> {
    let tree = tempdir()?;
    let store = tempdir()?;
    let log = OperationLog::open(store.path())?;
    fs::create_dir(tree.path().join("2024"))?;
    write(tree.path(), "2024_a.txt", "a");
    write(tree.path(), "2025_01_b.txt", "b");
    let before = dirs(tree.path());

    let report = MoveEngine::new(&log).run(tree.path(), &down(&["_"], &[]), &mut Discard)?;
    assert!(tree.path().join("2024/a.txt").exists());
    assert!(tree.path().join("2025/01/b.txt").exists());

    let rollback = RollbackEngine::new(&log).rollback(&report.operation_id, &mut Discard)?;
    assert!(rollback.is_success());
    assert_eq!(dirs(tree.path()), before);
    assert!(tree.path().join("2024_a.txt").exists());
    Ok(())
}

#[test]
fn missing_root_fails_before_logging() -> Result<()> {
    let tree = tempdir()?;
    let store = tempdir()?;
    let log = OperationLog::open(store.path())?;

    let err = MoveEngine::new(&log)
        .run(&tree.path().join("nope"), &up(1, false), &mut Discard)
        .unwrap_err();

    assert!(matches!(err, Error::InvalidPath { .. }));
    assert!(log.recent(10)?.is_empty());
    Ok(())
}

#[test]
fn history_lists_runs_newest_first() -> Result<()> {
    let tree = tempdir()?;
    let store = tempdir()?;
    let log = OperationLog::open(store.path())?;
    let engine = MoveEngine::new(&log);

    let first = engine.run(tree.path(), &up(1, false), &mut Discard)?;
    std::thread::sleep(Duration::from_millis(5));
    let second = engine.run(tree.path(), &down(&["-"], &[]), &mut Discard)?;

    let ids: Vec<_> = log.recent(10)?.into_iter().map(|op| op.id).collect();
    assert_eq!(ids, vec![second.operation_id, first.operation_id]);
    let found = log.find_by_timestamp(&log.find(&first.operation_id)?.created_at.to_rfc3339())?;
    assert_eq!(found.map(|op| op.id), Some(first.operation_id));
    Ok(())
}
