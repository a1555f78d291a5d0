#![cfg(windows)]

use std::cell::Cell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use winshell_ops::{
    FileOperator, ItemOutcome, OpError, OperationFlags, ProgressHandler, Result, ResultCode,
    SessionState, TransferFlags, resolve_item,
};

fn silent_operator() -> FileOperator {
    FileOperator::new().with_flags(OperationFlags::FULL_SILENT)
}

fn write_file(path: &Path, contents: &str) {
    fs::write(path, contents).expect("fixture file");
}

#[test]
fn test_reentrancy_rejected() {
    let mut op = silent_operator();
    op.open().unwrap();
    assert!(matches!(op.open(), Err(OpError::Reentrancy)));
    op.close().unwrap();
}

#[test]
fn test_reuse_after_close() {
    let mut op = silent_operator();
    op.open().unwrap();
    op.close().unwrap();
    assert_eq!(op.state(), SessionState::Closed);

    // A closed operator starts a fresh cycle.
    op.open().unwrap();
    assert_eq!(op.state(), SessionState::Open);
    op.close().unwrap();
}

#[test]
fn test_queue_outside_scope_is_rejected() {
    let mut op = silent_operator();
    let err = op.delete_file(r"C:\nowhere\nothing.txt").unwrap_err();
    assert_eq!(err, OpError::NotOpen);
    assert!(matches!(op.commit(), Err(OpError::NotOpen)));
}

#[test]
fn test_empty_commit_is_noop() {
    let mut op = silent_operator();
    op.open().unwrap();
    let summary = op.commit().expect("empty commit must not fail");
    assert!(summary.outcomes.is_empty());
    assert!(!summary.aborted);
    assert_eq!(summary.code, ResultCode::S_OK);
    op.close().unwrap();
}

#[test]
fn test_session_scope_runs_and_closes() {
    let mut op = silent_operator();
    let value = op.session(|op| {
        op.commit()?;
        Ok(17)
    });
    assert_eq!(value.unwrap(), 17);
    assert_eq!(op.state(), SessionState::Closed);

    // Entering a scope from inside a scope is reentrancy.
    let nested = op.session(|op| op.session(|_| Ok(())));
    assert!(matches!(nested, Err(OpError::Reentrancy)));
}

#[test]
fn test_copy_roundtrip_outcome() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("a.txt");
    write_file(&source, "round trip");
    let dest_dir = dir.path().join("dst");
    fs::create_dir(&dest_dir).unwrap();

    let mut op = silent_operator();
    op.open().unwrap();
    op.copy_file(&source, &dest_dir, None).unwrap();
    let summary = op.commit().unwrap();
    op.close().unwrap();

    let expected = dest_dir.join("a.txt");
    assert!(expected.is_file());
    assert!(source.is_file());
    assert!(!summary.aborted);
    assert_eq!(summary.outcomes.len(), 1);

    let (recorded_source, outcome) = summary.outcomes.iter().next().unwrap();
    assert_eq!(recorded_source.file_name(), source.file_name());
    let new_path = outcome.new_path().expect("copy records the new path");
    assert_eq!(
        fs::canonicalize(new_path).unwrap(),
        fs::canonicalize(&expected).unwrap()
    );
}

#[test]
fn test_move_into_missing_destination_directory() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("m.txt");
    write_file(&source, "moved");
    let dest_dir = dir.path().join("not-yet-created");
    assert!(!dest_dir.exists());

    let mut op = silent_operator();
    op.open().unwrap();
    op.move_file(&source, &dest_dir, None).unwrap();
    let summary = op.commit().unwrap();
    op.close().unwrap();

    assert!(dest_dir.join("m.txt").is_file());
    assert!(!source.exists());
    assert!(!summary.aborted);
}

#[test]
fn test_rename_same_directory() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("f.txt");
    write_file(&source, "renamed");

    let mut op = silent_operator();
    op.open().unwrap();
    op.rename_file(&source, "g.txt", true).unwrap();
    let summary = op.commit().unwrap();
    op.close().unwrap();

    assert!(dir.path().join("g.txt").is_file());
    assert!(!source.exists());
    assert_eq!(summary.outcomes.len(), 1);
}

#[test]
fn test_rename_redirects_to_move() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("f.txt");
    write_file(&source, "redirected");
    let other = dir.path().join("other");
    fs::create_dir(&other).unwrap();

    let target = other.join("g.txt");
    let mut op = silent_operator();
    op.open().unwrap();
    op.rename_file(&source, &target.to_string_lossy(), true)
        .unwrap();
    let summary = op.commit().unwrap();
    op.close().unwrap();

    assert!(target.is_file());
    assert!(!source.exists());
    assert!(!summary.aborted);
}

#[test]
fn test_batch_copy() {
    let dir = tempfile::tempdir().unwrap();
    let sources: Vec<PathBuf> = (0..3)
        .map(|i| {
            let path = dir.path().join(format!("batch-{i}.txt"));
            write_file(&path, "batch");
            path
        })
        .collect();
    let dest_dir = dir.path().join("dst");
    fs::create_dir(&dest_dir).unwrap();

    let mut op = silent_operator();
    op.open().unwrap();
    op.copy_files(&sources, &dest_dir).unwrap();
    let summary = op.commit().unwrap();
    op.close().unwrap();

    for source in &sources {
        assert!(dest_dir.join(source.file_name().unwrap()).is_file());
    }
    assert_eq!(summary.outcomes.len(), sources.len());
}

#[test]
fn test_delete_is_permanent_without_recycle_flag() {
    let dir = tempfile::tempdir().unwrap();
    let victim = dir.path().join("victim.txt");
    write_file(&victim, "doomed");

    let mut op = silent_operator();
    op.open().unwrap();
    op.delete_file(&victim).unwrap();
    let summary = op.commit().unwrap();
    op.close().unwrap();

    assert!(!victim.exists());
    let outcome = summary.outcomes.values().next().expect("delete outcome");
    assert_eq!(outcome, &ItemOutcome::Deleted);
}

#[test]
fn test_delete_with_recycle_flag() {
    let dir = tempfile::tempdir().unwrap();
    let victim = dir.path().join("recycled.txt");
    write_file(&victim, "into the bin");

    let mut op = FileOperator::new()
        .with_flags(OperationFlags::FULL_SILENT | OperationFlags::UNDO);
    op.open().unwrap();
    op.delete_file(&victim).unwrap();
    let summary = op.commit().unwrap();
    op.close().unwrap();

    assert!(!victim.exists());
    // Recycling is the engine's decision: a volume without a recycle bin
    // falls back to permanent deletion, so both terminal states are valid;
    // what must hold is that the engine-supplied signal and the outcome
    // agree that the item is gone.
    let outcome = summary.outcomes.values().next().expect("delete outcome");
    assert!(matches!(
        outcome,
        ItemOutcome::Recycled | ItemOutcome::Deleted
    ));
}

#[test]
fn test_forced_resolution_of_missing_path() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("ghost-directory");
    assert!(!missing.exists());

    resolve_item(&missing, true).expect("forced resolution must succeed");
    // Still absent: resolution never creates the path.
    assert!(!missing.exists());

    let err = resolve_item(&missing, false).unwrap_err();
    assert!(matches!(err, OpError::NotFound { .. }));
}

#[test]
fn test_concurrent_sessions() {
    let workers: Vec<_> = (0..10)
        .map(|i| {
            std::thread::spawn(move || {
                let mut op = silent_operator();
                op.session(|op| {
                    let summary = op.commit()?;
                    assert!(summary.outcomes.is_empty());
                    Ok(i)
                })
            })
        })
        .collect();

    let mut results: Vec<i32> = workers
        .into_iter()
        .map(|w| w.join().unwrap().unwrap())
        .collect();
    results.sort_unstable();
    assert_eq!(results, (0..10).collect::<Vec<_>>());
}

struct FailingHandler;

impl ProgressHandler for FailingHandler {
    fn pre_copy_item(
        &mut self,
        _flags: TransferFlags,
        _source: &str,
        _destination: &str,
        _new_name: &str,
    ) -> Result<()> {
        Err(OpError::Handler {
            message: "refused by test handler".into(),
        })
    }
}

#[test]
fn test_handler_error_surfaces_from_commit() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("a.txt");
    write_file(&source, "never copied");
    let dest_dir = dir.path().join("dst");
    fs::create_dir(&dest_dir).unwrap();

    let mut op = silent_operator().with_handler(Box::new(FailingHandler));
    op.open().unwrap();
    op.copy_file(&source, &dest_dir, None).unwrap();
    let err = op.commit().unwrap_err();
    op.close().unwrap();

    match err {
        OpError::Handler { message } => assert!(message.contains("refused")),
        other => panic!("expected the handler error, got {other:?}"),
    }
    assert!(!dest_dir.join("a.txt").exists());
}

#[derive(Default)]
struct CountingHandler {
    started: Rc<Cell<bool>>,
    copies: Rc<Cell<u32>>,
    finished: Rc<Cell<bool>>,
}

impl ProgressHandler for CountingHandler {
    fn start_operations(&mut self) -> Result<()> {
        self.started.set(true);
        Ok(())
    }

    fn finish_operations(&mut self, _result: ResultCode) -> Result<()> {
        self.finished.set(true);
        Ok(())
    }

    fn post_copy_item(
        &mut self,
        _flags: TransferFlags,
        _source: &str,
        _destination: &str,
        new_path: Option<&str>,
        _result: ResultCode,
    ) -> Result<()> {
        if new_path.is_some() {
            self.copies.set(self.copies.get() + 1);
        }
        Ok(())
    }
}

#[test]
fn test_handler_observes_copy_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("a.txt");
    write_file(&source, "observed");
    let dest_dir = dir.path().join("dst");
    fs::create_dir(&dest_dir).unwrap();

    let started = Rc::new(Cell::new(false));
    let copies = Rc::new(Cell::new(0));
    let finished = Rc::new(Cell::new(false));
    let handler = CountingHandler {
        started: Rc::clone(&started),
        copies: Rc::clone(&copies),
        finished: Rc::clone(&finished),
    };

    let mut op = silent_operator().with_handler(Box::new(handler));
    op.open().unwrap();
    op.copy_file(&source, &dest_dir, None).unwrap();
    op.commit().unwrap();
    op.close().unwrap();

    assert!(started.get());
    assert_eq!(copies.get(), 1);
    assert!(finished.get());
}
