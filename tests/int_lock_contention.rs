mod common;

use std::fs;

use autocheckpoint::errors::{exit_code_for_error, CheckpointError};
use autocheckpoint::lock::{lock_path_for, read_lock_pid, RepoLock};

#[test]
fn int_second_acquire_reports_owner_pid() {
    let td = tempfile::tempdir().expect("tmpdir");
    let path = td.path().join("session.lock");

    let mut first = RepoLock::acquire_at(&path).expect("first acquire");
    assert_eq!(read_lock_pid(&path), Some(std::process::id()));

    let err = RepoLock::acquire_at(&path).expect_err("second acquire succeeded");
    match err {
        CheckpointError::LockContention(pid) => assert_eq!(pid, std::process::id()),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(exit_code_for_error(&CheckpointError::LockContention(1)), 4);

    first.release().expect("release");
    assert!(!path.exists(), "lock file left behind");
}

#[test]
fn int_stale_lock_from_dead_owner_is_reclaimed() {
    let td = tempfile::tempdir().expect("tmpdir");
    let path = td.path().join("session.lock");
    // No process holds the advisory lock; the body names a pid that is
    // almost certainly not running.
    fs::write(&path, "999999999").expect("seed stale lock");

    let mut lock = RepoLock::acquire_at(&path).expect("reclaim failed");
    assert_eq!(read_lock_pid(&path), Some(std::process::id()));
    lock.release().expect("release");
}

#[test]
fn int_release_then_reacquire() {
    let td = tempfile::tempdir().expect("tmpdir");
    let path = td.path().join("session.lock");

    let mut lock = RepoLock::acquire_at(&path).expect("first acquire");
    lock.release().expect("first release");
    let mut again = RepoLock::acquire_at(&path).expect("reacquire failed");
    again.release().expect("second release");
}

#[test]
fn int_lock_path_is_repo_scoped_and_stable() {
    let td = tempfile::tempdir().expect("tmpdir");
    let a = td.path().join("a");
    let b = td.path().join("b");
    fs::create_dir_all(&a).expect("mkdir a");
    fs::create_dir_all(&b).expect("mkdir b");

    let pa = lock_path_for(&a);
    assert_eq!(pa, lock_path_for(&a), "lock path not stable");
    assert_ne!(pa, lock_path_for(&b), "distinct repos share a lock path");

    let name = pa.file_name().and_then(|n| n.to_str()).expect("file name");
    assert!(name.starts_with("autocheckpoint-"), "{name}");
    assert!(name.ends_with(".lock"), "{name}");
    // 16 hex digits between the stem and the extension.
    let hash = &name["autocheckpoint-".len()..name.len() - ".lock".len()];
    assert_eq!(hash.len(), 16, "{name}");
    assert!(hash.chars().all(|c| c.is_ascii_hexdigit()), "{name}");
}
