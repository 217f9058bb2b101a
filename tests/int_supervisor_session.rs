mod common;

use std::thread;
use std::time::{Duration, Instant};

use autocheckpoint::cli::Cli;
use autocheckpoint::config::Config;
use autocheckpoint::errors::CheckpointError;
use autocheckpoint::logger::Logger;
use autocheckpoint::signals::CancelFlag;
use autocheckpoint::supervisor::Supervisor;
use clap::Parser;
use common::{git_available, init_repo, log_subjects, write_file};

fn config_for(repo: &std::path::Path, extra: &[&str]) -> Config {
    let mut args = vec![
        "autocheckpoint".to_string(),
        "--repo".to_string(),
        repo.display().to_string(),
        "--quiet".to_string(),
    ];
    args.extend(extra.iter().map(|s| s.to_string()));
    Config::resolve(&Cli::parse_from(args)).expect("resolve failed")
}

#[test]
fn int_supervisor_commits_then_shuts_down_on_cancel() {
    if !git_available() {
        eprintln!("skipping: git not found in PATH");
        return;
    }
    let td = tempfile::tempdir().expect("tmpdir");
    let repo = init_repo(td.path());
    write_file(&repo, "work.txt", "in progress\n");

    // 0.001 min floors to the 1-second tick quantum.
    let config = config_for(&repo, &["--interval", "0.001", "--no-branch"]);
    let cancel = CancelFlag::new();
    let handle = {
        let cancel = cancel.clone();
        let config = config.clone();
        thread::spawn(move || {
            let logger = Logger::disabled();
            Supervisor::new(config, &logger).run(&cancel)
        })
    };

    // Wait for the first checkpoint to land, then request shutdown.
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        if log_subjects(&repo)
            .iter()
            .any(|s| s.contains("Automatic checkpoint #1"))
        {
            break;
        }
        assert!(Instant::now() < deadline, "no checkpoint within 10s");
        thread::sleep(Duration::from_millis(100));
    }
    cancel.cancel();
    handle
        .join()
        .expect("supervisor thread panicked")
        .expect("supervisor returned error");

    let subjects = log_subjects(&repo);
    assert!(
        subjects
            .iter()
            .any(|s| s.starts_with("[autocheckpoint] Automatic checkpoint #1 - ")),
        "{subjects:?}"
    );
}

#[test]
fn int_cancel_during_commit_lets_checkpoint_land() {
    if !git_available() {
        eprintln!("skipping: git not found in PATH");
        return;
    }
    let td = tempfile::tempdir().expect("tmpdir");
    let repo = init_repo(td.path());
    write_file(&repo, "work.txt", "in progress\n");

    let config = config_for(&repo, &["--interval", "0.001", "--no-branch"]);
    let cancel = CancelFlag::new();
    let handle = {
        let cancel = cancel.clone();
        let config = config.clone();
        thread::spawn(move || {
            let logger = Logger::disabled();
            Supervisor::new(config, &logger).run(&cancel)
        })
    };

    // Request shutdown the moment the first commit is observed in flight
    // (git holds index.lock while committing) or already recorded. The
    // in-flight checkpoint must still land; cancellation takes effect at
    // the next check-point, never mid-commit.
    let index_lock = repo.join(".git").join("index.lock");
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        if index_lock.exists()
            || log_subjects(&repo)
                .iter()
                .any(|s| s.contains("Automatic checkpoint #1"))
        {
            cancel.cancel();
            break;
        }
        assert!(Instant::now() < deadline, "commit never started within 10s");
        thread::sleep(Duration::from_millis(5));
    }

    handle
        .join()
        .expect("supervisor thread panicked")
        .expect("supervisor returned error");
    let subjects = log_subjects(&repo);
    assert!(
        subjects
            .iter()
            .any(|s| s.starts_with("[autocheckpoint] Automatic checkpoint #1 - ")),
        "cancelled commit was lost: {subjects:?}"
    );
}

#[test]
fn int_supervisor_rejects_non_repository() {
    if !git_available() {
        eprintln!("skipping: git not found in PATH");
        return;
    }
    let td = tempfile::tempdir().expect("tmpdir");
    let config = config_for(td.path(), &["--interval", "0.001"]);
    let logger = Logger::disabled();
    let cancel = CancelFlag::new();

    let err = Supervisor::new(config, &logger)
        .run(&cancel)
        .expect_err("plain directory accepted");
    assert!(matches!(err, CheckpointError::NotARepository(_)), "{err}");
}

#[test]
fn int_supervisor_cancel_before_first_tick_commits_nothing() {
    if !git_available() {
        eprintln!("skipping: git not found in PATH");
        return;
    }
    let td = tempfile::tempdir().expect("tmpdir");
    let repo = init_repo(td.path());
    write_file(&repo, "work.txt", "in progress\n");

    // A 5-minute interval guarantees no tick fires before the cancel.
    let config = config_for(&repo, &["--no-branch"]);
    let logger = Logger::disabled();
    let cancel = CancelFlag::new();
    cancel.cancel();

    let before = log_subjects(&repo).len();
    Supervisor::new(config, &logger)
        .run(&cancel)
        .expect("supervisor returned error");
    assert_eq!(log_subjects(&repo).len(), before);
}
