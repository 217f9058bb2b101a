#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Skip guard: integration tests need a real git binary on PATH.
pub fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

pub fn git(repo: &Path, args: &[&str]) -> String {
    let out = Command::new("git")
        .args(args)
        .current_dir(repo)
        .output()
        .unwrap_or_else(|e| panic!("git {args:?} failed to spawn: {e}"));
    assert!(
        out.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    String::from_utf8_lossy(&out.stdout).trim().to_string()
}

/// Fresh repository with a deterministic identity and one initial commit,
/// so branch creation has a HEAD to branch from.
pub fn init_repo(dir: &Path) -> PathBuf {
    let repo = dir.join("repo");
    fs::create_dir_all(&repo).expect("create repo dir");
    git(&repo, &["init", "--initial-branch=main"]);
    git(&repo, &["config", "user.email", "test@example.invalid"]);
    git(&repo, &["config", "user.name", "Test Fixture"]);
    git(&repo, &["config", "commit.gpgsign", "false"]);
    write_file(&repo, "README.md", "fixture\n");
    git(&repo, &["add", "-A"]);
    git(&repo, &["commit", "-m", "initial"]);
    repo
}

pub fn write_file(repo: &Path, rel: &str, body: &str) {
    let path = repo.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent");
    }
    fs::write(path, body).expect("write file");
}

/// Commit subjects, newest first.
pub fn log_subjects(repo: &Path) -> Vec<String> {
    git(repo, &["log", "--format=%s"])
        .lines()
        .map(|s| s.to_string())
        .collect()
}

pub fn current_branch(repo: &Path) -> String {
    git(repo, &["symbolic-ref", "--short", "HEAD"])
}
