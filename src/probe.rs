//! Read-only queries against the repository, each a short git subprocess.
//!
//! Every probe distinguishes "the repo answered X" from "git itself failed";
//! the latter is surfaced unchanged as a classified error.

use std::path::Path;

use crate::errors::CheckpointError;
use crate::exec::{ExecRequest, ExecService};

/// Where HEAD currently points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Head {
    Branch(String),
    Detached,
}

/// Classify a failed git invocation. Index-lock contention and temporary
/// resource errors are worth retrying; everything else is permanent.
pub fn vcs_error(msg: String) -> CheckpointError {
    const TRANSIENT_MARKERS: &[&str] = &[
        "index.lock",
        "File exists",
        "Resource temporarily unavailable",
        "could not lock",
        "try again",
    ];
    if TRANSIENT_MARKERS.iter().any(|m| msg.contains(m)) {
        CheckpointError::VcsTransient(msg)
    } else {
        CheckpointError::VcsPermanent(msg)
    }
}

#[derive(Debug, Clone)]
pub struct RepoProbe<'a> {
    exec: &'a ExecService,
}

impl<'a> RepoProbe<'a> {
    pub fn new(exec: &'a ExecService) -> Self {
        Self { exec }
    }

    /// True when `path` is inside a git working tree (not a bare repo).
    pub fn is_repo(&self, path: &Path) -> Result<bool, CheckpointError> {
        let out = self
            .exec
            .run(ExecRequest::git(path, ["rev-parse", "--is-inside-work-tree"]))
            .map_err(CheckpointError::Io)?;
        Ok(out.success() && out.stdout.trim() == "true")
    }

    /// Current branch name, or Detached when HEAD points at a bare commit.
    pub fn current_branch(&self, path: &Path) -> Result<Head, CheckpointError> {
        let out = self
            .exec
            .run(ExecRequest::git(
                path,
                ["symbolic-ref", "--quiet", "--short", "HEAD"],
            ))
            .map_err(CheckpointError::Io)?;
        if out.success() {
            return Ok(Head::Branch(out.stdout.trim().to_string()));
        }
        // symbolic-ref --quiet exits 1 with no output on detached HEAD.
        let msg = out.tool_message();
        if msg.is_empty() {
            Ok(Head::Detached)
        } else {
            Err(vcs_error(msg))
        }
    }

    /// True when the working tree has staged or unstaged changes.
    pub fn has_changes(&self, path: &Path) -> Result<bool, CheckpointError> {
        let out = self
            .exec
            .run(ExecRequest::git(path, ["status", "--porcelain"]))
            .map_err(CheckpointError::Io)?;
        if !out.success() {
            return Err(vcs_error(out.tool_message()));
        }
        Ok(!out.stdout.trim().is_empty())
    }

    /// Highest checkpoint number `N` among subjects `<prefix> #N ...`
    /// reachable from `branch`'s tip; 0 when none exist.
    pub fn last_checkpoint_number(
        &self,
        path: &Path,
        branch: &str,
        prefix: &str,
    ) -> Result<u64, CheckpointError> {
        let out = self
            .exec
            .run(ExecRequest::git(
                path,
                ["log", "--format=%s", branch, "--"],
            ))
            .map_err(CheckpointError::Io)?;
        if !out.success() {
            let msg = out.tool_message();
            // A branch with no history yet answers "zero checkpoints".
            if msg.contains("does not have any commits")
                || msg.contains("unknown revision")
            {
                return Ok(0);
            }
            return Err(vcs_error(msg));
        }
        Ok(parse_max_checkpoint(out.stdout.lines(), prefix))
    }
}

/// Scan commit subjects for `<prefix> #N` and return the maximum N.
pub fn parse_max_checkpoint<'s, I>(subjects: I, prefix: &str) -> u64
where
    I: IntoIterator<Item = &'s str>,
{
    subjects
        .into_iter()
        .filter_map(|subject| {
            let rest = subject.strip_prefix(prefix)?.strip_prefix(" #")?;
            let digits: &str = &rest[..rest
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(rest.len())];
            digits.parse::<u64>().ok()
        })
        .max()
        .unwrap_or(0)
}
