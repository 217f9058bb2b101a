//! Stage-everything-and-commit with a numbered checkpoint message.

use std::path::Path;

use chrono::{DateTime, Local};

use crate::errors::CheckpointError;
use crate::exec::{ExecRequest, ExecService};
use crate::probe::{vcs_error, RepoProbe};

#[derive(Debug, Clone)]
pub struct Committer<'a> {
    exec: &'a ExecService,
}

impl<'a> Committer<'a> {
    pub fn new(exec: &'a ExecService) -> Self {
        Self { exec }
    }

    /// Try to record one checkpoint. Ok(false) means a clean tree, which is
    /// not an error; the supervisor owns all counter bookkeeping.
    pub fn commit(
        &self,
        repo: &Path,
        prefix: &str,
        counter: u64,
    ) -> Result<bool, CheckpointError> {
        if !RepoProbe::new(self.exec).has_changes(repo)? {
            return Ok(false);
        }

        // Stage everything, deletions included.
        let add = self
            .exec
            .run(ExecRequest::git(repo, ["add", "-A"]))
            .map_err(CheckpointError::Io)?;
        if !add.success() {
            return Err(vcs_error(add.tool_message()));
        }

        let message = format_commit_message(prefix, counter, Local::now());
        let commit = self
            .exec
            .run(ExecRequest::git(repo, ["commit", "-m", &message]))
            .map_err(CheckpointError::Io)?;
        if !commit.success() {
            let msg = commit.tool_message();
            // Raced with an external commit: the tree went clean between the
            // status probe and the commit. Not a failure.
            if is_nothing_to_commit(&msg) {
                return Ok(false);
            }
            return Err(vcs_error(msg));
        }
        Ok(true)
    }
}

/// `<prefix> #<N> - <human-readable local time>`.
pub fn format_commit_message(prefix: &str, counter: u64, now: DateTime<Local>) -> String {
    format!("{prefix} #{counter} - {}", now.format("%Y-%m-%d %H:%M:%S"))
}

fn is_nothing_to_commit(msg: &str) -> bool {
    msg.contains("nothing to commit")
        || msg.contains("nothing added to commit")
        || msg.contains("no changes added to commit")
        || msg.contains("working tree clean")
}
