//! Branch selection and creation for a checkpoint session.

use std::io::{self, BufRead, Write};
use std::path::Path;

use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::errors::CheckpointError;
use crate::exec::{ExecRequest, ExecService};
use crate::probe::{vcs_error, Head, RepoProbe};

/// The branch a session will commit to, and whether this session created it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchOutcome {
    pub name: String,
    pub created: bool,
    /// True when an existing branch was adopted and checkpoint numbering
    /// should resume from its history.
    pub resumed: bool,
}

#[derive(Debug, Clone)]
pub struct BranchManager<'a> {
    exec: &'a ExecService,
}

impl<'a> BranchManager<'a> {
    pub fn new(exec: &'a ExecService) -> Self {
        Self { exec }
    }

    /// Put the working tree on the session branch. On return the checkout is
    /// done and the resolved name is final.
    pub fn prepare(&self, repo: &Path, config: &Config) -> Result<BranchOutcome, CheckpointError> {
        if config.continue_session {
            return self.prepare_continue(repo, &config.branch_name);
        }
        if config.create_branch {
            return self.prepare_fresh(repo, &config.branch_name, config.non_interactive);
        }
        self.prepare_stay(repo)
    }

    /// Fresh mode: create and check out a new branch. A name collision is
    /// never resolved silently: with a terminal the user may confirm reusing
    /// the existing branch (resuming its numbering); otherwise it is an error.
    fn prepare_fresh(
        &self,
        repo: &Path,
        requested: &str,
        non_interactive: bool,
    ) -> Result<BranchOutcome, CheckpointError> {
        let name = if requested.is_empty() {
            generated_branch_name(Utc::now())
        } else {
            requested.to_string()
        };
        let out = self
            .exec
            .run(ExecRequest::git(repo, ["checkout", "-b", &name]))
            .map_err(CheckpointError::Io)?;
        if !out.success() {
            let msg = out.tool_message();
            if msg.contains("already exists") {
                if !non_interactive
                    && atty::is(atty::Stream::Stdin)
                    && confirm(&format!(
                        "branch '{name}' already exists; reuse it and resume numbering?"
                    ))?
                {
                    return self.checkout_existing(repo, &name);
                }
                return Err(CheckpointError::VcsPermanent(format!(
                    "branch '{name}' already exists; use --continue to resume it"
                )));
            }
            return Err(vcs_error(msg));
        }
        Ok(BranchOutcome {
            name,
            created: true,
            resumed: false,
        })
    }

    fn checkout_existing(&self, repo: &Path, name: &str) -> Result<BranchOutcome, CheckpointError> {
        let out = self
            .exec
            .run(ExecRequest::git(repo, ["checkout", name]))
            .map_err(CheckpointError::Io)?;
        if !out.success() {
            return Err(vcs_error(out.tool_message()));
        }
        Ok(BranchOutcome {
            name: name.to_string(),
            created: false,
            resumed: true,
        })
    }

    /// Stay mode: leave branches alone, record where we are.
    fn prepare_stay(&self, repo: &Path) -> Result<BranchOutcome, CheckpointError> {
        match RepoProbe::new(self.exec).current_branch(repo)? {
            Head::Branch(name) => Ok(BranchOutcome {
                name,
                created: false,
                resumed: false,
            }),
            Head::Detached => Err(CheckpointError::VcsPermanent(
                "HEAD is detached; check out a branch or pass --branch".to_string(),
            )),
        }
    }

    /// Continue mode: adopt the current branch, or check out the named one,
    /// which must already exist.
    fn prepare_continue(
        &self,
        repo: &Path,
        requested: &str,
    ) -> Result<BranchOutcome, CheckpointError> {
        if requested.is_empty() {
            return self.prepare_stay(repo);
        }
        let verify = self
            .exec
            .run(ExecRequest::git(
                repo,
                ["rev-parse", "--verify", "--quiet", &format!("refs/heads/{requested}")],
            ))
            .map_err(CheckpointError::Io)?;
        if !verify.success() {
            return Err(CheckpointError::VcsPermanent(format!(
                "branch '{requested}' does not exist; continue mode needs an existing branch"
            )));
        }
        self.checkout_existing(repo, requested)
    }
}

/// One-line y/N prompt on stderr, answer read from stdin. Anything but an
/// explicit yes declines.
fn confirm(question: &str) -> Result<bool, CheckpointError> {
    eprint!("{question} [y/N] ");
    io::stderr().flush().map_err(CheckpointError::Io)?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(CheckpointError::Io)?;
    Ok(matches!(
        line.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}

/// Generated branch names use a fixed stem; commit-message prefixes may
/// contain spaces and brackets, which are not valid in ref names.
pub fn generated_branch_name(now: DateTime<Utc>) -> String {
    format!("checkpoint-{}", now.format("%Y%m%d-%H%M%S"))
}
