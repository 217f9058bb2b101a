//! Top-level session state machine.
//!
//! Init → Locking → Validating → Preparing → Ticking ⇄ Committing → Shutdown.
//! The supervisor is logically single-threaded: it exclusively owns
//! SessionState and the repository lock, and subprocess calls block it by
//! design. Cancellation is cooperative: a signal observed during a commit
//! takes effect at the next check-point, never mid-commit.

use std::thread;
use std::time::{Duration, Instant};

use crate::branch::BranchManager;
use crate::committer::Committer;
use crate::config::Config;
use crate::errors::{error_signature, CheckpointError};
use crate::exec::ExecService;
use crate::lock::RepoLock;
use crate::logger::Logger;
use crate::probe::RepoProbe;
use crate::signals::CancelFlag;

/// Identical-signature failures tolerated before escalating to shutdown.
pub const MAX_RETRIES: u32 = 3;

/// Mutable session bookkeeping, owned and mutated by the supervisor only;
/// read by the shutdown summary.
#[derive(Debug)]
pub struct SessionState {
    /// Number the next successful checkpoint will carry (≥ 1).
    pub commit_counter: u64,
    /// Checkpoints recorded this session.
    pub commits_made: u64,
    /// Current run of identical error signatures; resets on success.
    pub consecutive_failures: u32,
    pub last_error_signature: Option<String>,
    pub start_time: Instant,
    /// Branch actually operated on, resolved during preparation.
    pub branch_name: String,
    /// Whether this session created the branch (drives summary wording).
    pub created_branch: bool,
}

impl SessionState {
    fn new() -> SessionState {
        SessionState {
            commit_counter: 1,
            commits_made: 0,
            consecutive_failures: 0,
            last_error_signature: None,
            start_time: Instant::now(),
            branch_name: String::new(),
            created_branch: false,
        }
    }
}

pub struct Supervisor<'a> {
    config: Config,
    logger: &'a Logger,
    exec: ExecService,
    state: SessionState,
    reached_ticking: bool,
}

impl<'a> Supervisor<'a> {
    pub fn new(config: Config, logger: &'a Logger) -> Supervisor<'a> {
        Supervisor {
            config,
            logger,
            exec: ExecService::default(),
            state: SessionState::new(),
            reached_ticking: false,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Drive the whole session. Ok(()) means user-initiated shutdown; the
    /// lock is released and the summary emitted on every exit edge.
    pub fn run(&mut self, cancel: &CancelFlag) -> Result<(), CheckpointError> {
        // Locking: failure here is fatal; the session has not begun.
        let mut lock = RepoLock::acquire(&self.config.repo_path)?;
        self.logger
            .debug(&format!("lock acquired at {}", lock.path().display()));

        let result = self.run_locked(cancel);

        // Shutdown: summary before resources go away, release in reverse
        // order of acquisition. The Drop impl backstops the release.
        if self.reached_ticking {
            self.emit_summary();
        }
        if let Err(e) = lock.release() {
            self.logger
                .warn(&format!("autocheckpoint: lock release failed: {e}"));
        }
        result
    }

    fn run_locked(&mut self, cancel: &CancelFlag) -> Result<(), CheckpointError> {
        let exec = self.exec.clone();
        let repo = self.config.repo_path.clone();
        let probe = RepoProbe::new(&exec);

        // Validating.
        if !probe.is_repo(&repo)? {
            return Err(CheckpointError::NotARepository(
                repo.display().to_string(),
            ));
        }

        // Preparing: branch setup, then the starting checkpoint number.
        let outcome = BranchManager::new(&exec).prepare(&repo, &self.config)?;
        let resume_numbering = self.config.continue_session || outcome.resumed;
        self.state.branch_name = outcome.name;
        self.state.created_branch = outcome.created;
        self.state.commit_counter = if resume_numbering {
            probe.last_checkpoint_number(
                &repo,
                &self.state.branch_name,
                &self.config.commit_prefix,
            )? + 1
        } else {
            1
        };

        self.logger.info(&format!(
            "autocheckpoint: watching {} on branch '{}' every {} min (prefix \"{}\")",
            repo.display(),
            self.state.branch_name,
            self.config.interval_minutes,
            self.config.commit_prefix,
        ));
        if resume_numbering {
            self.logger.info(&format!(
                "autocheckpoint: continuing session, next checkpoint is #{}",
                self.state.commit_counter
            ));
        }

        // Ticking.
        self.state.start_time = Instant::now();
        self.reached_ticking = true;
        let period = self.config.tick_period();
        let committer = Committer::new(&exec);
        let mut next_tick = Instant::now() + period;

        loop {
            if wait_until(cancel, next_tick) == TickWait::Cancelled {
                self.logger.debug("cancellation observed; shutting down");
                return Ok(());
            }

            // Committing. The call is synchronous; cancellation delivered
            // meanwhile is handled at the top of the next iteration.
            match committer.commit(
                &repo,
                &self.config.commit_prefix,
                self.state.commit_counter,
            ) {
                Ok(true) => {
                    self.logger.info(&format!(
                        "autocheckpoint: checkpoint #{} committed on '{}'",
                        self.state.commit_counter, self.state.branch_name
                    ));
                    self.state.commit_counter += 1;
                    self.state.commits_made += 1;
                    self.state.consecutive_failures = 0;
                    self.state.last_error_signature = None;
                }
                Ok(false) => {
                    if self.config.show_no_changes {
                        self.logger
                            .info("autocheckpoint: no changes to checkpoint");
                    }
                }
                Err(e) => {
                    if is_unrecoverable(&e) {
                        self.logger.error(&format!("autocheckpoint: {e}"));
                        return Err(e);
                    }
                    if self.record_failure(&e) {
                        self.logger.error(&format!(
                            "autocheckpoint: giving up after {} identical failures: {e}",
                            self.state.consecutive_failures
                        ));
                        return Err(e);
                    }
                    self.logger
                        .warn(&format!("autocheckpoint: checkpoint failed, will retry: {e}"));
                }
            }

            // At most one pending tick: a long commit fires the next tick
            // immediately instead of queueing a backlog.
            let now = Instant::now();
            next_tick += period;
            if next_tick < now {
                next_tick = now;
            }
        }
    }

    /// Track a tick-phase failure against the identical-signature gate.
    /// Returns true when the failure budget is exhausted.
    fn record_failure(&mut self, e: &CheckpointError) -> bool {
        let sig = error_signature(e);
        if self.state.last_error_signature.as_deref() == Some(sig.as_str()) {
            self.state.consecutive_failures += 1;
        } else {
            self.state.consecutive_failures = 1;
            self.state.last_error_signature = Some(sig);
        }
        self.state.consecutive_failures >= MAX_RETRIES
    }

    fn emit_summary(&self) {
        let elapsed = self.state.start_time.elapsed();
        self.logger.user("autocheckpoint: session summary");
        self.logger.user(&format!(
            "  checkpoints committed: {}",
            self.state.commits_made
        ));
        self.logger
            .user(&format!("  duration: {}", format_duration(elapsed)));
        self.logger
            .user(&format!("  branch: {}", self.state.branch_name));
        if self.state.created_branch {
            self.logger.user("  merge the checkpoints back with:");
            self.logger
                .user(&format!("    git merge {}", self.state.branch_name));
            self.logger.user("  or review them interactively:");
            self.logger
                .user(&format!("    git rebase -i {}", self.state.branch_name));
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum TickWait {
    Elapsed,
    Cancelled,
}

/// Two-handle wait: the timer deadline and the cancellation flag, polled
/// together so a signal never has to wait out a full interval.
fn wait_until(cancel: &CancelFlag, deadline: Instant) -> TickWait {
    loop {
        if cancel.is_cancelled() {
            return TickWait::Cancelled;
        }
        let now = Instant::now();
        if now >= deadline {
            return TickWait::Elapsed;
        }
        thread::sleep((deadline - now).min(Duration::from_millis(100)));
    }
}

/// Non-recoverable tick failures skip the retry gate entirely, e.g. the
/// repository path vanished out from under us.
fn is_unrecoverable(e: &CheckpointError) -> bool {
    matches!(e, CheckpointError::Io(io) if io.kind() == std::io::ErrorKind::NotFound)
}

/// Wall-clock duration as `NhMMmSSs`, dropping leading zero units.
pub fn format_duration(d: Duration) -> String {
    let total = d.as_secs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    if hours > 0 {
        format!("{hours}h {minutes:02}m {seconds:02}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds:02}s")
    } else {
        format!("{seconds}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transient(msg: &str) -> CheckpointError {
        CheckpointError::VcsTransient(msg.to_string())
    }

    fn supervisor_for_test() -> Supervisor<'static> {
        use crate::cli::Cli;
        use clap::Parser;
        use once_cell::sync::Lazy;
        static LOGGER: Lazy<Logger> = Lazy::new(Logger::disabled);
        // The repo path only needs to exist for config resolution.
        let cli = Cli::parse_from(["autocheckpoint", "--repo", "/tmp", "--quiet"]);
        let config = Config::resolve(&cli).expect("resolve failed");
        Supervisor::new(config, &LOGGER)
    }

    #[test]
    fn test_identical_failures_escalate_at_max_retries() {
        let mut sup = supervisor_for_test();
        let e = transient("could not lock index");
        assert!(!sup.record_failure(&e));
        assert!(!sup.record_failure(&e));
        assert!(sup.record_failure(&e));
        assert_eq!(sup.state().consecutive_failures, MAX_RETRIES);
    }

    #[test]
    fn test_different_signatures_reset_the_run() {
        let mut sup = supervisor_for_test();
        assert!(!sup.record_failure(&transient("could not lock index")));
        assert!(!sup.record_failure(&transient("could not lock index")));
        // A different failure breaks the run of identical signatures.
        assert!(!sup.record_failure(&transient("network mount flapped")));
        assert_eq!(sup.state().consecutive_failures, 1);
        assert!(!sup.record_failure(&transient("could not lock index")));
        assert_eq!(sup.state().consecutive_failures, 1);
    }

    #[test]
    fn test_signature_gate_ignores_substitutable_tokens() {
        let mut sup = supervisor_for_test();
        assert!(!sup.record_failure(&transient(
            "unable to create '/a/.git/index.lock': File exists"
        )));
        assert!(!sup.record_failure(&transient(
            "unable to create '/b/.git/index.lock': File exists"
        )));
        assert!(sup.record_failure(&transient(
            "unable to create '/c/.git/index.lock': File exists"
        )));
    }

    #[test]
    fn test_wait_until_observes_cancellation_quickly() {
        let cancel = CancelFlag::new();
        cancel.cancel();
        let started = Instant::now();
        let outcome = wait_until(&cancel, Instant::now() + Duration::from_secs(60));
        assert_eq!(outcome, TickWait::Cancelled);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_wait_until_elapses_without_cancel() {
        let cancel = CancelFlag::new();
        let outcome = wait_until(&cancel, Instant::now() + Duration::from_millis(50));
        assert_eq!(outcome, TickWait::Elapsed);
    }

    #[test]
    fn test_format_duration_units() {
        assert_eq!(format_duration(Duration::from_secs(42)), "42s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 05s");
        assert_eq!(format_duration(Duration::from_secs(3723)), "1h 02m 03s");
        assert_eq!(format_duration(Duration::from_secs(0)), "0s");
    }

    #[test]
    fn test_unrecoverable_classifier() {
        let gone = CheckpointError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "repo vanished",
        ));
        assert!(is_unrecoverable(&gone));
        assert!(!is_unrecoverable(&transient("index.lock")));
    }
}
