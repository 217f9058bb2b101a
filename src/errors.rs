//! Error mapping guide:
//! - Startup-phase errors (Config, Platform, Lock*, NotARepository) are fatal
//!   before the tick loop starts; tick-phase errors go through the
//!   identical-signature retry gate in the supervisor.
//! - Every variant maps to a stable exit code via exit_code_for_error.
use std::fmt;
use std::io;

/// Failure taxonomy for the whole tool. Classification decides both the exit
/// code and whether the supervisor may keep ticking.
#[derive(Debug)]
pub enum CheckpointError {
    /// Invalid or self-inconsistent configuration at startup.
    Config(String),
    /// Unsupported host platform (advisory locks need POSIX semantics).
    Platform(String),
    /// Another live instance holds the repository lock (0 = owner unknown).
    LockContention(u32),
    /// Lock present with no live owner and reclaiming it failed.
    LockStale(String),
    /// Target path is not a git working tree.
    NotARepository(String),
    /// A git invocation failed in a way that may recover (index lock, I/O blip).
    VcsTransient(String),
    /// A git invocation failed in a way unlikely to recover.
    VcsPermanent(String),
    /// Lock file, log file, or working-tree I/O failure.
    Io(io::Error),
    /// Invariant violation; a bug in this program.
    Internal(String),
}

impl fmt::Display for CheckpointError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckpointError::Config(msg) => write!(f, "invalid configuration: {msg}"),
            CheckpointError::Platform(msg) => write!(f, "unsupported platform: {msg}"),
            CheckpointError::LockContention(pid) => {
                if *pid == 0 {
                    write!(f, "another instance is already running for this repository")
                } else {
                    write!(
                        f,
                        "another instance is already running for this repository (pid {pid})"
                    )
                }
            }
            CheckpointError::LockStale(msg) => {
                write!(f, "stale lock could not be reclaimed: {msg}")
            }
            CheckpointError::NotARepository(path) => {
                write!(f, "not a git repository: {path}")
            }
            CheckpointError::VcsTransient(msg) => write!(f, "git failed (transient): {msg}"),
            CheckpointError::VcsPermanent(msg) => write!(f, "git failed: {msg}"),
            CheckpointError::Io(e) => write!(f, "i/o error: {e}"),
            CheckpointError::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for CheckpointError {}

impl From<io::Error> for CheckpointError {
    fn from(e: io::Error) -> Self {
        CheckpointError::Io(e)
    }
}

/// Map an error to a stable process exit code. 0 is reserved for
/// user-initiated shutdown and never produced here.
pub fn exit_code_for_error(e: &CheckpointError) -> u8 {
    match e {
        CheckpointError::Config(_) => 2,
        CheckpointError::Platform(_) => 3,
        CheckpointError::LockContention(_) => 4,
        CheckpointError::LockStale(_) => 5,
        CheckpointError::NotARepository(_) => 6,
        CheckpointError::VcsTransient(_) | CheckpointError::VcsPermanent(_) => 7,
        CheckpointError::Io(_) => 8,
        CheckpointError::Internal(_) => 9,
    }
}

/// Canonical signature used by the supervisor's identical-failure gate.
/// Truncates the message at the first substitutable token (digit or path
/// separator) so PIDs, timestamps, and file names do not defeat equality.
pub fn error_signature(e: &CheckpointError) -> String {
    let (kind, msg) = match e {
        CheckpointError::Config(m) => ("config", m.as_str()),
        CheckpointError::Platform(m) => ("platform", m.as_str()),
        CheckpointError::LockContention(_) => ("lock-contention", ""),
        CheckpointError::LockStale(m) => ("lock-stale", m.as_str()),
        CheckpointError::NotARepository(m) => ("not-a-repository", m.as_str()),
        CheckpointError::VcsTransient(m) => ("vcs-transient", m.as_str()),
        CheckpointError::VcsPermanent(m) => ("vcs-permanent", m.as_str()),
        CheckpointError::Io(err) => return format!("io:{:?}", err.kind()),
        CheckpointError::Internal(m) => ("internal", m.as_str()),
    };
    let cut = msg
        .find(|c: char| c.is_ascii_digit() || c == '/')
        .unwrap_or(msg.len());
    format!("{}:{}", kind, msg[..cut].trim())
}
