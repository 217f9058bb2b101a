//! Per-repository single-instance guard.
//!
//! An advisory exclusive lock (fs2) is taken on a file in the system temp
//! directory whose name is derived from the canonical repository path. The
//! file body holds the owner's PID as ASCII decimal; the PID is a diagnostic
//! hint and drives stale-owner reclaim; authority rests with the
//! kernel-held advisory lock.

use fs2::FileExt;
use sha2::{Digest, Sha256};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::errors::CheckpointError;

/// Guard that releases the advisory lock and unlinks the lock file on drop.
#[derive(Debug)]
pub struct RepoLock {
    file: Option<File>,
    path: PathBuf,
}

impl Drop for RepoLock {
    fn drop(&mut self) {
        // Best-effort release; explicit release() reports errors instead.
        let _ = self.release();
    }
}

impl RepoLock {
    /// Acquire the repository lock, reclaiming a stale one if its recorded
    /// owner is no longer alive.
    pub fn acquire(repo_path: &Path) -> Result<RepoLock, CheckpointError> {
        #[cfg(not(unix))]
        {
            let _ = repo_path;
            return Err(CheckpointError::Platform(
                "advisory file locks require a POSIX host".to_string(),
            ));
        }
        #[cfg(unix)]
        {
            let path = lock_path_for(repo_path);
            Self::acquire_at(&path)
        }
    }

    /// Acquire a lock at a specific path (exposed for tests).
    #[cfg(unix)]
    pub fn acquire_at(path: &Path) -> Result<RepoLock, CheckpointError> {
        match Self::try_acquire_at(path)? {
            Some(lock) => Ok(lock),
            None => {
                // Advisory lock held elsewhere: inspect the PID hint.
                match read_lock_pid(path) {
                    Some(pid) if pid_is_alive(pid) => Err(CheckpointError::LockContention(pid)),
                    Some(_) => {
                        // Recorded owner is dead: the file is stale even
                        // though someone briefly holds the flock (e.g. an
                        // inherited descriptor). Unlink and retry exactly once.
                        fs::remove_file(path).map_err(|e| {
                            CheckpointError::LockStale(format!(
                                "failed to remove stale lock {}: {e}",
                                path.display()
                            ))
                        })?;
                        match Self::try_acquire_at(path)? {
                            Some(lock) => Ok(lock),
                            // Race lost to a new owner.
                            None => Err(CheckpointError::LockContention(0)),
                        }
                    }
                    None => Err(CheckpointError::LockContention(0)),
                }
            }
        }
    }

    /// One acquisition attempt: create-exclusive or open, then a non-blocking
    /// advisory lock. Ok(None) means the lock is held by another descriptor.
    #[cfg(unix)]
    fn try_acquire_at(path: &Path) -> Result<Option<RepoLock>, CheckpointError> {
        let mut file = match OpenOptions::new()
            .create_new(true)
            .read(true)
            .write(true)
            .open(path)
        {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => OpenOptions::new()
                .read(true)
                .write(true)
                .open(path)
                .map_err(CheckpointError::Io)?,
            Err(e) => return Err(CheckpointError::Io(e)),
        };

        match file.try_lock_exclusive() {
            Ok(()) => {
                // Lock held: record our PID at offset 0.
                file.set_len(0).map_err(CheckpointError::Io)?;
                file.seek(SeekFrom::Start(0)).map_err(CheckpointError::Io)?;
                file.write_all(std::process::id().to_string().as_bytes())
                    .map_err(CheckpointError::Io)?;
                file.flush().map_err(CheckpointError::Io)?;
                Ok(Some(RepoLock {
                    file: Some(file),
                    path: path.to_path_buf(),
                }))
            }
            Err(e) if lock_would_block(&e) => Ok(None),
            Err(e) => Err(CheckpointError::Io(e)),
        }
    }

    /// Release the lock: unlock, close, unlink. Idempotent; never leaves the
    /// advisory lock held even when the unlink fails. Returns the first error
    /// observed.
    pub fn release(&mut self) -> io::Result<()> {
        let Some(mut file) = self.file.take() else {
            return Ok(());
        };
        // Descriptor validity probe (stat + zero-byte write); failures here
        // are not fatal.
        let _ = file.metadata();
        let _ = file.write(&[]);
        let first_err = file.unlock().err();
        drop(file);
        let unlink_err = match fs::remove_file(&self.path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Some(e),
            _ => None,
        };
        match first_err.or(unlink_err) {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Both EWOULDBLOCK and EAGAIN mean "held by someone else"; they are the
/// same errno on most platforms but not all.
fn lock_would_block(e: &io::Error) -> bool {
    e.kind() == io::ErrorKind::WouldBlock || e.raw_os_error() == Some(libc::EAGAIN)
}

/// Lock file path: `<temp dir>/autocheckpoint-<first 16 hex of SHA-256(repo)>.lock`.
pub fn lock_path_for(repo_path: &Path) -> PathBuf {
    let key = repo_key_hash_hex(repo_path, 16);
    std::env::temp_dir().join(format!("autocheckpoint-{key}.lock"))
}

/// First `len` hex chars of SHA-256 over the canonical absolute repo path.
pub fn repo_key_hash_hex(repo_path: &Path, len: usize) -> String {
    let abs = fs::canonicalize(repo_path).unwrap_or_else(|_| repo_path.to_path_buf());
    let digest = Sha256::digest(abs.to_string_lossy().as_bytes());
    let mut hexed = hex::encode(digest);
    hexed.truncate(len);
    hexed
}

/// Parse the PID recorded in a lock file body, if any.
pub fn read_lock_pid(path: &Path) -> Option<u32> {
    let mut body = String::new();
    File::open(path).ok()?.read_to_string(&mut body).ok()?;
    body.trim().parse::<u32>().ok()
}

/// Probe liveness by sending the null signal. EPERM means the process
/// exists but belongs to someone else, which still counts as alive.
#[cfg(unix)]
fn pid_is_alive(pid: u32) -> bool {
    use nix::errno::Errno;
    use nix::sys::signal::kill;
    use nix::unistd::Pid;
    match kill(Pid::from_raw(pid as i32), None) {
        Ok(()) => true,
        Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}
