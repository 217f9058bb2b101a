//! autocheckpoint: periodically commit uncommitted changes in a git working
//! copy as numbered checkpoint commits, on a dedicated session branch, with
//! at most one instance per repository.

pub mod banner;
pub mod branch;
pub mod cli;
pub mod color;
pub mod committer;
pub mod config;
pub mod errors;
pub mod exec;
pub mod lock;
pub mod logger;
pub mod probe;
pub mod signals;
pub mod supervisor;

pub use cli::Cli;
pub use config::Config;
pub use errors::{error_signature, exit_code_for_error, CheckpointError};
pub use lock::{lock_path_for, read_lock_pid, RepoLock};
pub use logger::Logger;
pub use signals::CancelFlag;
pub use supervisor::Supervisor;
