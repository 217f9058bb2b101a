//! Configuration resolution: defaults → environment → flags, in that order.
//!
//! Downstream code only ever sees a finalized, validated Config; nothing
//! below the resolver reads the environment or the CLI again.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cli::Cli;
use crate::errors::CheckpointError;
use crate::lock::repo_key_hash_hex;

pub const DEFAULT_INTERVAL_MINUTES: f64 = 5.0;
pub const DEFAULT_COMMIT_PREFIX: &str = "[autocheckpoint] Automatic checkpoint";

/// Immutable session configuration. Constructed once by `resolve`, never
/// mutated after the supervisor leaves its init phase.
#[derive(Debug, Clone)]
pub struct Config {
    /// Absolute repository path.
    pub repo_path: PathBuf,
    /// Minutes between checks; fractional, strictly positive.
    pub interval_minutes: f64,
    /// Branch to use/create; empty means "generate" (fresh mode) or
    /// "adopt current" (continue mode).
    pub branch_name: String,
    pub commit_prefix: String,
    pub create_branch: bool,
    pub continue_session: bool,
    pub verbose: bool,
    pub show_no_changes: bool,
    pub non_interactive: bool,
    pub debug: bool,
    pub log_file: PathBuf,
}

impl Config {
    /// Merge defaults, environment variables, and CLI flags; validate the
    /// result. Flags override environment, environment overrides defaults.
    pub fn resolve(cli: &Cli) -> Result<Config, CheckpointError> {
        let repo_path = cli
            .repo
            .clone()
            .or_else(|| env_string("REPO_PATH").map(PathBuf::from))
            .map(Ok)
            .unwrap_or_else(env::current_dir)
            .map_err(CheckpointError::Io)?;
        let repo_path = fs::canonicalize(&repo_path).map_err(|e| {
            CheckpointError::Config(format!(
                "repository path {} is not accessible: {e}",
                repo_path.display()
            ))
        })?;

        let interval_minutes = match cli.interval.or_else(|| env_f64("INTERVAL_MINUTES")) {
            Some(v) => v,
            None => DEFAULT_INTERVAL_MINUTES,
        };
        if !interval_minutes.is_finite() || interval_minutes <= 0.0 {
            return Err(CheckpointError::Config(format!(
                "interval must be a positive number of minutes (got {interval_minutes})"
            )));
        }

        let branch_name = cli
            .branch
            .clone()
            .or_else(|| env_string("BRANCH_NAME"))
            .unwrap_or_default();

        let commit_prefix = cli
            .prefix
            .clone()
            .or_else(|| env_string("COMMIT_PREFIX"))
            .unwrap_or_else(|| DEFAULT_COMMIT_PREFIX.to_string());
        if commit_prefix.trim().is_empty() {
            return Err(CheckpointError::Config(
                "commit prefix must not be empty".to_string(),
            ));
        }

        // --no-branch is a pure negative flag; absence falls through to env.
        let create_branch = if cli.no_branch {
            false
        } else {
            env_bool("CREATE_BRANCH").unwrap_or(true)
        };
        let continue_session =
            cli.continue_session || env_bool("CONTINUE_SESSION").unwrap_or(false);
        let verbose = if cli.quiet {
            false
        } else {
            env_bool("VERBOSE").unwrap_or(true)
        };
        let show_no_changes =
            cli.show_no_changes || env_bool("SHOW_NO_CHANGES").unwrap_or(false);
        let non_interactive =
            cli.non_interactive || env_bool("NON_INTERACTIVE").unwrap_or(false);
        let debug = cli.debug || env_bool("DEBUG").unwrap_or(false);

        let log_file = cli
            .log_file
            .clone()
            .or_else(|| env_string("LOG_FILE").map(PathBuf::from))
            .unwrap_or_else(|| default_log_path(&repo_path));

        Ok(Config {
            repo_path,
            interval_minutes,
            branch_name,
            commit_prefix,
            create_branch,
            continue_session,
            verbose,
            show_no_changes,
            non_interactive,
            debug,
            log_file,
        })
    }

    /// Tick period: fractional minutes scaled to seconds, floored at the
    /// 1-second scheduling quantum.
    pub fn tick_period(&self) -> Duration {
        let period = Duration::from_secs_f64(self.interval_minutes * 60.0);
        period.max(Duration::from_secs(1))
    }
}

fn env_string(name: &str) -> Option<String> {
    env::var(name).ok().filter(|s| !s.trim().is_empty())
}

fn env_f64(name: &str) -> Option<f64> {
    env_string(name).and_then(|s| s.trim().parse::<f64>().ok())
}

fn env_bool(name: &str) -> Option<bool> {
    let v = env_string(name)?;
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// `${XDG_DATA_HOME:-$HOME/.local/share}/autocheckpoint/logs/autocheckpoint-<hash8>.log`,
/// falling back to the system temp dir when no home directory is available.
pub fn default_log_path(repo_path: &Path) -> PathBuf {
    let hash = repo_key_hash_hex(repo_path, 8);
    let file = format!("autocheckpoint-{hash}.log");
    let data_home = env::var("XDG_DATA_HOME")
        .ok()
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .or_else(|| home::home_dir().map(|h| h.join(".local").join("share")));
    match data_home {
        Some(base) => base.join("autocheckpoint").join("logs").join(file),
        None => env::temp_dir().join(file),
    }
}
