use std::path::PathBuf;

use clap::Parser;

use crate::color::ColorMode;

/// Watches a git working copy and periodically commits any uncommitted
/// changes as numbered checkpoint commits.
#[derive(Parser, Debug)]
#[command(
    name = "autocheckpoint",
    version,
    about = "Periodically commit uncommitted changes as numbered checkpoints.",
    after_long_help = "Examples:\n  autocheckpoint\n  autocheckpoint --interval 2.5 --prefix '[wip] Snapshot'\n  autocheckpoint --no-branch --continue\n  autocheckpoint --repo /path/to/repo --debug\n"
)]
pub struct Cli {
    /// Minutes between checkpoint checks (fractional allowed, must be > 0)
    #[arg(long, allow_negative_numbers = true)]
    pub interval: Option<f64>,

    /// Branch to use or create; defaults to a generated name (fresh mode)
    /// or the current branch (continue mode)
    #[arg(long)]
    pub branch: Option<String>,

    /// Commit-message prefix for checkpoint commits
    #[arg(long)]
    pub prefix: Option<String>,

    /// Stay on the current branch instead of creating a session branch
    #[arg(long = "no-branch")]
    pub no_branch: bool,

    /// Continue numbering on an existing branch
    #[arg(long = "continue")]
    pub continue_session: bool,

    /// Suppress informational output
    #[arg(long, short = 'q')]
    pub quiet: bool,

    /// Log ticks that found no changes
    #[arg(long = "show-no-changes")]
    pub show_no_changes: bool,

    /// Repository root (default: current directory)
    #[arg(long)]
    pub repo: Option<PathBuf>,

    /// Never prompt; fail instead of asking
    #[arg(long = "non-interactive")]
    pub non_interactive: bool,

    /// Enable file logging
    #[arg(long)]
    pub debug: bool,

    /// Log file path (default: XDG data directory)
    #[arg(long = "log-file")]
    pub log_file: Option<PathBuf>,

    /// Colorize output: auto|always|never
    #[arg(long = "color", value_enum)]
    pub color: Option<ColorMode>,

    /// Print the startup banner and exit
    #[arg(long)]
    pub logo: bool,
}
