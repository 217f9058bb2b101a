//! Dual-channel logging sink.
//!
//! User-visible output goes to stdout/stderr through the color helpers; the
//! internal channel is an append-only debug file (enabled with --debug).
//! Writes are serialized by the internal mutex, so a shared &Logger is safe.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Local;

use crate::color::{color_enabled_stderr, log_error_stderr, log_info_stderr, log_warn_stderr};
use crate::config::Config;

#[derive(Debug)]
pub struct Logger {
    verbose: bool,
    use_color_stderr: bool,
    sink: Mutex<Option<File>>,
    path: Option<PathBuf>,
}

impl Logger {
    /// Build the session logger. With --debug the log file (and its parent
    /// directories) are created eagerly so failures surface at startup.
    pub fn new(config: &Config) -> io::Result<Logger> {
        let (sink, path) = if config.debug {
            if let Some(parent) = config.log_file.parent() {
                fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&config.log_file)?;
            (Some(file), Some(config.log_file.clone()))
        } else {
            (None, None)
        };
        Ok(Logger {
            verbose: config.verbose,
            use_color_stderr: color_enabled_stderr(),
            sink: Mutex::new(sink),
            path,
        })
    }

    /// Quiet logger with no file sink (used by tests).
    pub fn disabled() -> Logger {
        Logger {
            verbose: false,
            use_color_stderr: false,
            sink: Mutex::new(None),
            path: None,
        }
    }

    pub fn log_path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// User-visible line, always emitted (summary, fatal diagnostics).
    pub fn user(&self, msg: &str) {
        println!("{msg}");
        self.to_file("user", msg);
    }

    /// Informational line; suppressed by --quiet.
    pub fn info(&self, msg: &str) {
        if self.verbose {
            log_info_stderr(self.use_color_stderr, msg);
        }
        self.to_file("info", msg);
    }

    pub fn warn(&self, msg: &str) {
        log_warn_stderr(self.use_color_stderr, msg);
        self.to_file("warn", msg);
    }

    pub fn error(&self, msg: &str) {
        log_error_stderr(self.use_color_stderr, msg);
        self.to_file("error", msg);
    }

    /// Internal channel only; no terminal output.
    pub fn debug(&self, msg: &str) {
        self.to_file("debug", msg);
    }

    fn to_file(&self, level: &str, msg: &str) {
        let mut guard = match self.sink.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(file) = guard.as_mut() {
            let ts = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
            // Sink failures must never take the supervisor down.
            let _ = writeln!(file, "{ts} [{level}] {msg}");
        }
    }

    /// Flush and drop the file sink. Idempotent.
    pub fn close(&self) -> io::Result<()> {
        let mut guard = match self.sink.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(mut file) = guard.take() {
            file.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    fn debug_config(dir: &Path) -> Config {
        let log = dir.join("logs").join("t.log");
        let cli = Cli::parse_from([
            "autocheckpoint",
            "--repo",
            &dir.display().to_string(),
            "--debug",
            "--log-file",
            &log.display().to_string(),
            "--quiet",
        ]);
        Config::resolve(&cli).expect("resolve failed")
    }

    #[test]
    fn test_debug_lines_reach_the_file() {
        let td = tempfile::tempdir().expect("tmpdir");
        let cfg = debug_config(td.path());
        let logger = Logger::new(&cfg).expect("logger init failed");
        logger.debug("first line");
        logger.info("second line");
        logger.close().expect("close failed");
        let body = fs::read_to_string(&cfg.log_file).expect("log file missing");
        assert!(body.contains("[debug] first line"), "log body: {body}");
        assert!(body.contains("[info] second line"), "log body: {body}");
    }

    #[test]
    fn test_parent_directories_are_created() {
        let td = tempfile::tempdir().expect("tmpdir");
        let cfg = debug_config(td.path());
        assert!(!cfg.log_file.parent().unwrap().exists());
        let logger = Logger::new(&cfg).expect("logger init failed");
        logger.close().expect("close failed");
        assert!(cfg.log_file.exists());
    }

    #[test]
    fn test_close_is_idempotent() {
        let td = tempfile::tempdir().expect("tmpdir");
        let cfg = debug_config(td.path());
        let logger = Logger::new(&cfg).expect("logger init failed");
        logger.close().expect("first close failed");
        logger.close().expect("second close failed");
    }

    #[test]
    fn test_disabled_logger_has_no_sink() {
        let logger = Logger::disabled();
        logger.debug("dropped");
        assert!(logger.log_path().is_none());
        logger.close().expect("close failed");
    }
}
