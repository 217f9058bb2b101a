use std::process::ExitCode;

use clap::Parser;

use autocheckpoint::banner::print_startup_banner;
use autocheckpoint::color::{self, ColorMode};
use autocheckpoint::errors::exit_code_for_error;
#[cfg(unix)]
use autocheckpoint::signals::install_signal_handlers;
use autocheckpoint::{CancelFlag, Cli, Config, Logger, Supervisor};

fn main() -> ExitCode {
    // .env values participate in the environment layer of the resolver;
    // a missing file is not an error.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    color::set_color_mode(cli.color.unwrap_or(ColorMode::Auto));

    if cli.logo {
        print_startup_banner();
        return ExitCode::from(0);
    }

    let config = match Config::resolve(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("autocheckpoint: {e}");
            return ExitCode::from(exit_code_for_error(&e));
        }
    };

    let logger = match Logger::new(&config) {
        Ok(l) => l,
        Err(e) => {
            eprintln!(
                "autocheckpoint: cannot open log file {}: {e}",
                config.log_file.display()
            );
            return ExitCode::from(8);
        }
    };
    if config.debug {
        logger.debug(&format!(
            "starting v{} for {}",
            env!("CARGO_PKG_VERSION"),
            config.repo_path.display()
        ));
    }
    if let Some(path) = logger.log_path() {
        logger.info(&format!("autocheckpoint: debug log at {}", path.display()));
    }
    echo_config(&logger, &config);

    let cancel = match install_cancel_flag() {
        Ok(flag) => flag,
        Err(e) => {
            eprintln!("autocheckpoint: cannot install signal handlers: {e}");
            return ExitCode::from(3);
        }
    };

    let mut supervisor = Supervisor::new(config, &logger);
    let code = match supervisor.run(&cancel) {
        Ok(()) => 0,
        Err(e) => {
            logger.error(&format!("autocheckpoint: {e}"));
            exit_code_for_error(&e)
        }
    };

    if let Err(e) = logger.close() {
        eprintln!("autocheckpoint: log flush failed: {e}");
    }
    ExitCode::from(code)
}

/// Resolved-configuration echo; info channel, so --quiet drops it.
fn echo_config(logger: &Logger, config: &Config) {
    logger.info(&format!(
        "autocheckpoint: repo={}",
        config.repo_path.display()
    ));
    logger.info(&format!(
        "autocheckpoint: interval={}m prefix={:?}",
        config.interval_minutes, config.commit_prefix
    ));
    let mode = if config.continue_session {
        "continue"
    } else if config.create_branch {
        "fresh-branch"
    } else {
        "current-branch"
    };
    let branch = if config.branch_name.is_empty() {
        "(auto)"
    } else {
        &config.branch_name
    };
    logger.info(&format!("autocheckpoint: mode={mode} branch={branch}"));
}

#[cfg(unix)]
fn install_cancel_flag() -> Result<CancelFlag, String> {
    install_signal_handlers().map_err(|e| e.to_string())
}

#[cfg(not(unix))]
fn install_cancel_flag() -> Result<CancelFlag, String> {
    Ok(CancelFlag::new())
}
