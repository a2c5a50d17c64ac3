//! Tracing setup.
//!
//! Plain commands log to stderr. The interactive board owns the terminal, so
//! it logs to a file under `$HOME/.taskboard/` instead.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable holding a full filter directive, e.g. `taskboard=trace`.
pub const LOG_ENV: &str = "TASKBOARD_LOG";

fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "taskboard=debug,info"
    } else {
        "taskboard=info,warn"
    }
}

fn filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)))
}

/// Where the interactive board writes its log.
pub fn log_file_path() -> Option<PathBuf> {
    let home = std::env::var_os("HOME")?;
    Some(PathBuf::from(home).join(".taskboard").join("taskboard.log"))
}

/// Install the global subscriber. Call once, before anything logs.
pub fn init_tracing(verbose: bool, log_file: Option<&Path>) {
    let registry = tracing_subscriber::registry().with(filter(verbose));

    if let Some(path) = log_file {
        match open_log_file(path) {
            Ok(file) => {
                registry
                    .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
                    .init();
                return;
            }
            Err(e) => {
                eprintln!(
                    "Warning: could not open log file {}: {}. Falling back to stderr.",
                    path.display(),
                    e
                );
            }
        }
    }

    registry
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .init();
}

fn open_log_file(path: &Path) -> std::io::Result<fs::File> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}
