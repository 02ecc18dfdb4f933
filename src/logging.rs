//! File logging.
//!
//! The terminal belongs to the UI, so log records go to a file. `RUST_LOG`
//! takes precedence over `logging.level` when set.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use env_logger::{Builder, Env, Target};

use crate::config::{LoggingSettings, default_log_path};

/// Where records will be written, if anywhere.
pub fn log_path(settings: &LoggingSettings) -> Option<PathBuf> {
    settings.file.clone().or_else(default_log_path)
}

fn open_log_file(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Install the global logger. Returns the log file in use, or `None` when
/// logging is off because no file could be opened.
pub fn init(settings: &LoggingSettings) -> Option<PathBuf> {
    let path = log_path(settings)?;
    let file = match open_log_file(&path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("bandstand: logging disabled, cannot open {}: {e}", path.display());
            return None;
        }
    };

    let installed = Builder::from_env(Env::default().default_filter_or(settings.level.as_str()))
        .target(Target::Pipe(Box::new(file)))
        .format_timestamp_millis()
        .try_init();

    match installed {
        Ok(()) => Some(path),
        Err(_) => None,
    }
}
