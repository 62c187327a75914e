//! Append-only, timestamped run log.
//!
//! The orchestrator owns a single `RunLog` for the duration of a run. Every
//! line it writes is prefixed with a `[YYYY-MM-DD HH:MM:SS]` timestamp and
//! mirrored to the console through `tracing`. The sink is single-writer by
//! construction; nothing else holds the file open.

use chrono::Local;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct RunLog {
    file: File,
    path: PathBuf,
}

impl RunLog {
    /// Open (or create) the log file in append mode, creating parent
    /// directories as needed.
    pub fn open(path: &Path) -> Result<Self, std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Append an informational line and mirror it to stdout.
    pub fn info(&mut self, message: impl AsRef<str>) {
        let message = message.as_ref();
        tracing::info!("{message}");
        self.append(message);
    }

    /// Append an error line and mirror it to stderr.
    pub fn error(&mut self, message: impl AsRef<str>) {
        let message = message.as_ref();
        tracing::error!("{message}");
        self.append(message);
    }

    fn append(&mut self, message: &str) {
        let timestamp = Local::now().format(TIMESTAMP_FORMAT);
        if let Err(e) = writeln!(self.file, "[{timestamp}] {message}") {
            warn!(path = %self.path.display(), error = %e, "Failed to write run log");
        }
    }
}
