use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Local};
use serde::Serialize;

/// A file that could not be moved.
#[derive(Debug, Clone, Serialize)]
pub struct FileError {
    pub path: PathBuf,
    pub message: String,
    pub at: DateTime<Local>,
}

/// Progress and error bookkeeping for one run. Never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct RunStatistics {
    pub total_files: usize,
    pub processed_files: usize,
    pub moved_files: usize,
    pub skipped_files: usize,
    pub bytes_moved: u64,
    pub current_file: Option<PathBuf>,
    pub errors: Vec<FileError>,
    pub started_at: DateTime<Local>,
    pub finished_at: Option<DateTime<Local>>,
    pub paused: Duration,
}

impl RunStatistics {
    pub fn new(total_files: usize) -> Self {
        Self {
            total_files,
            processed_files: 0,
            moved_files: 0,
            skipped_files: 0,
            bytes_moved: 0,
            current_file: None,
            errors: Vec::new(),
            started_at: Local::now(),
            finished_at: None,
            paused: Duration::ZERO,
        }
    }

    pub fn begin_file(&mut self, path: PathBuf) {
        self.current_file = Some(path);
    }

    pub fn record_moved(&mut self, bytes: u64) {
        self.processed_files += 1;
        self.moved_files += 1;
        self.bytes_moved += bytes;
    }

    pub fn record_skipped(&mut self) {
        self.processed_files += 1;
        self.skipped_files += 1;
    }

    pub fn record_error(&mut self, path: PathBuf, message: impl Into<String>) {
        self.processed_files += 1;
        self.errors.push(FileError {
            path,
            message: message.into(),
            at: Local::now(),
        });
    }

    pub fn finish(&mut self, paused: Duration) {
        self.current_file = None;
        self.paused = paused;
        self.finished_at = Some(Local::now());
    }

    /// Wall time minus paused time.
    pub fn active_duration(&self) -> Duration {
        let end = self.finished_at.unwrap_or_else(Local::now);
        let wall = (end - self.started_at).to_std().unwrap_or_default();
        wall.saturating_sub(self.paused)
    }

    pub fn percentage(&self) -> f64 {
        if self.total_files == 0 {
            100.0
        } else {
            self.processed_files as f64 / self.total_files as f64 * 100.0
        }
    }
}
