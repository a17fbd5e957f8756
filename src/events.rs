use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Structured event emitted while moving or rolling back.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    RunStarted {
        operation_id: Uuid,
        root: PathBuf,
        mode: String,
        total_files: usize,
    },
    FileMoved {
        operation_id: Uuid,
        source: PathBuf,
        destination: PathBuf,
    },
    FileSkipped {
        path: PathBuf,
    },
    FileFailed {
        path: PathBuf,
        error: String,
    },
    DirectoryRemoved {
        path: PathBuf,
    },
    RunCompleted {
        operation_id: Uuid,
        moved: usize,
        failed: usize,
    },
    RunCancelled {
        operation_id: Uuid,
    },
    RollbackStarted {
        operation_id: Uuid,
        moves: usize,
    },
    MoveReverted {
        source: PathBuf,
        destination: PathBuf,
    },
    RevertFailed {
        source: PathBuf,
        destination: PathBuf,
        error: String,
    },
    RollbackCompleted {
        operation_id: Uuid,
        reverted: usize,
        skipped: usize,
        failed: usize,
    },
}

/// Receiver of engine events.
pub trait EventSink {
    fn record(&mut self, event: Event);
}

impl<F: FnMut(Event)> EventSink for F {
    fn record(&mut self, event: Event) {
        self(event)
    }
}

/// Sink that drops everything.
pub struct Discard;

impl EventSink for Discard {
    fn record(&mut self, _event: Event) {}
}
