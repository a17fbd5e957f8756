use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Error, FileMoveError, Result};
use crate::events::{Event, EventSink};
use crate::fsops;
use crate::journal::OperationLog;
use crate::model::{Move, Operation, OperationStatus};

/// Outcome of a rollback. Per-move failures land here instead of aborting.
#[derive(Debug, Clone, Default)]
pub struct RollbackReport {
    pub operation_id: Uuid,
    pub reverted: Vec<Move>,
    /// Moves whose destination no longer exists.
    pub skipped: Vec<Move>,
    pub failed: Vec<(Move, String)>,
    /// Directories the run created that were empty again after rollback.
    pub pruned: Vec<PathBuf>,
}

impl RollbackReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct RollbackEngine<'a> {
    log: &'a OperationLog,
}

impl<'a> RollbackEngine<'a> {
    pub fn new(log: &'a OperationLog) -> Self {
        Self { log }
    }

    /// Undo a completed operation.
    ///
    /// Unfinished runs are rolled back only through cancellation.
    pub fn rollback(&self, id: &Uuid, sink: &mut dyn EventSink) -> Result<RollbackReport> {
        let op = self.log.find(id)?;
        if op.status != OperationStatus::Completed {
            return Err(Error::NotRollbackable {
                id: *id,
                status: op.status,
            });
        }
        Ok(self.replay(&op, sink))
    }

    /// Undo whatever an unfinished (or just cancelled) run managed to log.
    pub(crate) fn rollback_unfinished(&self, id: &Uuid, sink: &mut dyn EventSink) -> Result<RollbackReport> {
        let op = self.log.find(id)?;
        if op.status == OperationStatus::Completed {
            return Err(Error::NotRollbackable {
                id: *id,
                status: op.status,
            });
        }
        Ok(self.replay(&op, sink))
    }

    fn replay(&self, op: &Operation, sink: &mut dyn EventSink) -> RollbackReport {
        info!(id = %op.id, moves = op.moves.len(), status = %op.status, "rolling back operation");
        sink.record(Event::RollbackStarted {
            operation_id: op.id,
            moves: op.moves.len(),
        });

        let mut report = RollbackReport {
            operation_id: op.id,
            ..Default::default()
        };

        for mv in op.moves.iter().rev() {
            match revert(mv) {
                Ok(true) => {
                    debug!(from = %mv.destination.display(), to = %mv.source.display(), "move reverted");
                    sink.record(Event::MoveReverted {
                        source: mv.source.clone(),
                        destination: mv.destination.clone(),
                    });
                    report.reverted.push(mv.clone());
                }
                Ok(false) => {
                    debug!(path = %mv.destination.display(), "destination gone, skipping");
                    report.skipped.push(mv.clone());
                }
                Err(e) => {
                    warn!(from = %mv.destination.display(), to = %mv.source.display(), error = %e, "could not revert move");
                    sink.record(Event::RevertFailed {
                        source: mv.source.clone(),
                        destination: mv.destination.clone(),
                        error: e.to_string(),
                    });
                    report.failed.push((mv.clone(), e.to_string()));
                }
            }
        }

        report.pruned = fsops::remove_empty_dirs(
            op.moves
                .iter()
                .flat_map(|mv| &mv.created_dirs)
                .map(PathBuf::as_path),
        );
        for dir in &report.pruned {
            debug!(path = %dir.display(), "removed directory created by the run");
        }

        info!(
            id = %op.id,
            reverted = report.reverted.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "rollback finished"
        );
        sink.record(Event::RollbackCompleted {
            operation_id: op.id,
            reverted: report.reverted.len(),
            skipped: report.skipped.len(),
            failed: report.failed.len(),
        });
        report
    }
}

/// Returns `Ok(false)` when there is nothing left at the destination.
fn revert(mv: &Move) -> std::result::Result<bool, FileMoveError> {
    if !exists(&mv.destination) {
        return Ok(false);
    }
    if exists(&mv.source) {
        return Err(FileMoveError::io(
            "restore",
            &mv.source,
            std::io::Error::new(std::io::ErrorKind::AlreadyExists, "original path is occupied"),
        ));
    }
    fsops::ensure_parent(&mv.source)?;
    fsops::move_file(&mv.destination, &mv.source)?;
    Ok(true)
}

fn exists(path: &Path) -> bool {
    std::fs::symlink_metadata(path).is_ok()
}
