use std::path::{Path, PathBuf};

use path_absolutize::Absolutize;
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use walkdir::WalkDir;

use crate::conflict;
use crate::control::{Checkpoint, RunControl};
use crate::error::{Error, FileMoveError, Result};
use crate::events::{Event, EventSink};
use crate::fsops;
use crate::journal::OperationLog;
use crate::model::MoveMode;
use crate::rollback::{RollbackEngine, RollbackReport};
use crate::stats::RunStatistics;
use crate::transform;
use crate::validate;

/// Lifecycle of one run. `Paused` is only ever entered from `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    #[default]
    Idle,
    Running,
    Paused,
    Completed,
    Cancelled,
}

/// Everything a single run owns.
#[derive(Debug)]
pub struct RunContext {
    pub operation_id: Uuid,
    pub root: PathBuf,
    pub mode: MoveMode,
    pub stats: RunStatistics,
    state: RunState,
    control: RunControl,
    pending: Vec<walkdir::Result<walkdir::DirEntry>>,
}

impl RunContext {
    pub fn state(&self) -> RunState {
        if self.state == RunState::Running && self.control.is_paused() {
            RunState::Paused
        } else {
            self.state
        }
    }
}

/// Final account of a run handed back to the caller.
#[derive(Debug)]
pub struct RunReport {
    pub operation_id: Uuid,
    pub state: RunState,
    pub stats: RunStatistics,
    /// Present when the run was cancelled and rolled back.
    pub rollback: Option<RollbackReport>,
}

pub struct MoveEngine<'a> {
    log: &'a OperationLog,
    control: RunControl,
    excluded: Option<PathBuf>,
}

impl<'a> MoveEngine<'a> {
    pub fn new(log: &'a OperationLog) -> Self {
        Self::with_control(log, RunControl::new())
    }

    pub fn with_control(log: &'a OperationLog, control: RunControl) -> Self {
        let excluded = log.dir().absolutize().ok().map(|p| p.into_owned());
        Self {
            log,
            control,
            excluded,
        }
    }

    /// Handle for pausing, resuming or cancelling from elsewhere.
    pub fn control(&self) -> &RunControl {
        &self.control
    }

    pub fn pause(&self) {
        if self.control.pause() {
            info!("run paused");
        }
    }

    pub fn resume(&self) {
        if self.control.resume() {
            info!("run resumed");
        }
    }

    /// Run a whole operation: start, process every file, then complete or
    /// roll back.
    ///
    /// Per-file failures are recorded in the returned statistics. Errors
    /// before the operation is logged are returned as they are; a storage
    /// failure afterwards rolls back what was logged so far and comes back
    /// as [`Error::Aborted`].
    pub fn run(&self, root: &Path, mode: &MoveMode, sink: &mut dyn EventSink) -> Result<RunReport> {
        let mut ctx = self.start(root, mode, sink)?;

        let rollback = match self.process(&mut ctx, sink) {
            Ok(Checkpoint::Continue) => match self.end(&mut ctx, sink) {
                Ok(()) => None,
                Err(e) => return Err(self.abort(&mut ctx, e, sink)),
            },
            Ok(Checkpoint::Cancel) => self.cancel(&mut ctx, sink),
            Err(e) => return Err(self.abort(&mut ctx, e, sink)),
        };

        Ok(RunReport {
            operation_id: ctx.operation_id,
            state: ctx.state(),
            stats: ctx.stats,
            rollback,
        })
    }

    /// Validate inputs, open the operation log and snapshot the tree.
    pub fn start(&self, root: &Path, mode: &MoveMode, sink: &mut dyn EventSink) -> Result<RunContext> {
        let root = validate::resolve_root(root)?;
        let mode = validate::normalize_mode(mode)?;
        let operation_id = self.log.create(root.clone(), mode.clone())?;

        let pending = self.snapshot(&root, &mode);
        let total_files = pending
            .iter()
            .filter(|e| !matches!(e, Ok(entry) if entry.file_type().is_dir()))
            .count();

        info!(id = %operation_id, root = %root.display(), %mode, total_files, "run started");
        sink.record(Event::RunStarted {
            operation_id,
            root: root.clone(),
            mode: mode.to_string(),
            total_files,
        });

        Ok(RunContext {
            operation_id,
            root,
            mode,
            stats: RunStatistics::new(total_files),
            state: RunState::Running,
            control: self.control.clone(),
            pending,
        })
    }

    /// The walk is collected up front so that files landing in directories
    /// not yet visited are never picked up a second time.
    fn snapshot(&self, root: &Path, mode: &MoveMode) -> Vec<walkdir::Result<walkdir::DirEntry>> {
        let contents_first = matches!(mode, MoveMode::Upward { .. });
        let excluded = self.excluded.as_deref();
        WalkDir::new(root)
            .min_depth(1)
            .sort_by_file_name()
            .contents_first(contents_first)
            .into_iter()
            .filter_entry(|e| excluded.is_none_or(|x| !e.path().starts_with(x)))
            .collect()
    }

    /// Process pending entries until done or cancelled. A cancel that
    /// arrives during the last file is still honored.
    ///
    /// Only a log failure is returned as an error.
    pub fn process(&self, ctx: &mut RunContext, sink: &mut dyn EventSink) -> Result<Checkpoint> {
        let pending = std::mem::take(&mut ctx.pending);
        for entry in pending {
            let signal = self.control.checkpoint();
            ctx.stats.paused = self.control.paused_duration();
            if signal == Checkpoint::Cancel {
                return Ok(Checkpoint::Cancel);
            }

            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| ctx.root.clone());
                    warn!(path = %path.display(), error = %e, "could not read entry");
                    sink.record(Event::FileFailed {
                        path: path.clone(),
                        error: e.to_string(),
                    });
                    ctx.stats.record_error(path, e.to_string());
                    continue;
                }
            };

            if entry.file_type().is_dir() {
                if let MoveMode::Upward {
                    delete_empty: true, ..
                } = ctx.mode
                {
                    remove_empty_dir(entry.path(), sink);
                }
                continue;
            }

            self.process_file(ctx, entry.path(), sink)?;
        }
        let signal = self.control.checkpoint();
        ctx.stats.paused = self.control.paused_duration();
        Ok(signal)
    }

    fn process_file(&self, ctx: &mut RunContext, source: &Path, sink: &mut dyn EventSink) -> Result<()> {
        ctx.stats.begin_file(source.to_path_buf());

        let target = match target_for(&ctx.root, &ctx.mode, source) {
            Some(target) if target != source => target,
            _ => {
                debug!(path = %source.display(), "already in place");
                sink.record(Event::FileSkipped {
                    path: source.to_path_buf(),
                });
                ctx.stats.record_skipped();
                return Ok(());
            }
        };

        let (destination, bytes, created_dirs) = match relocate(source, &target) {
            Ok(moved) => moved,
            Err(e) => {
                warn!(path = %source.display(), error = %e, "file not moved");
                sink.record(Event::FileFailed {
                    path: source.to_path_buf(),
                    error: e.to_string(),
                });
                ctx.stats.record_error(source.to_path_buf(), e.to_string());
                return Ok(());
            }
        };

        let logged = self
            .log
            .append_with_dirs(&ctx.operation_id, source, &destination, created_dirs.clone());
        if let Err(e) = logged {
            // An unlogged move could never be rolled back.
            match fsops::move_file(&destination, source) {
                Ok(_) => {
                    fsops::remove_empty_dirs(created_dirs.iter().map(PathBuf::as_path));
                }
                Err(undo) => {
                    error!(from = %destination.display(), to = %source.display(), error = %undo, "could not undo unlogged move");
                }
            }
            return Err(e);
        }

        debug!(from = %source.display(), to = %destination.display(), "moved");
        sink.record(Event::FileMoved {
            operation_id: ctx.operation_id,
            source: source.to_path_buf(),
            destination,
        });
        ctx.stats.record_moved(bytes);
        Ok(())
    }

    /// Mark the operation completed.
    pub fn end(&self, ctx: &mut RunContext, sink: &mut dyn EventSink) -> Result<()> {
        if ctx.state != RunState::Running {
            warn!(id = %ctx.operation_id, state = ?ctx.state, "run already finished");
            return Ok(());
        }
        self.log.complete(&ctx.operation_id)?;
        ctx.state = RunState::Completed;
        ctx.stats.finish(self.control.paused_duration());

        info!(
            id = %ctx.operation_id,
            moved = ctx.stats.moved_files,
            failed = ctx.stats.errors.len(),
            "run completed"
        );
        sink.record(Event::RunCompleted {
            operation_id: ctx.operation_id,
            moved: ctx.stats.moved_files,
            failed: ctx.stats.errors.len(),
        });
        Ok(())
    }

    /// Stop the run and roll back everything it logged so far.
    pub fn cancel(&self, ctx: &mut RunContext, sink: &mut dyn EventSink) -> Option<RollbackReport> {
        if ctx.state != RunState::Running {
            warn!(id = %ctx.operation_id, state = ?ctx.state, "run already finished");
            return None;
        }
        ctx.state = RunState::Cancelled;
        ctx.pending.clear();
        info!(id = %ctx.operation_id, "run cancelled, rolling back");

        let report = match RollbackEngine::new(self.log).rollback_unfinished(&ctx.operation_id, sink) {
            Ok(report) => Some(report),
            Err(e) => {
                error!(id = %ctx.operation_id, error = %e, "rollback after cancellation failed");
                None
            }
        };
        if let Err(e) = self.log.cancel(&ctx.operation_id) {
            warn!(id = %ctx.operation_id, error = %e, "could not mark operation cancelled");
        }
        ctx.stats.finish(self.control.paused_duration());
        sink.record(Event::RunCancelled {
            operation_id: ctx.operation_id,
        });
        report
    }

    fn abort(&self, ctx: &mut RunContext, e: Error, sink: &mut dyn EventSink) -> Error {
        error!(id = %ctx.operation_id, error = %e, "run aborted");
        self.cancel(ctx, sink);
        Error::Aborted {
            id: ctx.operation_id,
            source: Box::new(e),
        }
    }
}

/// Where `source` should end up, or `None` if the mode leaves it alone.
fn target_for(root: &Path, mode: &MoveMode, source: &Path) -> Option<PathBuf> {
    match mode {
        MoveMode::Upward { levels, .. } => {
            let relative = source.strip_prefix(root).ok()?;
            transform::upward(relative, *levels).map(|r| root.join(r))
        }
        MoveMode::Downward { delimiters, remove } => {
            let Some(name) = source.file_name()?.to_str() else {
                debug!(path = %source.display(), "skipping non UTF-8 file name");
                return None;
            };
            let split = transform::downward(name, delimiters, remove)?;
            Some(source.parent()?.join(split.relative_path()))
        }
    }
}

/// Returns the final destination, bytes moved and directories created.
fn relocate(source: &Path, target: &Path) -> std::result::Result<(PathBuf, u64, Vec<PathBuf>), FileMoveError> {
    // Non UTF-8 paths cannot be written to the log.
    for path in [source, target] {
        if path.to_str().is_none() {
            return Err(FileMoveError::NonUtf8Path {
                path: path.to_path_buf(),
            });
        }
    }
    let destination = conflict::resolve(target)?;
    let created = fsops::ensure_parent(&destination)?;
    match fsops::move_file(source, &destination) {
        Ok(bytes) => Ok((destination, bytes, created)),
        Err(e) => {
            fsops::remove_empty_dirs(created.iter().map(PathBuf::as_path));
            Err(e)
        }
    }
}

fn remove_empty_dir(dir: &Path, sink: &mut dyn EventSink) {
    match fsops::remove_if_empty(dir) {
        Ok(true) => {
            debug!(path = %dir.display(), "removed empty directory");
            sink.record(Event::DirectoryRemoved {
                path: dir.to_path_buf(),
            });
        }
        Ok(false) => {}
        Err(e) => warn!(path = %dir.display(), error = %e, "could not remove directory"),
    }
}
