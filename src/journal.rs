use chrono::Local;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::model::{Move, MoveMode, Operation, OperationStatus};

const RECORD_EXTENSION: &str = "json";

/// Durable store of operation records, keyed by identifier.
///
/// Holds no state besides its directory; every call re-reads the store.
#[derive(Debug, Clone)]
pub struct OperationLog {
    dir: PathBuf,
}

impl OperationLog {
    /// Open (creating if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| Error::storage(&dir, e))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, id: &Uuid) -> PathBuf {
        self.dir.join(format!("{id}.{RECORD_EXTENSION}"))
    }

    /// Allocate a fresh operation and persist it as `in_progress`.
    pub fn create(&self, root: PathBuf, mode: MoveMode) -> Result<Uuid> {
        let op = Operation::new(root, mode);
        self.write(&op)?;
        debug!(id = %op.id, "operation created");
        Ok(op.id)
    }

    /// Append a move and persist the full record before returning.
    pub fn append(&self, id: &Uuid, source: &Path, destination: &Path) -> Result<()> {
        self.append_with_dirs(id, source, destination, Vec::new())
    }

    /// Like [`append`](Self::append), also recording the directories the
    /// move had to create so a rollback removes exactly those.
    pub fn append_with_dirs(
        &self,
        id: &Uuid,
        source: &Path,
        destination: &Path,
        created_dirs: Vec<PathBuf>,
    ) -> Result<()> {
        let mut op = self.find(id)?;
        op.moves.push(Move {
            source: source.to_path_buf(),
            destination: destination.to_path_buf(),
            moved_at: Local::now(),
            created_dirs,
        });
        self.write(&op)
    }

    /// Mark an operation completed. Idempotent; a cancelled operation stays
    /// cancelled.
    pub fn complete(&self, id: &Uuid) -> Result<()> {
        self.finish(id, OperationStatus::Completed)
    }

    /// Mark an operation cancelled. Idempotent; a completed operation stays
    /// completed.
    pub fn cancel(&self, id: &Uuid) -> Result<()> {
        self.finish(id, OperationStatus::Cancelled)
    }

    fn finish(&self, id: &Uuid, status: OperationStatus) -> Result<()> {
        let mut op = self.find(id)?;
        if op.status.is_terminal() {
            if op.status != status {
                warn!(%id, current = %op.status, requested = %status, "operation already finished");
            }
            return Ok(());
        }
        op.status = status;
        if status == OperationStatus::Completed {
            op.completed_at = Some(Local::now());
        }
        self.write(&op)?;
        debug!(%id, %status, "operation finished");
        Ok(())
    }

    /// Load one operation.
    pub fn find(&self, id: &Uuid) -> Result<Operation> {
        let path = self.record_path(id);
        match std::fs::read(&path) {
            Ok(bytes) => decode(&path, &bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::NotFound(*id)),
            Err(e) => Err(Error::storage(path, e)),
        }
    }

    /// Find the most recent operation created at `ts`.
    pub fn find_by_timestamp(&self, ts: &str) -> Result<Option<Operation>> {
        Ok(self
            .load_all()?
            .into_iter()
            .find(|op| op.matches_timestamp(ts)))
    }

    /// Operations newest first, truncated to `limit`.
    pub fn recent(&self, limit: usize) -> Result<Vec<Operation>> {
        let mut ops = self.load_all()?;
        ops.truncate(limit);
        Ok(ops)
    }

    /// Every decodable record, newest first.
    fn load_all(&self) -> Result<Vec<Operation>> {
        let entries = std::fs::read_dir(&self.dir).map_err(|e| Error::storage(&self.dir, e))?;
        let mut ops = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::storage(&self.dir, e))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXTENSION) {
                continue;
            }
            let loaded = std::fs::read(&path)
                .map_err(|e| Error::storage(&path, e))
                .and_then(|bytes| decode(&path, &bytes));
            match loaded {
                Ok(op) => ops.push(op),
                Err(e) => warn!(error = %e, "skipping unreadable operation record"),
            }
        }
        ops.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(ops)
    }

    /// Write-temp-then-rename so a killed process never leaves a truncated
    /// record behind.
    fn write(&self, op: &Operation) -> Result<()> {
        let path = self.record_path(&op.id);
        let json = serde_json::to_vec_pretty(op).map_err(|e| Error::Encode {
            path: path.clone(),
            source: e,
        })?;
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir).map_err(|e| Error::storage(&self.dir, e))?;
        tmp.write_all(&json).map_err(|e| Error::storage(tmp.path(), e))?;
        tmp.as_file().sync_all().map_err(|e| Error::storage(tmp.path(), e))?;
        tmp.persist(&path).map_err(|e| Error::storage(&path, e.error))?;
        Ok(())
    }
}

fn decode(path: &Path, bytes: &[u8]) -> Result<Operation> {
    serde_json::from_slice(bytes).map_err(|e| Error::CorruptRecord {
        path: path.to_path_buf(),
        source: e,
    })
}
