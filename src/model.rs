use chrono::{DateTime, Local};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

/// Format of the human-facing timestamp label, also accepted for lookup.
pub const TIMESTAMP_LABEL_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Persisted record of one bulk move run.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct Operation {
    /// Globally unique operation identifier.
    pub id: Uuid,
    /// When the operation was opened.
    pub created_at: DateTime<Local>,
    /// Lifecycle status.
    pub status: OperationStatus,
    /// When the operation was marked completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Local>>,
    /// Absolute root directory the run operated on.
    pub root: PathBuf,
    /// Mode and parameters of the run.
    pub mode: MoveMode,
    /// Moves in execution order.
    #[serde(default)]
    pub moves: Vec<Move>,
}

impl Operation {
    pub fn new(root: PathBuf, mode: MoveMode) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Local::now(),
            status: OperationStatus::InProgress,
            completed_at: None,
            root,
            mode,
            moves: Vec::new(),
        }
    }

    /// Creation time rendered for display and lookup.
    pub fn timestamp_label(&self) -> String {
        self.created_at.format(TIMESTAMP_LABEL_FORMAT).to_string()
    }

    /// Exact match against the RFC 3339 creation time or its display label.
    pub fn matches_timestamp(&self, ts: &str) -> bool {
        let ts = ts.trim();
        if ts == self.timestamp_label() {
            return true;
        }
        DateTime::parse_from_rfc3339(ts).is_ok_and(|parsed| parsed == self.created_at)
    }
}

/// Lifecycle status. Both `Completed` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    InProgress,
    Completed,
    Cancelled,
}

impl OperationStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::InProgress)
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A single recorded relocation. Immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct Move {
    /// Absolute path before the move.
    pub source: PathBuf,
    /// Absolute path after the move.
    pub destination: PathBuf,
    pub moved_at: DateTime<Local>,
    /// Directories that did not exist before this move, outermost first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub created_dirs: Vec<PathBuf>,
}

/// Which way files travel, with the mode's parameters.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MoveMode {
    /// Flatten files toward an ancestor directory.
    Upward {
        /// Number of directory levels to climb (at least 1).
        levels: usize,
        /// Remove directories left empty by the run.
        #[serde(default)]
        delete_empty: bool,
    },
    /// Split file names into nested subdirectories.
    Downward {
        /// Delimiters applied in order.
        delimiters: Vec<String>,
        /// Literal substrings stripped from the stem before splitting.
        #[serde(default)]
        remove: Vec<String>,
    },
}

impl MoveMode {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Upward { .. } => "upward",
            Self::Downward { .. } => "downward",
        }
    }
}

impl fmt::Display for MoveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Upward {
                levels,
                delete_empty,
            } => {
                write!(f, "upward levels={levels}")?;
                if *delete_empty {
                    write!(f, " delete-empty")?;
                }
                Ok(())
            }
            Self::Downward { delimiters, remove } => {
                write!(f, "downward delimiters={delimiters:?}")?;
                if !remove.is_empty() {
                    write!(f, " remove={remove:?}")?;
                }
                Ok(())
            }
        }
    }
}

/// Generate JSON Schema for the persisted operation record.
pub fn generate_schema() -> String {
    let schema = schemars::schema_for!(Operation);
    serde_json::to_string_pretty(&schema).expect("failed to serialize schema")
}
