use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;
use uuid::Uuid;

use crate::config::STORE_ENV;

/// Flatten or split directory trees, with every move logged and reversible.
#[derive(Parser)]
#[command(name = "folder-wizard", version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Clone, Debug)]
pub struct GlobalArgs {
    /// Directory holding operation records.
    #[arg(long, global = true, env = STORE_ENV)]
    pub store: Option<PathBuf>,

    /// Output structured JSON to stdout.
    #[arg(long, global = true)]
    pub json: bool,

    /// More log output (repeatable).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Move files up toward an ancestor directory.
    Up(UpArgs),
    /// Split file names into nested subdirectories.
    Down(DownArgs),
    /// List recent operations, newest first.
    History(HistoryArgs),
    /// Undo a completed operation.
    Rollback(RollbackArgs),
    /// Print JSON Schema for operation records.
    Schema,
}

#[derive(Args)]
pub struct UpArgs {
    /// Directory to flatten.
    pub root: PathBuf,

    /// Directory levels to climb.
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub levels: u32,

    /// Remove directories left empty afterwards.
    #[arg(long)]
    pub delete_empty: bool,
}

#[derive(Args)]
pub struct DownArgs {
    /// Directory whose files are split.
    pub root: PathBuf,

    /// Delimiter to split names on; repeat to apply several in order.
    #[arg(short = 'd', long = "delimiter", required = true, allow_hyphen_values = true)]
    pub delimiters: Vec<String>,

    /// Substring stripped from names before splitting; repeatable.
    #[arg(short = 'r', long = "remove", allow_hyphen_values = true)]
    pub remove: Vec<String>,
}

#[derive(Args)]
pub struct HistoryArgs {
    /// Maximum number of operations to show.
    #[arg(short = 'n', long, default_value_t = 20)]
    pub limit: usize,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
pub struct RollbackArgs {
    /// Operation identifier.
    #[arg(long)]
    pub id: Option<Uuid>,

    /// Creation timestamp, as shown by `history` or in RFC 3339.
    #[arg(long)]
    pub timestamp: Option<String>,
}
