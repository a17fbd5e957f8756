use std::path::PathBuf;

use anyhow::{Context, Result};
use path_absolutize::Absolutize;
use tracing::Level;

use crate::cli::GlobalArgs;

/// Environment variable overriding the operation log directory.
pub const STORE_ENV: &str = "FOLDER_WIZARD_STORE";

/// Resolved runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Absolute directory holding one record per operation.
    pub store: PathBuf,
    pub json: bool,
    pub log_level: Level,
}

impl Settings {
    pub fn from_args(args: &GlobalArgs) -> Result<Self> {
        let store = args.store.clone().unwrap_or_else(default_store_dir);
        let store = store
            .absolutize()
            .with_context(|| format!("invalid store path {}", store.display()))?
            .into_owned();
        Ok(Self {
            store,
            json: args.json,
            log_level: log_level(args.verbose, args.quiet),
        })
    }
}

/// `<data-local-dir>/folder-wizard/operations`, or a directory under the
/// working directory when the platform has no data dir.
pub fn default_store_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("folder-wizard"))
        .unwrap_or_else(|| PathBuf::from(".folder-wizard"))
        .join("operations")
}

fn log_level(verbose: u8, quiet: bool) -> Level {
    if quiet {
        return Level::ERROR;
    }
    match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Install the stderr log subscriber.
pub fn init_logging(level: Level) {
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
