use anyhow::{Context, Result, bail};

use crate::cli::{DownArgs, HistoryArgs, RollbackArgs, UpArgs};
use crate::config::Settings;
use crate::control::RunControl;
use crate::error::Error;
use crate::exit_codes::exit;
use crate::journal::OperationLog;
use crate::model::{self, MoveMode};
use crate::mover::{MoveEngine, RunState};
use crate::reporter::Reporter;
use crate::rollback::RollbackEngine;
use crate::signals;

pub fn up(settings: &Settings, args: UpArgs) -> Result<i32> {
    let mode = MoveMode::Upward {
        levels: args.levels as usize,
        delete_empty: args.delete_empty,
    };
    run_move(settings, &args.root, &mode)
}

pub fn down(settings: &Settings, args: DownArgs) -> Result<i32> {
    let mode = MoveMode::Downward {
        delimiters: args.delimiters,
        remove: args.remove,
    };
    run_move(settings, &args.root, &mode)
}

fn open_log(settings: &Settings) -> Result<OperationLog> {
    OperationLog::open(&settings.store).context("failed to open operation log")
}

fn run_move(settings: &Settings, root: &std::path::Path, mode: &MoveMode) -> Result<i32> {
    let log = open_log(settings)?;
    let control = RunControl::new();
    let _signals = signals::install(&control).context("failed to install signal handlers")?;
    let engine = MoveEngine::with_control(&log, control);
    let mut reporter = Reporter::new(settings.json);

    let report = match engine.run(root, mode, &mut reporter) {
        Ok(report) => report,
        Err(e) => {
            if let Error::Aborted { .. } = e {
                eprintln!("error: {e}; logged moves were rolled back");
            } else {
                eprintln!("error: {e}");
            }
            return Ok(failure_code(&e));
        }
    };

    if !reporter.is_json() {
        println!("operation {}", report.operation_id);
        println!("{}", Reporter::summary(&report.stats));
        if let Some(rollback) = &report.rollback {
            println!(
                "cancelled: {} moves reverted, {} could not be reverted",
                rollback.reverted.len(),
                rollback.failed.len()
            );
        }
    }

    Ok(match report.state {
        RunState::Cancelled => exit::CANCELLED,
        _ => exit::SUCCESS,
    })
}

fn failure_code(e: &Error) -> i32 {
    match e {
        e if e.is_setup_error() => exit::INVALID_INPUT,
        Error::Aborted { .. } => exit::CANCELLED,
        _ => exit::OPERATIONAL_FAILURE,
    }
}

pub fn history(settings: &Settings, args: HistoryArgs) -> Result<i32> {
    let log = open_log(settings)?;
    let ops = log.recent(args.limit)?;

    if settings.json {
        for op in &ops {
            println!("{}", serde_json::to_string(op)?);
        }
        return Ok(exit::SUCCESS);
    }

    if ops.is_empty() {
        println!("no operations recorded in {}", log.dir().display());
    }
    for op in &ops {
        println!(
            "{}  {}  {:<11}  {:>5} moves  {}  {}",
            op.timestamp_label(),
            op.id,
            op.status.to_string(),
            op.moves.len(),
            op.mode,
            op.root.display()
        );
    }
    Ok(exit::SUCCESS)
}

pub fn rollback(settings: &Settings, args: RollbackArgs) -> Result<i32> {
    let log = open_log(settings)?;
    let id = match (args.id, args.timestamp) {
        (Some(id), _) => id,
        (None, Some(ts)) => match log.find_by_timestamp(&ts)? {
            Some(op) => op.id,
            None => {
                eprintln!("error: no operation created at {ts}");
                return Ok(exit::OPERATIONAL_FAILURE);
            }
        },
        (None, None) => bail!("either --id or --timestamp is required"),
    };

    let mut reporter = Reporter::new(settings.json);
    let report = match RollbackEngine::new(&log).rollback(&id, &mut reporter) {
        Ok(report) => report,
        Err(e @ (Error::NotFound(_) | Error::NotRollbackable { .. })) => {
            eprintln!("error: {e}");
            return Ok(exit::OPERATIONAL_FAILURE);
        }
        Err(e) => return Err(e).context("rollback failed"),
    };

    if !reporter.is_json() {
        println!(
            "operation {}: {} moves reverted, {} already gone, {} failed",
            id,
            report.reverted.len(),
            report.skipped.len(),
            report.failed.len()
        );
        for (mv, err) in &report.failed {
            println!("  {} -> {}: {}", mv.destination.display(), mv.source.display(), err);
        }
    }

    Ok(if report.is_success() {
        exit::SUCCESS
    } else {
        exit::OPERATIONAL_FAILURE
    })
}

pub fn schema() -> i32 {
    println!("{}", model::generate_schema());
    exit::SUCCESS
}
