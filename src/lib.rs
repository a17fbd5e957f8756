//! Bulk file moves that can always be undone.
//!
//! A run either flattens files toward an ancestor directory ("up") or
//! splits file names into nested subdirectories ("down"). Every move is
//! appended to a durable [`journal::OperationLog`] before the next file is
//! touched, so a finished run can be replayed backwards by
//! [`rollback::RollbackEngine`] and a cancelled one is rolled back on the
//! spot by [`mover::MoveEngine`].

pub mod cli;
pub mod config;
pub mod conflict;
pub mod control;
pub mod engine;
pub mod error;
pub mod events;
pub mod exit_codes;
pub mod fsops;
pub mod journal;
pub mod model;
pub mod mover;
pub mod reporter;
pub mod rollback;
pub mod signals;
pub mod stats;
pub mod transform;
pub mod validate;

pub use error::{Error, FileMoveError, Result};
