//! Inspect and cap the Node.js heap of a locally installed VS Code remote server.
//!
//! The binary patches `--max-old-space-size=<MB>` into the last line of the
//! server's `code-server` launcher and reports memory counters of the running
//! server processes.

pub mod app;
pub mod cli;
pub mod error;
pub mod exit_codes;
pub mod inspect;
pub mod limit;
pub mod locate;
pub mod os;
pub mod patch;
pub mod report;

pub use error::{Error, Result};

/// Heap cap used when `--set-max-old-space-size` is given without a value.
pub const DEFAULT_MAX_OLD_SPACE_SIZE: u64 = 8192;
