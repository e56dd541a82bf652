//! Run reporting helpers
//!
//! Read-only views over what a run left behind: exit code meanings and the
//! per-command sync logs.

pub mod exit_codes;
pub mod log;

pub use exit_codes::{describe, lookup, severity, ExitCodeInfo, Severity};
pub use log::{summarize_dir, LogFileName, LogSummary, SyncStatus};
