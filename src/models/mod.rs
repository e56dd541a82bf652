//! Core data models for mailshift
//!
//! This module contains the data structures shared by the compiler and the
//! execution engine: credential pairs, compiled commands, and run records.

pub mod command;
pub mod request;
pub mod run;

// Re-exports for convenience
pub use command::{log_file_name, quote_password, CommandTemplate, CompiledCommand};
pub use request::{domain_of, Credential, MigrationRequest, Password};
pub use run::{
    ExitOutcome, ProcessRecord, ProcessState, ProgressSnapshot, ProgressStatus, RunId,
    RunStatistics, EXIT_SPAWN_FAILED, EXIT_TOKENIZE_FAILED, EXIT_WAIT_FAILED,
};
