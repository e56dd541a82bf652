//! Run Models
//!
//! Bookkeeping for one execution of a compiled batch: per-process records,
//! exit outcomes, progress snapshots and the final statistics handed back
//! to the caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::process::ExitStatus;
use uuid::Uuid;

/// Exit code recorded when a command could not be split into arguments
pub const EXIT_TOKENIZE_FAILED: i32 = -1;
/// Exit code recorded when the OS refused to start a command
pub const EXIT_SPAWN_FAILED: i32 = -2;
/// Exit code recorded when waiting on a running command failed
pub const EXIT_WAIT_FAILED: i32 = -3;

/// Unique identifier of a run, also the name of its log subdirectory
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    /// Generate a fresh random run identifier
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Use an identifier supplied by the task-tracking layer
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RunId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// How a command ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitOutcome {
    /// The process exited with a status code
    Exited(i32),
    /// The process was killed by a signal
    Signalled(i32),
    /// The command line had unbalanced quotes or was empty
    TokenizeFailed,
    /// The OS refused to start the process
    SpawnFailed,
    /// The process started but its status could not be collected
    WaitFailed,
}

impl ExitOutcome {
    /// Build an outcome from an OS exit status
    pub fn from_status(status: ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return ExitOutcome::Exited(code);
        }

        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return ExitOutcome::Signalled(signal);
            }
        }

        ExitOutcome::WaitFailed
    }

    /// Integer form used in exit-code maps.
    ///
    /// Launch failures map to negative sentinels; signals follow the shell
    /// convention of `128 + signal`.
    pub fn code(&self) -> i32 {
        match self {
            ExitOutcome::Exited(code) => *code,
            ExitOutcome::Signalled(signal) => 128 + signal,
            ExitOutcome::TokenizeFailed => EXIT_TOKENIZE_FAILED,
            ExitOutcome::SpawnFailed => EXIT_SPAWN_FAILED,
            ExitOutcome::WaitFailed => EXIT_WAIT_FAILED,
        }
    }

    /// Whether the command never ran
    pub fn is_launch_failure(&self) -> bool {
        matches!(self, ExitOutcome::TokenizeFailed | ExitOutcome::SpawnFailed)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ExitOutcome::Exited(0))
    }
}

/// Lifecycle of one command inside a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ProcessState {
    /// Waiting for a free slot
    #[default]
    Queued,
    /// Argument vector built, spawn requested
    Launched,
    /// Process is alive
    Running,
    /// Process ended (or never started)
    Finished(ExitOutcome),
}

/// One command tracked by the process pool
#[derive(Debug, Clone)]
pub struct ProcessRecord {
    /// Position of the command in the batch
    pub index: usize,

    /// OS process identifier once running
    pub pid: Option<u32>,

    /// Current state
    pub state: ProcessState,

    /// When the process was started
    pub start_time: Option<DateTime<Utc>>,

    /// When the process ended
    pub end_time: Option<DateTime<Utc>>,
}

impl ProcessRecord {
    /// Create a queued record
    pub fn new(index: usize) -> Self {
        Self {
            index,
            pid: None,
            state: ProcessState::Queued,
            start_time: None,
            end_time: None,
        }
    }

    /// Mark the command as handed to the OS
    pub fn mark_launched(&mut self) {
        self.state = ProcessState::Launched;
    }

    /// Mark the process as started with the given PID
    pub fn mark_running(&mut self, pid: Option<u32>) {
        self.pid = pid;
        self.state = ProcessState::Running;
        self.start_time = Some(Utc::now());
    }

    /// Mark the process as finished
    pub fn mark_finished(&mut self, outcome: ExitOutcome) {
        self.state = ProcessState::Finished(outcome);
        self.end_time = Some(Utc::now());
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, ProcessState::Running)
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, ProcessState::Finished(_))
    }

    /// Outcome, if finished
    pub fn outcome(&self) -> Option<ExitOutcome> {
        match self.state {
            ProcessState::Finished(outcome) => Some(outcome),
            _ => None,
        }
    }

    /// Get the execution duration if the process has finished
    pub fn execution_duration(&self) -> Option<std::time::Duration> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => {
                Some(end.signed_duration_since(start).to_std().unwrap_or_default())
            }
            _ => None,
        }
    }
}

/// Coarse run state carried in progress snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    /// Commands are still being launched or awaited
    Processing,
    /// Every command has an exit code
    Finished,
}

impl fmt::Display for ProgressStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressStatus::Processing => f.write_str("Processing..."),
            ProgressStatus::Finished => f.write_str("Executed all commands"),
        }
    }
}

/// Point-in-time view of a run pushed to progress sinks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    /// Run the snapshot belongs to
    pub run_id: RunId,
    /// Processes currently running
    pub processing: usize,
    /// Commands not launched yet
    pub pending: usize,
    /// Commands in the batch
    pub total: usize,
    /// Exit codes collected so far, keyed by command index
    pub return_codes: BTreeMap<usize, i32>,
    /// Coarse state
    pub status: ProgressStatus,
    /// PIDs of running processes, keyed by command index
    pub pids: BTreeMap<usize, u32>,
}

impl ProgressSnapshot {
    /// Number of commands with an exit code
    pub fn finished(&self) -> usize {
        self.return_codes.len()
    }
}

/// Final statistics of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStatistics {
    pub run_id: RunId,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Whole seconds between start and finish
    pub run_time_secs: u64,
    /// Exit code for every command, keyed by command index
    pub exit_codes: BTreeMap<usize, i32>,
    pub finished: bool,
}

impl RunStatistics {
    /// Indices of commands that did not exit with 0
    pub fn failed_indices(&self) -> Vec<usize> {
        self.exit_codes
            .iter()
            .filter(|(_, code)| **code != 0)
            .map(|(index, _)| *index)
            .collect()
    }

    /// Number of commands that exited with 0
    pub fn succeeded(&self) -> usize {
        self.exit_codes.values().filter(|code| **code == 0).count()
    }
}
