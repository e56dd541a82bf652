//! Bounded Subprocess Execution
//!
//! [`ProcessPool`] runs a batch of compiled commands as OS processes while
//! keeping at most `max_concurrency` of them alive. Commands are split into
//! argument vectors and executed directly, never through a shell. Children
//! are awaited through a [`JoinSet`], so a free slot is noticed the moment a
//! process exits.
//!
//! A command that cannot be launched gets a negative sentinel exit code and
//! the run continues. Only two conditions abort a run: the per-run log
//! directory cannot be created, or the system is out of process resources
//! while nothing else is running.

pub mod finalizer;
pub mod progress;
pub mod shell_words;
pub mod signals;

pub use finalizer::RunFinalizer;
pub use progress::{LogSink, NullSink, ProgressSink};
pub use shell_words::ShellWordsError;
pub use signals::{Signal, SignalConfig, SignalHandler};

use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tokio::task::{Id, JoinSet};

use crate::config::PoolConfig;
use crate::error::{Error, Result};
use crate::models::{
    ExitOutcome, ProcessRecord, ProcessState, ProgressSnapshot, ProgressStatus, RunId,
    RunStatistics,
};

const LOGDIR_FLAG: &str = "--logdir";
const LOGDIR_PREFIX: &str = "--logdir=";

/// Flags whose next argument is a value that must be passed through as is
const VALUE_FLAGS: [&str; 6] = [
    "--host1",
    "--user1",
    "--password1",
    "--host2",
    "--user2",
    "--password2",
];

/// Runs command batches under a concurrency cap
#[derive(Debug, Clone)]
pub struct ProcessPool {
    config: PoolConfig,
}

impl ProcessPool {
    pub fn new(config: PoolConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Log directory used by a run
    pub fn run_dir(&self, run_id: &RunId) -> PathBuf {
        self.config.log_root.join(run_id.as_str())
    }

    /// Execute every command and return the final statistics.
    ///
    /// Launch order follows `commands`; completion order is whatever the OS
    /// decides. The returned exit-code map has one entry per command.
    pub async fn run<T: AsRef<str>>(
        &self,
        run_id: &RunId,
        commands: &[T],
        sink: &dyn ProgressSink,
    ) -> Result<RunStatistics> {
        let started_at = Utc::now();
        let run_dir = self.prepare_run_dir(run_id).await?;
        let max_running = self.config.max_concurrency.max(1);

        info!(
            "Run {}: {} commands, at most {} at a time",
            run_id,
            commands.len(),
            max_running
        );

        let mut tracker = RunTracker::new(run_id.clone(), commands.len());
        let mut running = Running::default();

        for (index, command) in commands.iter().enumerate() {
            while running.len() >= max_running {
                running.reap_one(&mut tracker, sink).await;
            }

            let argv = match prepare_argv(command.as_ref(), &run_dir) {
                Ok(argv) => argv,
                Err(e) => {
                    warn!("Command {} of run {} not launched: {}", index, run_id, e);
                    tracker.finish(index, ExitOutcome::TokenizeFailed);
                    sink.publish(&tracker.snapshot());
                    continue;
                }
            };

            tracker.launched(index);
            loop {
                match spawn(&argv) {
                    Ok(child) => {
                        let pid = child.id();
                        debug!("Command {} started with pid {:?}", index, pid);
                        tracker.running(index, pid);
                        running.spawn(index, child);
                        break;
                    }
                    Err(e) if is_resource_exhaustion(&e) => {
                        if running.is_empty() {
                            error!("Run {} cannot launch command {}: {}", run_id, index, e);
                            return Err(Error::ResourceExhausted {
                                command_index: index,
                                reason: e.to_string(),
                            });
                        }
                        warn!(
                            "Out of resources launching command {} ({}), waiting for a slot",
                            index, e
                        );
                        running.reap_one(&mut tracker, sink).await;
                    }
                    Err(e) => {
                        warn!("Command {} of run {} failed to start: {}", index, run_id, e);
                        tracker.finish(index, ExitOutcome::SpawnFailed);
                        break;
                    }
                }
            }
            sink.publish(&tracker.snapshot());
        }

        while !running.is_empty() {
            running.reap_one(&mut tracker, sink).await;
        }

        let snapshot = tracker.snapshot();
        sink.publish(&snapshot);

        Ok(RunFinalizer::finalize(
            run_id,
            started_at,
            snapshot.return_codes,
        ))
    }

    async fn prepare_run_dir(&self, run_id: &RunId) -> Result<PathBuf> {
        let dir = self.run_dir(run_id);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| Error::LogDirCreationFailed {
                path: dir.clone(),
                reason: e.to_string(),
            })?;

        match tokio::fs::read_dir(&dir).await {
            Ok(mut entries) => {
                if let Ok(Some(_)) = entries.next_entry().await {
                    warn!("Log directory {} is not empty", dir.display());
                }
            }
            Err(e) => warn!("Cannot list log directory {}: {}", dir.display(), e),
        }
        Ok(dir)
    }
}

impl Default for ProcessPool {
    fn default() -> Self {
        Self::new(PoolConfig::default())
    }
}

/// Split a command and point its log directory at `run_dir`
fn prepare_argv(command: &str, run_dir: &Path) -> std::result::Result<Vec<String>, String> {
    let mut argv = shell_words::split(command).map_err(|e| e.to_string())?;
    if argv.is_empty() {
        return Err("empty command".to_string());
    }
    if !rewrite_logdir(&mut argv, run_dir) {
        debug!("Command has no {} argument", LOGDIR_FLAG);
    }
    Ok(argv)
}

/// Replace the value of the effective `--logdir=<dir>` or `--logdir <dir>`
/// argument with `run_dir`.
///
/// Values of account, password and host flags are never inspected, so a
/// password that looks like `--logdir` reaches the tool unchanged. When the
/// flag appears more than once only the last one is rewritten, as that is
/// the one the tool honours.
///
/// Returns whether an argument was rewritten.
pub fn rewrite_logdir(argv: &mut [String], run_dir: &Path) -> bool {
    let mut target = None;
    let mut i = 0;
    while i < argv.len() {
        let arg = argv[i].as_str();
        if VALUE_FLAGS.contains(&arg) {
            i += 2;
            continue;
        }
        if arg == LOGDIR_FLAG {
            if i + 1 < argv.len() {
                target = Some(LogdirArg::Separate(i + 1));
            }
            i += 2;
            continue;
        }
        if arg.starts_with(LOGDIR_PREFIX) {
            target = Some(LogdirArg::Joined(i));
        }
        i += 1;
    }

    let dir = run_dir.display().to_string();
    match target {
        Some(LogdirArg::Joined(index)) => argv[index] = format!("{}{}", LOGDIR_PREFIX, dir),
        Some(LogdirArg::Separate(index)) => argv[index] = dir,
        None => return false,
    }
    true
}

/// Position of the log directory in an argument vector
enum LogdirArg {
    /// `--logdir=<dir>` at this index
    Joined(usize),
    /// `<dir>` following a bare `--logdir` at this index
    Separate(usize),
}

fn spawn(argv: &[String]) -> io::Result<tokio::process::Child> {
    let mut command = Command::new(&argv[0]);
    command
        .args(&argv[1..])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    #[cfg(unix)]
    command.process_group(0);
    command.spawn()
}

/// Whether a spawn error means the system is temporarily out of resources
fn is_resource_exhaustion(e: &io::Error) -> bool {
    #[cfg(unix)]
    if let Some(code) = e.raw_os_error() {
        use nix::errno::Errno;
        return matches!(
            Errno::from_raw(code),
            Errno::EAGAIN | Errno::ENOMEM | Errno::EMFILE | Errno::ENFILE
        );
    }
    matches!(e.kind(), io::ErrorKind::OutOfMemory)
}

/// Children currently alive, keyed by task id
#[derive(Default)]
struct Running {
    tasks: JoinSet<(usize, ExitOutcome)>,
    indices: HashMap<Id, usize>,
}

impl Running {
    fn len(&self) -> usize {
        self.tasks.len()
    }

    fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    fn spawn(&mut self, index: usize, mut child: tokio::process::Child) {
        let handle = self.tasks.spawn(async move {
            let outcome = match child.wait().await {
                Ok(status) => ExitOutcome::from_status(status),
                Err(e) => {
                    warn!("Failed to wait on command {}: {}", index, e);
                    ExitOutcome::WaitFailed
                }
            };
            (index, outcome)
        });
        self.indices.insert(handle.id(), index);
    }

    /// Wait for the next child to exit and record it
    async fn reap_one(&mut self, tracker: &mut RunTracker, sink: &dyn ProgressSink) {
        let (index, outcome) = match self.tasks.join_next_with_id().await {
            Some(Ok((id, result))) => {
                self.indices.remove(&id);
                result
            }
            Some(Err(e)) => match self.indices.remove(&e.id()) {
                Some(index) => {
                    warn!("Wait task for command {} failed: {}", index, e);
                    (index, ExitOutcome::WaitFailed)
                }
                None => return,
            },
            None => return,
        };

        info!(
            "Command {} of run {} exited with {}",
            index,
            tracker.run_id,
            outcome.code()
        );
        tracker.finish(index, outcome);
        sink.publish(&tracker.snapshot());
    }
}

/// Per-run bookkeeping owned by the controlling task
struct RunTracker {
    run_id: RunId,
    records: Vec<ProcessRecord>,
    return_codes: BTreeMap<usize, i32>,
}

impl RunTracker {
    fn new(run_id: RunId, total: usize) -> Self {
        Self {
            run_id,
            records: (0..total).map(ProcessRecord::new).collect(),
            return_codes: BTreeMap::new(),
        }
    }

    fn launched(&mut self, index: usize) {
        self.records[index].mark_launched();
    }

    fn running(&mut self, index: usize, pid: Option<u32>) {
        self.records[index].mark_running(pid);
    }

    fn finish(&mut self, index: usize, outcome: ExitOutcome) {
        self.records[index].mark_finished(outcome);
        self.return_codes.insert(index, outcome.code());
    }

    fn snapshot(&self) -> ProgressSnapshot {
        let processing = self.records.iter().filter(|r| r.is_running()).count();
        let pending = self
            .records
            .iter()
            .filter(|r| r.state == ProcessState::Queued)
            .count();
        let pids = self
            .records
            .iter()
            .filter(|r| r.is_running())
            .filter_map(|r| r.pid.map(|pid| (r.index, pid)))
            .collect();
        let status = if self.return_codes.len() == self.records.len() {
            ProgressStatus::Finished
        } else {
            ProgressStatus::Processing
        };

        ProgressSnapshot {
            run_id: self.run_id.clone(),
            processing,
            pending,
            total: self.records.len(),
            return_codes: self.return_codes.clone(),
            status,
            pids,
        }
    }
}
