//! Process Signal Handling
//!
//! Every command of a run is started as the leader of its own process
//! group, so signalling the group reaches the sync tool and anything it
//! forked. The pool itself has no cancel operation; the hosting layer reads
//! PIDs from progress snapshots and uses this module.

use crate::error::{Error, Result};
use crate::models::ProgressSnapshot;

/// Signals that can be sent to a running command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Interrupt signal (Ctrl+C)
    Interrupt,
    /// Termination signal (graceful shutdown)
    Terminate,
    /// Kill signal (forceful termination)
    Kill,
    /// Hangup signal
    Hangup,
}

/// Signal handling configuration
#[derive(Debug, Clone)]
pub struct SignalConfig {
    /// Time between SIGTERM and SIGKILL in a graceful termination
    pub graceful_timeout_ms: u64,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            graceful_timeout_ms: 5000, // 5 seconds
        }
    }
}

/// Sends signals to the process groups of running commands
#[derive(Debug, Clone, Default)]
pub struct SignalHandler {
    config: SignalConfig,
}

impl SignalHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SignalConfig) -> Self {
        Self { config }
    }

    /// Send a signal to the process group led by `pid`
    pub fn signal_group(&self, pid: u32, signal: Signal) -> Result<()> {
        #[cfg(unix)]
        {
            use nix::sys::signal::killpg;
            use nix::unistd::Pid;

            killpg(Pid::from_raw(pid as i32), to_nix(signal)).map_err(|e| {
                Error::SignalSendFailed {
                    signal: format!("{:?}", signal),
                    reason: e.to_string(),
                }
            })
        }

        #[cfg(not(unix))]
        {
            let _ = pid;
            Err(Error::SignalNotSupported {
                signal: format!("{:?}", signal),
                platform: std::env::consts::OS.to_string(),
            })
        }
    }

    /// Signal every running command of a snapshot.
    ///
    /// Returns one result per command index.
    pub fn signal_run(
        &self,
        snapshot: &ProgressSnapshot,
        signal: Signal,
    ) -> Vec<(usize, Result<()>)> {
        info!(
            "Sending {:?} to {} processes of run {}",
            signal,
            snapshot.pids.len(),
            snapshot.run_id
        );
        snapshot
            .pids
            .iter()
            .map(|(index, pid)| (*index, self.signal_group(*pid, signal)))
            .collect()
    }

    /// SIGTERM every running command, then SIGKILL the groups still alive
    /// after the configured timeout.
    pub async fn terminate_run(&self, snapshot: &ProgressSnapshot) -> Vec<(usize, Result<()>)> {
        use tokio::time::{sleep, Duration};

        let mut results = self.signal_run(snapshot, Signal::Terminate);
        sleep(Duration::from_millis(self.config.graceful_timeout_ms)).await;

        for (index, result) in results.iter_mut() {
            let Some(pid) = snapshot.pids.get(index) else {
                continue;
            };
            if result.is_ok() && self.is_group_alive(*pid) {
                warn!("Process group {} ignored SIGTERM, killing", pid);
                *result = self.signal_group(*pid, Signal::Kill);
            }
        }
        results
    }

    /// Whether any process of the group led by `pid` still exists
    pub fn is_group_alive(&self, pid: u32) -> bool {
        #[cfg(unix)]
        {
            use nix::sys::signal::killpg;
            use nix::unistd::Pid;

            killpg(Pid::from_raw(pid as i32), None).is_ok()
        }

        #[cfg(not(unix))]
        {
            let _ = pid;
            false
        }
    }
}

#[cfg(unix)]
fn to_nix(signal: Signal) -> nix::sys::signal::Signal {
    use nix::sys::signal::Signal as NixSignal;

    match signal {
        Signal::Interrupt => NixSignal::SIGINT,
        Signal::Terminate => NixSignal::SIGTERM,
        Signal::Kill => NixSignal::SIGKILL,
        Signal::Hangup => NixSignal::SIGHUP,
    }
}
