//! Test Fixtures
//!
//! Common test data and helpers for testing

use mailshift::config::{Config, PoolConfig};
use mailshift::execution::ProgressSink;
use mailshift::models::ProgressSnapshot;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Credential lines in every format the parser accepts
pub fn sample_credentials() -> Vec<&'static str> {
    vec![
        "alice@co.com Secret1 bob@co.com Secret2",
        "carol@co.com pw-with-dash",
        "dave@old.org,p@ss|erin@new.org,w0rd",
        "",
        "x",
        "this line has no accounts",
    ]
}

/// Write credential lines to `name` inside `dir`
pub fn write_credentials(dir: &Path, name: &str, lines: &[&str]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, lines.join("\n")).expect("Failed to write credentials");
    path
}

/// Configuration whose run directories live under `log_root`
pub fn create_test_config(log_root: &Path) -> Config {
    let mut config = Config::default();
    config.compiler.log_root = log_root.to_path_buf();
    config.pool = create_pool_config(log_root, 5);
    config
}

/// Pool configuration rooted at `log_root`
pub fn create_pool_config(log_root: &Path, max_concurrency: usize) -> PoolConfig {
    PoolConfig {
        max_concurrency,
        log_root: log_root.to_path_buf(),
    }
}

/// Command that exits with `code`
pub fn exit_command(code: i32) -> String {
    format!("sh -c 'exit {}'", code)
}

/// Command that sleeps for `secs` seconds
pub fn sleep_command(secs: f32) -> String {
    format!("sleep {}", secs)
}

/// Sink that keeps every snapshot it receives
#[derive(Default)]
pub struct RecordingSink {
    snapshots: Mutex<Vec<ProgressSnapshot>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshots(&self) -> Vec<ProgressSnapshot> {
        self.snapshots.lock().expect("sink lock").clone()
    }

    /// Highest `processing` count ever reported
    pub fn max_processing(&self) -> usize {
        self.snapshots()
            .iter()
            .map(|s| s.processing)
            .max()
            .unwrap_or(0)
    }

    pub fn last(&self) -> Option<ProgressSnapshot> {
        self.snapshots().last().cloned()
    }
}

impl ProgressSink for RecordingSink {
    fn publish(&self, snapshot: &ProgressSnapshot) {
        self.snapshots.lock().expect("sink lock").push(snapshot.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mailshift::models::{ProgressStatus, RunId};
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    #[test]
    fn test_create_test_config() {
        let dir = TempDir::new().unwrap();
        let config = create_test_config(dir.path());
        assert!(config.validate().is_ok());
        assert_eq!(config.pool.log_root, dir.path());
    }

    #[test]
    fn test_write_credentials() {
        let dir = TempDir::new().unwrap();
        let path = write_credentials(dir.path(), "creds.txt", &sample_credentials());
        let content = std::fs::read_to_string(path).unwrap();
        assert_eq!(content.lines().count(), 6);
    }

    #[test]
    fn test_commands() {
        assert_eq!(exit_command(3), "sh -c 'exit 3'");
        assert_eq!(sleep_command(0.5), "sleep 0.5");
    }

    #[test]
    fn test_recording_sink() {
        let sink = RecordingSink::new();
        for processing in [1, 3, 2] {
            sink.publish(&ProgressSnapshot {
                run_id: RunId::new("r"),
                processing,
                pending: 0,
                total: 3,
                return_codes: BTreeMap::new(),
                status: ProgressStatus::Processing,
                pids: BTreeMap::new(),
            });
        }
        assert_eq!(sink.max_processing(), 3);
        assert_eq!(sink.last().map(|s| s.processing), Some(2));
    }
}
