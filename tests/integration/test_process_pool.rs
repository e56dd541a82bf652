//! Integration Tests for the Process Pool
//!
//! These tests run real child processes (`sh`, `sleep`) and check the
//! concurrency cap, exit-code collection and progress reporting.

#![cfg(unix)]

#[path = "../test_utils/mod.rs"]
mod test_utils;

use std::time::Duration;

use mailshift::execution::{NullSink, Signal, SignalHandler};
use mailshift::models::{ProgressStatus, EXIT_SPAWN_FAILED, EXIT_TOKENIZE_FAILED};
use mailshift::{ProcessPool, RunId};
use tempfile::TempDir;
use test_utils::{create_pool_config, exit_command, sleep_command, RecordingSink};

#[tokio::test]
async fn test_concurrency_cap_is_respected() {
    let dir = TempDir::new().unwrap();
    let pool = ProcessPool::new(create_pool_config(dir.path(), 2));
    let commands: Vec<String> = (0..5).map(|_| sleep_command(0.2)).collect();
    let sink = RecordingSink::new();

    let stats = pool
        .run(&RunId::new("cap"), &commands, &sink)
        .await
        .unwrap();

    assert!(sink.max_processing() <= 2, "ran {} at once", sink.max_processing());
    assert!(sink.max_processing() >= 1);
    assert_eq!(stats.exit_codes.len(), 5);
    assert!(stats.exit_codes.values().all(|code| *code == 0));
    assert!(stats.finished);
}

#[tokio::test]
async fn test_exit_codes_are_keyed_by_index() {
    let dir = TempDir::new().unwrap();
    let pool = ProcessPool::new(create_pool_config(dir.path(), 3));
    let commands = vec![exit_command(0), exit_command(1), exit_command(16), exit_command(0)];

    let stats = pool
        .run(&RunId::new("mixed"), &commands, &NullSink)
        .await
        .unwrap();

    let codes: Vec<(usize, i32)> = stats.exit_codes.into_iter().collect();
    assert_eq!(codes, vec![(0, 0), (1, 1), (2, 16), (3, 0)]);
}

#[tokio::test]
async fn test_launch_failures_get_sentinels() {
    let dir = TempDir::new().unwrap();
    let pool = ProcessPool::new(create_pool_config(dir.path(), 2));
    let commands = vec![
        exit_command(0),
        "echo 'unterminated".to_string(),
        "definitely-not-a-binary-mailshift-xyz --flag".to_string(),
        String::new(),
        exit_command(3),
    ];

    let stats = pool
        .run(&RunId::new("failures"), &commands, &NullSink)
        .await
        .unwrap();

    assert_eq!(stats.exit_codes[&0], 0);
    assert_eq!(stats.exit_codes[&1], EXIT_TOKENIZE_FAILED);
    assert_eq!(stats.exit_codes[&2], EXIT_SPAWN_FAILED);
    assert_eq!(stats.exit_codes[&3], EXIT_TOKENIZE_FAILED);
    assert_eq!(stats.exit_codes[&4], 3);
    assert_eq!(stats.failed_indices(), vec![1, 2, 3, 4]);
}

#[tokio::test]
async fn test_run_directory_is_created() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("nested").join("logs");
    let pool = ProcessPool::new(create_pool_config(&root, 1));
    let run_id = RunId::new("run-dir");

    pool.run(&run_id, &[exit_command(0)], &NullSink)
        .await
        .unwrap();

    assert!(pool.run_dir(&run_id).is_dir());
    assert_eq!(pool.run_dir(&run_id), root.join("run-dir"));
}

#[tokio::test]
async fn test_logdir_points_at_run_directory() {
    let dir = TempDir::new().unwrap();
    let pool = ProcessPool::new(create_pool_config(dir.path(), 1));
    let run_id = RunId::new("logdir");
    // The child writes into whatever --logdir it was handed
    let command = "sh -c 'touch \"${0#--logdir=}/marker\"' --logdir=/nonexistent/old";

    let stats = pool.run(&run_id, &[command], &NullSink).await.unwrap();

    assert_eq!(stats.exit_codes[&0], 0);
    assert!(pool.run_dir(&run_id).join("marker").exists());
}

#[tokio::test]
async fn test_snapshots_track_progress() {
    let dir = TempDir::new().unwrap();
    let pool = ProcessPool::new(create_pool_config(dir.path(), 1));
    let commands = vec![exit_command(0), exit_command(2), exit_command(0)];
    let sink = RecordingSink::new();

    pool.run(&RunId::new("progress"), &commands, &sink)
        .await
        .unwrap();

    let snapshots = sink.snapshots();
    assert!(!snapshots.is_empty());
    assert!(snapshots.iter().all(|s| s.total == 3));
    assert!(snapshots.iter().all(|s| s.processing <= 1));

    // Exit codes only accumulate
    for pair in snapshots.windows(2) {
        assert!(pair[0].finished() <= pair[1].finished());
    }

    let last = sink.last().unwrap();
    assert_eq!(last.status, ProgressStatus::Finished);
    assert_eq!(last.processing, 0);
    assert_eq!(last.pending, 0);
    assert!(last.pids.is_empty());
    assert_eq!(last.return_codes.len(), 3);
    assert_eq!(last.return_codes[&1], 2);
}

#[tokio::test]
async fn test_empty_batch() {
    let dir = TempDir::new().unwrap();
    let pool = ProcessPool::new(create_pool_config(dir.path(), 4));
    let sink = RecordingSink::new();

    let stats = pool
        .run::<String>(&RunId::new("empty"), &[], &sink)
        .await
        .unwrap();

    assert!(stats.exit_codes.is_empty());
    assert!(stats.finished);
    let last = sink.last().unwrap();
    assert_eq!(last.total, 0);
    assert_eq!(last.status, ProgressStatus::Finished);
}

#[tokio::test]
async fn test_cancel_running_commands() {
    let dir = TempDir::new().unwrap();
    let pool = ProcessPool::new(create_pool_config(dir.path(), 2));
    let commands = vec![sleep_command(30.0), sleep_command(30.0)];
    let sink = RecordingSink::new();
    let handler = SignalHandler::new();

    let run_id = RunId::new("cancel");
    let run = pool.run(&run_id, &commands, &sink);
    let cancel = async {
        loop {
            if let Some(snapshot) = sink.last() {
                if snapshot.pids.len() == 2 {
                    for (_, result) in handler.signal_run(&snapshot, Signal::Terminate) {
                        result.unwrap();
                    }
                    return;
                }
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    };

    let (stats, ()) = tokio::time::timeout(Duration::from_secs(10), async {
        tokio::join!(run, cancel)
    })
    .await
    .expect("run did not stop after SIGTERM");

    let stats = stats.unwrap();
    // 128 + SIGTERM
    assert_eq!(stats.exit_codes[&0], 143);
    assert_eq!(stats.exit_codes[&1], 143);
}

#[tokio::test]
async fn test_logdir_lookalike_arguments_pass_through() {
    let dir = TempDir::new().unwrap();
    let pool = ProcessPool::new(create_pool_config(dir.path(), 1));
    let run_id = RunId::new("lookalike");
    // $1 must arrive untouched; only the trailing --logdir is redirected
    let command =
        "sh -c 'printf %s \"$1\" > \"${2#--logdir=}/seen\"' x --logdir=MyPass --logdir=/old";

    let stats = pool.run(&run_id, &[command], &NullSink).await.unwrap();

    assert_eq!(stats.exit_codes[&0], 0);
    let seen = std::fs::read_to_string(pool.run_dir(&run_id).join("seen")).unwrap();
    assert_eq!(seen, "--logdir=MyPass");
}

#[tokio::test]
async fn test_non_empty_run_directory_is_reused() {
    let dir = TempDir::new().unwrap();
    let pool = ProcessPool::new(create_pool_config(dir.path(), 2));
    let run_id = RunId::new("rerun");
    std::fs::create_dir_all(pool.run_dir(&run_id)).unwrap();
    std::fs::write(pool.run_dir(&run_id).join("previous.log"), "old run").unwrap();
    let commands = vec![exit_command(0), exit_command(4)];

    let stats = pool.run(&run_id, &commands, &NullSink).await.unwrap();

    assert!(stats.finished);
    assert_eq!(stats.exit_codes.len(), 2);
    assert_eq!(stats.exit_codes[&1], 4);
    assert!(pool.run_dir(&run_id).join("previous.log").exists());
}
