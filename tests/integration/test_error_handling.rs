//! Integration Tests for Error Handling
//!
//! These tests verify that fatal conditions surface as typed errors while
//! per-line and per-command problems do not abort anything.

#[path = "../test_utils/mod.rs"]
mod test_utils;

use std::path::Path;

use mailshift::compiler::HostResolver;
use mailshift::config::{CompilerConfig, ConfigLoader};
use mailshift::execution::NullSink;
use mailshift::{CommandCompiler, Error, ProcessPool, RunId};
use tempfile::TempDir;
use test_utils::{create_pool_config, create_test_config, exit_command, write_credentials};

fn compiler() -> CommandCompiler {
    CommandCompiler::new("h1", "h2", &CompilerConfig::default(), &HostResolver::new())
}

#[test]
fn test_empty_input_path() {
    let mut compiler = compiler();
    let result = compiler.compile_file(Path::new(""));
    assert!(matches!(result, Err(Error::InvalidInput { .. })));
}

#[test]
fn test_missing_input_file() {
    let dir = TempDir::new().unwrap();
    let mut compiler = compiler();
    let result = compiler.compile_file(&dir.path().join("nope.txt"));

    match result {
        Err(e @ Error::InvalidInput { .. }) => {
            assert!(e.is_configuration_error());
            assert!(e.to_string().contains("nope.txt"));
        }
        Err(other) => panic!("expected InvalidInput, got {}", other),
        Ok(_) => panic!("expected InvalidInput"),
    }
}

#[test]
fn test_directory_as_input() {
    let dir = TempDir::new().unwrap();
    let mut compiler = compiler();
    assert!(matches!(
        compiler.compile_file(dir.path()),
        Err(Error::InvalidInput { .. })
    ));
}

#[cfg(unix)]
#[test]
fn test_invalid_utf8_stops_the_stream() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("binary.txt");
    std::fs::write(&path, b"a@b.com pw\n\xff\xfe\nc@d.com pw\n").unwrap();

    let mut compiler = compiler();
    let results: Vec<_> = compiler.compile_file(&path).unwrap().collect();

    assert_eq!(results.len(), 2);
    assert!(results[0].is_ok());
    assert!(matches!(results[1], Err(Error::InputRead { .. })));
}

#[test]
fn test_bad_lines_never_abort_compilation() {
    let dir = TempDir::new().unwrap();
    let path = write_credentials(
        dir.path(),
        "creds.txt",
        &["???", "a@b.com pw", "no accounts here", "", "c@d.com pw"],
    );

    let mut compiler = compiler();
    let commands: Vec<_> = compiler
        .compile_file(&path)
        .unwrap()
        .collect::<mailshift::Result<_>>()
        .unwrap();

    assert_eq!(commands.len(), 2);
    let stats = compiler.stats();
    assert_eq!(stats.lines_read, 5);
    assert_eq!(stats.commands, 2);
    assert_eq!(stats.lines_rejected, 2);
    assert_eq!(stats.lines_skipped, 1);
}

#[tokio::test]
async fn test_log_root_under_a_file() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, "x").unwrap();
    let pool = ProcessPool::new(create_pool_config(&blocker, 2));

    let result = pool
        .run(&RunId::new("r1"), &[exit_command(0)], &NullSink)
        .await;

    match result {
        Err(e @ Error::LogDirCreationFailed { .. }) => assert!(e.is_engine_failure()),
        other => panic!("expected LogDirCreationFailed, got {:?}", other),
    }
}

#[test]
fn test_invalid_configuration_values() {
    let dir = TempDir::new().unwrap();

    let mut config = create_test_config(dir.path());
    config.pool.max_concurrency = 0;
    assert!(matches!(
        config.validate(),
        Err(Error::ConfigValidationFailed { ref field, .. }) if field == "pool.max_concurrency"
    ));

    let mut config = create_test_config(dir.path());
    config.hosts.push(mailshift::compiler::AliasRuleConfig::new("sv[", ".x.com"));
    assert!(matches!(
        config.validate(),
        Err(Error::InvalidAliasRule { .. })
    ));

    assert!(create_test_config(dir.path()).validate().is_ok());
}

#[test]
fn test_malformed_config_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[pool\nmax_concurrency = ").unwrap();

    match ConfigLoader::load_from(Some(&path)) {
        Err(Error::ConfigParseFailed { format, .. }) => assert_eq!(format, "TOML"),
        other => panic!("expected ConfigParseFailed, got {:?}", other),
    }
}

#[test]
fn test_explicit_config_must_exist() {
    let dir = TempDir::new().unwrap();
    let result = ConfigLoader::load_from(Some(&dir.path().join("missing.toml")));
    assert!(matches!(result, Err(Error::ConfigLoadFailed { .. })));
}
