//! Security Tests: Password Isolation
//!
//! These tests verify that mailbox passwords only appear where the sync
//! tool needs them: the command line itself and the owner-only scripts.
//! Debug output, redacted lines, log file names and progress payloads must
//! never carry them.

#[path = "../test_utils/mod.rs"]
mod test_utils;

use std::fs;
use tempfile::TempDir;

use mailshift::compiler::{HostResolver, LineParser, ScriptWriter};
use mailshift::config::CompilerConfig;
use mailshift::models::{Credential, Password};
use mailshift::CommandCompiler;

const SECRET_1: &str = "Tr0ub4dor&3";
const SECRET_2: &str = "correct horse battery";

fn compiled() -> mailshift::CompiledCommand {
    CommandCompiler::new("h1", "h2", &CompilerConfig::default(), &HostResolver::new())
        .compile_line(&format!("a@co.com {} b@co.com {}", SECRET_1, SECRET_2))
        .expect("line should compile")
}

#[test]
fn test_password_debug_is_masked() {
    let password = Password::new(SECRET_1);
    let debug = format!("{:?}", password);
    assert!(!debug.contains(SECRET_1), "Debug leaked password: {}", debug);

    let credential = Credential::new("a@co.com", SECRET_1);
    let debug = format!("{:?}", credential);
    assert!(debug.contains("a@co.com"));
    assert!(!debug.contains(SECRET_1));
}

#[test]
fn test_parsed_request_debug_is_masked() {
    let request = LineParser::default()
        .parse(&format!("a@co.com {} b@co.com {}", SECRET_1, SECRET_2), &mut |_| {})
        .unwrap();
    let debug = format!("{:?}", request);
    assert!(!debug.contains(SECRET_1));
    assert!(!debug.contains(SECRET_2));
}

#[test]
fn test_command_debug_and_redacted_line() {
    let command = compiled();
    assert!(command.as_str().contains(SECRET_1));
    assert!(command.as_str().contains(SECRET_2));

    for text in [format!("{:?}", command), command.redacted().to_string()] {
        assert!(!text.contains(SECRET_1), "leaked: {}", text);
        assert!(!text.contains(SECRET_2), "leaked: {}", text);
    }
    assert!(command.redacted().contains("--password1 '***'"));
    assert!(command.redacted().contains("--password2 '***'"));
}

#[test]
fn test_log_file_name_has_no_password() {
    let command = compiled();
    assert!(!command.log_file().contains(SECRET_1));
    assert!(!command.log_file().contains(SECRET_2));
}

#[test]
fn test_script_permissions_are_owner_only() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let mut writer = ScriptWriter::new(temp_dir.path().join("sync"));
    let path = writer
        .write_chunk(&[compiled()])
        .expect("Failed to write script");

    let content = fs::read_to_string(&path).unwrap();
    assert!(content.contains(SECRET_1));

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(
            perms, 0o700,
            "Script should have 0700 permissions, got {:o}",
            perms
        );
    }
}

#[cfg(unix)]
#[tokio::test]
async fn test_progress_payload_has_no_password() {
    use mailshift::{ProcessPool, RunId};
    use test_utils::{create_pool_config, RecordingSink};

    let temp_dir = TempDir::new().unwrap();
    let pool = ProcessPool::new(create_pool_config(temp_dir.path(), 1));
    let sink = RecordingSink::new();
    let command = format!("sh -c 'exit 0' '{}'", SECRET_1);

    pool.run(&RunId::new("secrets"), &[command], &sink)
        .await
        .unwrap();

    for snapshot in sink.snapshots() {
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(!json.contains(SECRET_1));
    }
}
