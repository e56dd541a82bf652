//! Integration Tests for Compilation Flows
//!
//! These tests drive the compiler the way the CLI does: from credential
//! text or files to commands, domains and script artifacts.

#[path = "../test_utils/mod.rs"]
mod test_utils;

use mailshift::compiler::{chunked, HostResolver, ScriptWriter};
use mailshift::config::CompilerConfig;
use mailshift::{CommandCompiler, CompiledCommand};
use tempfile::TempDir;
use test_utils::{sample_credentials, write_credentials};

fn compiler(source: &str, dest: &str) -> CommandCompiler {
    CommandCompiler::new(source, dest, &CompilerConfig::default(), &HostResolver::new())
}

#[test]
fn test_end_to_end_single_line() {
    let mut compiler = compiler("h1", "h2");
    let commands = compiler.compile_all(["alice@co.com Secret1 bob@co.com Secret2"]);

    assert_eq!(commands.len(), 1);
    let command = commands[0].as_str();
    assert!(command.contains(
        "--host1 h1 --user1 alice@co.com --password1 'Secret1' --host2 h2  --user2 bob@co.com --password2 'Secret2'"
    ));
    assert_eq!(commands[0].log_file(), "h1__h2__alice@co.com--bob@co.com.log");
    assert!(command.contains("--logfile=h1__h2__alice@co.com--bob@co.com.log"));

    let domains: Vec<&str> = compiler.domains().iter().map(String::as_str).collect();
    assert_eq!(domains, vec!["co.com"]);
}

#[test]
fn test_mixed_input_keeps_valid_lines() {
    let mut compiler = compiler("src", "dst");
    let commands = compiler.compile_all(sample_credentials());

    let users: Vec<(&str, &str)> = commands
        .iter()
        .map(|c| (c.source_account(), c.dest_account()))
        .collect();
    assert_eq!(
        users,
        vec![
            ("alice@co.com", "bob@co.com"),
            ("carol@co.com", "carol@co.com"),
            ("dave@old.org", "erin@new.org"),
        ]
    );
    let domains: Vec<&str> = compiler.domains().iter().map(String::as_str).collect();
    assert_eq!(domains, vec!["co.com", "new.org", "old.org"]);
}

#[test]
fn test_compilation_is_deterministic() {
    let first: Vec<String> = compiler("h1", "h2")
        .compile_all(sample_credentials())
        .iter()
        .map(|c| c.as_str().to_string())
        .collect();
    let second: Vec<String> = compiler("h1", "h2")
        .compile_all(sample_credentials())
        .iter()
        .map(|c| c.as_str().to_string())
        .collect();
    assert_eq!(first, second);
}

#[test]
fn test_file_and_memory_inputs_agree() {
    let dir = TempDir::new().unwrap();
    let path = write_credentials(dir.path(), "creds.txt", &sample_credentials());

    let mut from_file = compiler("h1", "h2");
    let file_commands: Vec<CompiledCommand> = from_file
        .compile_file(&path)
        .unwrap()
        .collect::<mailshift::Result<_>>()
        .unwrap();

    let mut from_memory = compiler("h1", "h2");
    let memory_commands = from_memory.compile_all(sample_credentials());

    assert_eq!(file_commands, memory_commands);
    assert_eq!(from_file.domains(), from_memory.domains());
}

#[test]
fn test_aliases_and_extra_args() {
    let resolver = HostResolver::from_pairs([("sv[0-9]{2}", ".example.com")]);
    let mut compiler =
        CommandCompiler::new("sv01", "mx.dest.org", &CompilerConfig::default(), &resolver)
            .with_extra_args("--dry --justfolders");
    let command = compiler.compile_line("a@b.com pw").unwrap();

    assert!(command.as_str().contains("--host1 sv01.example.com "));
    assert!(command.as_str().contains("--host2 mx.dest.org  "));
    assert!(command.as_str().ends_with("--addheader --dry --justfolders"));
    assert_eq!(command.log_file(), "sv01.example.com__mx.dest.org__a@b.com--a@b.com.log");
}

#[test]
fn test_blank_extra_args_are_ignored() {
    let mut compiler = compiler("h1", "h2").with_extra_args("   ");
    let command = compiler.compile_line("a@b.com pw").unwrap();
    assert!(command.as_str().ends_with("--addheader"));
}

#[test]
fn test_scripts_from_file() {
    let dir = TempDir::new().unwrap();
    let lines: Vec<String> = (0..65).map(|n| format!("user{}@corp.com pw{}", n, n)).collect();
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    let path = write_credentials(dir.path(), "big.txt", &refs);

    let mut compiler = compiler("h1", "h2");
    let mut writer = ScriptWriter::new(dir.path().join("out").join("sync"));
    let written = writer
        .write_all(compiler.compile_file(&path).unwrap(), 30)
        .unwrap();

    assert_eq!(written.len(), 3);
    let counts: Vec<usize> = written
        .iter()
        .map(|p| std::fs::read_to_string(p).unwrap().lines().count())
        .collect();
    assert_eq!(counts, vec![30, 30, 5]);
    assert!(written[2].ends_with("sync_2.sh"));
    assert_eq!(writer.file_count(), 3);
}

#[test]
fn test_chunked_commands() {
    let mut compiler = compiler("h1", "h2");
    let chunks: Vec<Vec<CompiledCommand>> =
        chunked(compiler.compile(sample_credentials()), 2).collect();
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].len(), 2);
    assert_eq!(chunks[1].len(), 1);
}

#[test]
fn test_shell_metacharacters_in_accounts_are_rejected() {
    let mut compiler = compiler("h1", "h2");
    let commands = compiler.compile_all([
        "$(touch${IFS}/tmp/pwned)@x.com pw",
        "`id`@x.com pw",
        "a;reboot@x.com pw",
        "a/../../b@x.com pw",
        "good@x.com pw",
    ]);

    assert_eq!(commands.len(), 1);
    assert_eq!(commands[0].source_account(), "good@x.com");
    assert_eq!(compiler.stats().lines_rejected, 4);
    for command in &commands {
        assert!(!command.log_file().contains('/'));
    }
}
