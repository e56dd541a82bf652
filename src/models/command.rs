//! Compiled Command Model
//!
//! The fully formatted sync-tool invocation for one migration request.
//! The layout of the command line is consumed by existing log tooling and
//! must stay byte-for-byte stable, including the double space before
//! `--user2`.

use std::fmt;
use zeroize::Zeroizing;

use super::request::MigrationRequest;

/// Placeholder used wherever a password would be printed
pub const REDACTED: &str = "***";

/// An immutable, ready-to-run command line
#[derive(Clone, PartialEq, Eq)]
pub struct CompiledCommand {
    /// Full command line, passwords included
    line: Zeroizing<String>,
    /// Same command line with both passwords masked
    redacted: String,
    /// Log file name handed to the tool
    log_file: String,
    /// Source account
    source_account: String,
    /// Destination account
    dest_account: String,
}

/// Fixed parts of every command produced by one compiler
#[derive(Debug, Clone, Copy)]
pub struct CommandTemplate<'a> {
    /// Executable name of the sync tool
    pub tool: &'a str,
    /// Resolved source host
    pub source_host: &'a str,
    /// Resolved destination host
    pub dest_host: &'a str,
    /// Root log directory
    pub log_dir: &'a str,
    /// Extra flags appended verbatim
    pub extra_args: &'a str,
}

impl CompiledCommand {
    /// Format a command for a migration request
    pub fn build(template: &CommandTemplate<'_>, request: &MigrationRequest) -> Self {
        let source_account = request.source.account.clone();
        let dest_account = request.dest.account.clone();
        let log_file = log_file_name(
            template.source_host,
            template.dest_host,
            &source_account,
            &dest_account,
        );

        let line = render(
            template,
            &source_account,
            &quote_password(request.source.password.expose()),
            &dest_account,
            &quote_password(request.dest.password.expose()),
            &log_file,
        );
        let redacted = render(
            template,
            &source_account,
            REDACTED,
            &dest_account,
            REDACTED,
            &log_file,
        );

        Self {
            line: Zeroizing::new(line),
            redacted,
            log_file,
            source_account,
            dest_account,
        }
    }

    /// The command line, passwords included
    pub fn as_str(&self) -> &str {
        self.line.as_str()
    }

    /// The command line with passwords masked, safe to log
    pub fn redacted(&self) -> &str {
        &self.redacted
    }

    /// Log file name embedded in the command
    pub fn log_file(&self) -> &str {
        &self.log_file
    }

    /// Source account
    pub fn source_account(&self) -> &str {
        &self.source_account
    }

    /// Destination account
    pub fn dest_account(&self) -> &str {
        &self.dest_account
    }
}

impl fmt::Display for CompiledCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for CompiledCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledCommand")
            .field("line", &self.redacted)
            .field("log_file", &self.log_file)
            .finish()
    }
}

impl AsRef<str> for CompiledCommand {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Deterministic log file name for a migration pair
pub fn log_file_name(source_host: &str, dest_host: &str, user1: &str, user2: &str) -> String {
    format!("{}__{}__{}--{}.log", source_host, dest_host, user1, user2)
}

/// Make a password safe to embed between single quotes.
///
/// A `'` closes the quote, emits an escaped quote and reopens it, so
/// passwords without single quotes are left untouched.
pub fn quote_password(password: &str) -> String {
    password.replace('\'', r"'\''")
}

fn render(
    template: &CommandTemplate<'_>,
    user1: &str,
    password1: &str,
    user2: &str,
    password2: &str,
    log_file: &str,
) -> String {
    let mut line = format!(
        "{} --host1 {} --user1 {} --password1 '{}' --host2 {}  --user2 {} --password2 '{}' --log --logdir={} --logfile={} --addheader",
        template.tool,
        template.source_host,
        user1,
        password1,
        template.dest_host,
        user2,
        password2,
        template.log_dir,
        log_file,
    );
    if !template.extra_args.trim().is_empty() {
        line.push(' ');
        line.push_str(template.extra_args);
    }
    line
}
