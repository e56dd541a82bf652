//! Sync tool exit codes
//!
//! Return values documented by imapsync, plus the codes the pool records
//! for commands that never ran or were killed.

use crate::models::{EXIT_SPAWN_FAILED, EXIT_TOKENIZE_FAILED, EXIT_WAIT_FAILED};

/// How bad an exit code is
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Ok,
    Warning,
    Failure,
}

/// Documented meaning of one exit code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCodeInfo {
    pub code: i32,
    /// Symbolic name used by the tool
    pub name: &'static str,
    /// Human-readable description
    pub description: &'static str,
    pub severity: Severity,
}

const fn info(
    code: i32,
    name: &'static str,
    description: &'static str,
    severity: Severity,
) -> ExitCodeInfo {
    ExitCodeInfo {
        code,
        name,
        description,
        severity,
    }
}

use Severity::{Failure, Ok as Fine, Warning};

static EXIT_CODES: &[ExitCodeInfo] = &[
    info(0, "OK", "Transfer ok", Fine),
    info(1, "CATCH_ALL", "Catch-all error", Warning),
    info(6, "EXIT_SIGNALLED", "Received exit signal", Warning),
    info(7, "EXIT_BY_FILE", "Exit by file", Warning),
    info(8, "EXIT_PID_FILE_ERROR", "PID file error", Warning),
    info(10, "EXIT_CONNECTION_FAILURE", "Connection failure", Failure),
    info(12, "EXIT_TLS_FAILURE", "TLS failure", Failure),
    info(16, "EXIT_AUTHENTICATION_FAILURE", "Authentication failure", Failure),
    info(21, "EXIT_SUBFOLDER1_NO_EXISTS", "Subfolder 1 does not exist", Warning),
    info(64, "BAD_USAGE", "Bad usage, possible invalid argument", Failure),
    info(66, "NO_INPUT", "Received no input", Failure),
    info(69, "SERVICE_UNAVAILABLE", "Service unavailable", Warning),
    info(70, "INTERNAL_SOFTWARE_ERROR", "Internal software error", Failure),
    info(101, "EXIT_CONNECTION_FAILURE_HOST1", "Failed to connect on host1", Failure),
    info(102, "EXIT_CONNECTION_FAILURE_HOST2", "Failed to connect on host2", Failure),
    info(111, "EXIT_WITH_ERRORS", "Exit with errors", Warning),
    info(112, "EXIT_WITH_ERRORS_MAX", "Reached max errors", Failure),
    info(113, "EXIT_OVERQUOTA", "Reached max quota", Failure),
    info(114, "EXIT_ERR_APPEND", "Failed to append message", Failure),
    info(115, "EXIT_ERR_FETCH", "Failed to fetch", Failure),
    info(116, "EXIT_ERR_CREATE", "Failed to create folder", Failure),
    info(117, "EXIT_ERR_SELECT", "Failed to select folder", Warning),
    info(118, "EXIT_TRANSFER_EXCEEDED", "Transfer exceeded", Failure),
    info(119, "EXIT_ERR_APPEND_VIRUS", "Failed to append, possible virus", Failure),
    info(161, "EXIT_AUTHENTICATION_FAILURE_USER1", "Failed to authenticate user1", Failure),
    info(162, "EXIT_AUTHENTICATION_FAILURE_USER2", "Failed to authenticate user2", Failure),
    info(254, "EXIT_TESTS_FAILED", "Tests failed", Warning),
    info(EXIT_TOKENIZE_FAILED, "TOKENIZE_FAILED", "Command could not be split into arguments", Failure),
    info(EXIT_SPAWN_FAILED, "SPAWN_FAILED", "Command could not be started", Failure),
    info(EXIT_WAIT_FAILED, "WAIT_FAILED", "Command status could not be collected", Failure),
];

/// Look up a documented exit code
pub fn lookup(code: i32) -> Option<&'static ExitCodeInfo> {
    EXIT_CODES.iter().find(|info| info.code == code)
}

/// Describe any exit code, including `128 + signal` codes
pub fn describe(code: i32) -> String {
    if let Some(info) = lookup(code) {
        return info.description.to_string();
    }
    if (129..=192).contains(&code) {
        return format!("Terminated by signal {}", code - 128);
    }
    format!("Unknown exit code {}", code)
}

/// Severity of any exit code; undocumented codes count as failures
pub fn severity(code: i32) -> Severity {
    lookup(code).map_or(Severity::Failure, |info| info.severity)
}
