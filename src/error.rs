//! Error types and Result aliases for mailshift

use std::fmt;
use std::path::PathBuf;

/// Result type alias for mailshift operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for mailshift
///
/// Per-line parse failures and per-command launch failures are not errors:
/// the first are logged and skipped, the second are recorded as sentinel
/// exit codes. Everything here aborts the call that raised it.
#[derive(Debug)]
pub enum Error {
    // === Input errors ===
    /// Credential file path was empty or does not exist
    InvalidInput {
        path: PathBuf,
        reason: String,
    },

    /// Credential file could not be opened or read
    InputRead {
        path: PathBuf,
        reason: String,
    },

    // === Configuration errors ===
    /// Failed to load configuration file
    ConfigLoadFailed {
        path: PathBuf,
        reason: String,
    },

    /// Configuration file not found
    ConfigNotFound,

    /// Configuration validation failed
    ConfigValidationFailed {
        field: String,
        reason: String,
    },

    /// Failed to parse configuration
    ConfigParseFailed {
        format: String,
        reason: String,
    },

    /// Host alias rule has a malformed pattern
    InvalidAliasRule {
        pattern: String,
        reason: String,
    },

    // === Engine errors ===
    /// Per-run log directory could not be created
    LogDirCreationFailed {
        path: PathBuf,
        reason: String,
    },

    /// No process could be launched because the system ran out of resources
    ResourceExhausted {
        command_index: usize,
        reason: String,
    },

    /// Failed to send signal to process
    SignalSendFailed {
        signal: String,
        reason: String,
    },

    /// Signal handling not supported on platform
    SignalNotSupported {
        signal: String,
        platform: String,
    },

    // === Output errors ===
    /// Failed to write a script artifact
    ScriptWriteFailed {
        path: PathBuf,
        reason: String,
    },

    // === I/O and serialization errors ===
    /// I/O errors
    Io(std::io::Error),

    /// Serialization errors
    Serde(serde_json::Error),

    /// TOML parsing errors
    Toml(toml::de::Error),

    /// Regex compilation errors
    Regex(regex::Error),

    // === Generic fallback (use sparingly) ===
    /// Generic errors (for cases not yet categorized)
    Other(String),
}

impl Error {
    /// Whether this error belongs to the configuration/input class
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidInput { .. }
                | Error::InputRead { .. }
                | Error::ConfigLoadFailed { .. }
                | Error::ConfigNotFound
                | Error::ConfigValidationFailed { .. }
                | Error::ConfigParseFailed { .. }
                | Error::InvalidAliasRule { .. }
        )
    }

    /// Whether this error aborted a whole run
    pub fn is_engine_failure(&self) -> bool {
        matches!(
            self,
            Error::LogDirCreationFailed { .. } | Error::ResourceExhausted { .. }
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Input errors
            Error::InvalidInput { path, reason } => {
                write!(f, "Invalid input file '{}': {}", path.display(), reason)
            }
            Error::InputRead { path, reason } => {
                write!(f, "Failed to read input '{}': {}", path.display(), reason)
            }

            // Configuration errors
            Error::ConfigLoadFailed { path, reason } => {
                write!(f, "Failed to load config from '{}': {}", path.display(), reason)
            }
            Error::ConfigNotFound => {
                write!(f, "Configuration file not found")
            }
            Error::ConfigValidationFailed { field, reason } => {
                write!(f, "Configuration validation failed for '{}': {}", field, reason)
            }
            Error::ConfigParseFailed { format, reason } => {
                write!(f, "Failed to parse {} config: {}", format, reason)
            }
            Error::InvalidAliasRule { pattern, reason } => {
                write!(f, "Invalid host alias pattern '{}': {}", pattern, reason)
            }

            // Engine errors
            Error::LogDirCreationFailed { path, reason } => {
                write!(f, "Failed to create log directory '{}': {}", path.display(), reason)
            }
            Error::ResourceExhausted { command_index, reason } => {
                write!(
                    f,
                    "Out of resources while launching command #{}: {}",
                    command_index, reason
                )
            }
            Error::SignalSendFailed { signal, reason } => {
                write!(f, "Failed to send signal '{}': {}", signal, reason)
            }
            Error::SignalNotSupported { signal, platform } => {
                write!(f, "Signal '{}' not supported on {}", signal, platform)
            }

            // Output errors
            Error::ScriptWriteFailed { path, reason } => {
                write!(f, "Failed to write script '{}': {}", path.display(), reason)
            }

            // I/O and serialization errors
            Error::Io(err) => write!(f, "I/O error: {}", err),
            Error::Serde(err) => write!(f, "Serialization error: {}", err),
            Error::Toml(err) => write!(f, "TOML parsing error: {}", err),
            Error::Regex(err) => write!(f, "Regex compilation error: {}", err),

            // Generic fallback
            Error::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Serde(err) => Some(err),
            Error::Toml(err) => Some(err),
            Error::Regex(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serde(err)
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Toml(err)
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Other(err.to_string())
    }
}

impl From<regex::Error> for Error {
    fn from(err: regex::Error) -> Self {
        Error::Regex(err)
    }
}

impl From<String> for Error {
    fn from(err: String) -> Self {
        Error::Other(err)
    }
}

impl From<&str> for Error {
    fn from(err: &str) -> Self {
        Error::Other(err.to_string())
    }
}
