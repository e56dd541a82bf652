//! Configuration management for mailshift
//!
//! Everything an operator may tune lives in one [`Config`] loaded from TOML
//! or JSON: the sync tool invocation, the parser, host alias rules, the
//! process pool and script output. Every section has defaults, so a
//! configuration file only needs the keys it changes.

pub mod loader;

pub use loader::{ConfigFormat, ConfigLoader, LoadOptions};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::compiler::{AliasRuleConfig, HostResolver, ParserConfig, DEFAULT_CHUNK_SIZE};
use crate::error::{Error, Result};

/// Default root for per-run log directories
pub const DEFAULT_LOG_ROOT: &str = "/var/log/mailshift";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Command compilation
    pub compiler: CompilerConfig,

    /// Process pool
    pub pool: PoolConfig,

    /// Script artifacts
    pub output: OutputConfig,

    /// Host alias rules, tried in order
    pub hosts: Vec<AliasRuleConfig>,

    /// Log level used when `RUST_LOG` is unset
    pub log_level: LogLevel,
}

impl Config {
    /// Check every section; alias rules are compiled to catch bad patterns
    pub fn validate(&self) -> Result<()> {
        if self.compiler.tool.trim().is_empty() {
            return Err(Error::ConfigValidationFailed {
                field: "compiler.tool".to_string(),
                reason: "Tool name cannot be empty".to_string(),
            });
        }

        if self.compiler.parser.fallback_separator.is_empty() {
            return Err(Error::ConfigValidationFailed {
                field: "compiler.fallback_separator".to_string(),
                reason: "Fallback separator cannot be empty".to_string(),
            });
        }

        if let Some(domain) = &self.compiler.parser.default_domain {
            if domain.is_empty() || domain.contains(char::is_whitespace) || domain.contains('@') {
                return Err(Error::ConfigValidationFailed {
                    field: "compiler.default_domain".to_string(),
                    reason: format!("'{}' is not a domain", domain),
                });
            }
        }

        if self.pool.max_concurrency == 0 {
            return Err(Error::ConfigValidationFailed {
                field: "pool.max_concurrency".to_string(),
                reason: "At least one process must be allowed to run".to_string(),
            });
        }

        if self.pool.log_root.as_os_str().is_empty() {
            return Err(Error::ConfigValidationFailed {
                field: "pool.log_root".to_string(),
                reason: "Log root cannot be empty".to_string(),
            });
        }

        if self.output.chunk_size == 0 {
            return Err(Error::ConfigValidationFailed {
                field: "output.chunk_size".to_string(),
                reason: "Chunk size must be greater than 0".to_string(),
            });
        }

        if !LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(Error::ConfigValidationFailed {
                field: "log_level".to_string(),
                reason: format!("Expected one of {}", LOG_LEVELS.join(", ")),
            });
        }

        self.host_resolver().map(|_| ())
    }

    /// Compile the alias rules
    pub fn host_resolver(&self) -> Result<HostResolver> {
        HostResolver::from_config(&self.hosts)
    }
}

/// Log level name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogLevel(String);

impl LogLevel {
    pub fn new(level: impl Into<String>) -> Self {
        Self(level.into().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for LogLevel {
    fn default() -> Self {
        Self("info".to_string())
    }
}

/// How commands are rendered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Sync tool executable
    pub tool: String,

    /// Directory written into `--logdir=`; the pool replaces it per run
    pub log_root: PathBuf,

    /// Flags appended verbatim to every command
    pub extra_args: String,

    /// Line parser settings
    #[serde(flatten)]
    pub parser: ParserConfig,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            tool: "imapsync".to_string(),
            log_root: PathBuf::from(DEFAULT_LOG_ROOT),
            extra_args: String::new(),
            parser: ParserConfig::default(),
        }
    }
}

/// Process pool settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Maximum number of commands running at once
    pub max_concurrency: usize,

    /// Each run writes its logs to `{log_root}/{run_id}`
    pub log_root: PathBuf,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 5,
            log_root: PathBuf::from(DEFAULT_LOG_ROOT),
        }
    }
}

/// Script artifact settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Prefix of the generated `{destination}_{n}.sh` files
    pub destination: PathBuf,

    /// Commands per script
    pub chunk_size: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            destination: PathBuf::from("sync"),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}
