//! mailshift - bulk mailbox migration planner and runner
//!
//! This library turns loosely formatted lists of mailbox credentials into
//! invocations of an IMAP synchronization tool (`imapsync` by default) and
//! executes the resulting batch without overwhelming the host.
//!
//! ## Module Organization
//!
//! - [`compiler`] - Line parsing, host alias resolution, command rendering, script chunks
//! - [`execution`] - Bounded process pool, progress sinks, run finalization, signals
//! - [`report`] - Exit code meanings and sync log inspection
//! - [`config`] - Configuration structures and file loading
//! - [`models`] - Data structures (MigrationRequest, CompiledCommand, RunStatistics)
//! - [`mod@error`] - Error types and Result aliases
//!
//! ## Quick Start
//!
//! ```no_run
//! use mailshift::{CommandCompiler, Config, LogSink, ProcessPool, RunId};
//!
//! # async fn demo() -> mailshift::Result<()> {
//! let config = Config::default();
//! let resolver = config.host_resolver()?;
//! let mut compiler = CommandCompiler::new("sv01", "mail.dest.org", &config.compiler, &resolver);
//! let commands = compiler.compile_all(["alice@a.com secret bob@b.com hunter2"]);
//!
//! let pool = ProcessPool::new(config.pool.clone());
//! let stats = pool.run(&RunId::generate(), &commands, &LogSink).await?;
//! println!("{} of {} succeeded", stats.succeeded(), stats.exit_codes.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Security
//!
//! Passwords live in zeroizing buffers, are masked in `Debug` output and
//! logs, and commands are executed from an argument vector so no shell ever
//! sees them.

#[macro_use]
extern crate tracing;

pub mod compiler;
pub mod config;
pub mod error;
pub mod execution;
pub mod models;
pub mod report;

// Re-exports for core functionality
pub use compiler::{CommandCompiler, HostResolver, LineParser, ScriptWriter};
pub use config::{Config, ConfigLoader};
pub use error::{Error, Result};
pub use execution::{LogSink, NullSink, ProcessPool, ProgressSink, RunFinalizer, SignalHandler};
pub use models::{CompiledCommand, MigrationRequest, ProgressSnapshot, RunId, RunStatistics};

use std::path::Path;

// Version information
/// The current version of mailshift from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The crate name from Cargo.toml
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Load and validate configuration.
///
/// An explicit path wins over `$MAILSHIFT_CONFIG` and the search paths.
/// Without any file the defaults are used.
///
/// # Errors
///
/// Fails if an explicitly named file is missing, cannot be parsed, or does
/// not validate.
pub fn init(config_path: Option<&Path>) -> Result<Config> {
    let config = ConfigLoader::load_from(config_path)?;
    debug!(
        "{} alias rules, at most {} concurrent commands",
        config.hosts.len(),
        config.pool.max_concurrency
    );
    Ok(config)
}
