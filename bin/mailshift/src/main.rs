//! mailshift - compile mailbox credential lists into imapsync runs
//!
//! Thin binary over the mailshift library: argument parsing, logging setup
//! and output formatting.

mod cli;

use std::env;
use std::process::ExitCode;

use clap::Parser;
use tracing::{debug, error, info};

use cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Configuration comes first so its log level can seed the filter
    let config = match mailshift::init(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let log_level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.log_level.as_str().to_string());
    let env_filter = env::var("RUST_LOG").unwrap_or(log_level);
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(env_filter))
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    info!("Starting {} v{}", mailshift::NAME, mailshift::VERSION);
    debug!("Configuration: {:?}", config);

    match cli::run(cli, config).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
