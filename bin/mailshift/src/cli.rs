//! Command-line interface
//!
//! - `compile`: write chunked shell scripts from a credential file
//! - `run`: compile and execute under the concurrency cap
//! - `report`: summarize the sync logs of a run directory

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use tokio::sync::watch;
use tracing::{info, warn};

use mailshift::compiler::check_input_path;
use mailshift::execution::{LogSink, ProgressSink, Signal, SignalHandler};
use mailshift::report::summarize_dir;
use mailshift::{
    CommandCompiler, CompiledCommand, Config, ProcessPool, ProgressSnapshot, RunId, ScriptWriter,
};

/// Bulk mailbox migration with imapsync
#[derive(Parser, Debug)]
#[command(name = "mailshift")]
#[command(version)]
pub struct Cli {
    /// Configuration file (TOML or JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write imapsync commands to chunked shell scripts
    Compile(CompileArgs),
    /// Compile and execute the commands
    Run(RunArgs),
    /// Summarize the sync logs in a run directory
    Report {
        /// Run log directory
        dir: PathBuf,
    },
}

/// Arguments shared by `compile` and `run`
#[derive(Args, Debug)]
pub struct SourceArgs {
    /// Source host (aliases are expanded)
    pub host1: String,

    /// Destination host (aliases are expanded)
    pub host2: String,

    /// Credential file, one migration per line
    pub creds_file: PathBuf,

    /// Domain appended to accounts without one
    #[arg(short, long)]
    pub domain: Option<String>,

    /// Flags appended to every command
    #[arg(long, allow_hyphen_values = true)]
    pub extra_args: Option<String>,
}

#[derive(Args, Debug)]
pub struct CompileArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Script name prefix
    #[arg(long)]
    pub destination: Option<PathBuf>,

    /// Commands per script
    #[arg(short, long)]
    pub split: Option<usize>,

    /// Log redacted commands instead of writing scripts
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Maximum number of commands running at once
    #[arg(short, long)]
    pub max_procs: Option<usize>,

    /// Identifier of the run; also its log subdirectory name
    #[arg(long)]
    pub run_id: Option<String>,
}

/// Run the CLI command
pub async fn run(cli: Cli, mut config: Config) -> anyhow::Result<ExitCode> {
    match cli.command {
        Commands::Compile(args) => {
            apply_source_args(&mut config, &args.source);
            if let Some(split) = args.split {
                config.output.chunk_size = split;
            }
            if let Some(destination) = args.destination {
                config.output.destination = destination;
            }
            config.validate()?;
            compile(&config, &args.source, args.dry_run)
        }
        Commands::Run(args) => {
            apply_source_args(&mut config, &args.source);
            if let Some(max_procs) = args.max_procs {
                config.pool.max_concurrency = max_procs;
            }
            config.validate()?;
            let run_id = args.run_id.map(RunId::new).unwrap_or_else(RunId::generate);
            execute(&config, &args.source, run_id).await
        }
        Commands::Report { dir } => report(dir),
    }
}

fn apply_source_args(config: &mut Config, args: &SourceArgs) {
    if let Some(domain) = &args.domain {
        config.compiler.parser.default_domain = Some(domain.clone());
    }
    if let Some(extra_args) = &args.extra_args {
        config.compiler.extra_args = extra_args.clone();
    }
}

fn compiler_for(config: &Config, args: &SourceArgs) -> anyhow::Result<CommandCompiler> {
    check_input_path(&args.creds_file)?;
    let resolver = config.host_resolver()?;
    Ok(CommandCompiler::new(
        &args.host1,
        &args.host2,
        &config.compiler,
        &resolver,
    ))
}

fn print_domains(compiler: &CommandCompiler) {
    let domains: Vec<&str> = compiler.domains().iter().map(String::as_str).collect();
    println!("Domains: {}", domains.join(", "));
}

fn compile(config: &Config, args: &SourceArgs, dry_run: bool) -> anyhow::Result<ExitCode> {
    let mut compiler = compiler_for(config, args)?;

    if dry_run {
        for command in compiler.compile_file(&args.creds_file)? {
            info!("{}", command?.redacted());
        }
    } else {
        let mut writer = ScriptWriter::new(&config.output.destination);
        let commands = compiler.compile_file(&args.creds_file)?;
        for path in writer.write_all(commands, config.output.chunk_size)? {
            println!("{}", path.display());
        }
    }

    let stats = compiler.stats();
    info!(
        "{} commands from {} lines ({} rejected)",
        stats.commands, stats.lines_read, stats.lines_rejected
    );
    print_domains(&compiler);
    Ok(ExitCode::SUCCESS)
}

async fn execute(config: &Config, args: &SourceArgs, run_id: RunId) -> anyhow::Result<ExitCode> {
    let mut compiler = compiler_for(config, args)?;
    let commands = compiler
        .compile_file(&args.creds_file)?
        .collect::<mailshift::Result<Vec<CompiledCommand>>>()?;
    print_domains(&compiler);
    if commands.is_empty() {
        bail!("no migrations found in {}", args.creds_file.display());
    }

    let pool = ProcessPool::new(config.pool.clone());
    let (latest, watcher) = watch::channel::<Option<ProgressSnapshot>>(None);
    let sink = |snapshot: &ProgressSnapshot| {
        LogSink.publish(snapshot);
        latest.publish(snapshot);
    };

    let run = pool.run(&run_id, &commands, &sink);
    tokio::pin!(run);

    tokio::select! {
        result = &mut run => {
            let stats = result.with_context(|| format!("run {} failed", run_id))?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
            Ok(if stats.failed_indices().is_empty() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, terminating running commands of run {}", run_id);
            let snapshot = watcher.borrow().clone();
            if let Some(snapshot) = snapshot {
                for (index, result) in SignalHandler::new().signal_run(&snapshot, Signal::Terminate) {
                    if let Err(e) = result {
                        warn!("Command {}: {}", index, e);
                    }
                }
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            }
            Ok(ExitCode::from(130))
        }
    }
}

fn report(dir: PathBuf) -> anyhow::Result<ExitCode> {
    let summaries = summarize_dir(&dir).with_context(|| format!("cannot read {}", dir.display()))?;
    for summary in &summaries {
        info!("{}: {}", summary.log_file, summary.status_message());
    }
    println!("{}", serde_json::to_string_pretty(&summaries)?);
    Ok(ExitCode::SUCCESS)
}
