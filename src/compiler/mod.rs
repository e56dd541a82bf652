//! Credential-to-Command Compiler
//!
//! Streams credential lines through the [`LineParser`] and produces one
//! [`CompiledCommand`] per accepted line. Host aliases are resolved once per
//! compiler, before any line is read, so every command in a batch targets
//! the same pair of hosts.
//!
//! Input can be an in-memory list or a file; both go through the same
//! per-line logic. Malformed lines are logged and skipped, they never abort
//! the batch.

pub mod chunk;
pub mod host;
pub mod parser;

pub use chunk::{chunked, Chunked, ScriptWriter, DEFAULT_CHUNK_SIZE};
pub use host::{AliasRule, AliasRuleConfig, HostResolver};
pub use parser::{Grammar, LineParser, ParserConfig};

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};

use crate::config::CompilerConfig;
use crate::error::{Error, Result};
use crate::models::{CommandTemplate, CompiledCommand};

/// Counters collected while compiling
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompileStats {
    /// Lines read from the input
    pub lines_read: usize,
    /// Lines too short to hold a request
    pub lines_skipped: usize,
    /// Lines neither grammar accepted
    pub lines_rejected: usize,
    /// Commands produced
    pub commands: usize,
}

/// Compiles credential lines into sync-tool commands
#[derive(Debug, Clone)]
pub struct CommandCompiler {
    parser: LineParser,
    tool: String,
    source_host: String,
    dest_host: String,
    log_dir: String,
    extra_args: String,
    domains: BTreeSet<String>,
    stats: CompileStats,
}

impl CommandCompiler {
    /// Create a compiler for one pair of hosts.
    ///
    /// Both hosts are resolved against `resolver` here and never again.
    pub fn new(
        source_host: &str,
        dest_host: &str,
        config: &CompilerConfig,
        resolver: &HostResolver,
    ) -> Self {
        let source_host = resolver.resolve(source_host.trim());
        let dest_host = resolver.resolve(dest_host.trim());
        debug!("Compiling for {} -> {}", source_host, dest_host);

        Self {
            parser: LineParser::new(config.parser.clone()),
            tool: config.tool.clone(),
            source_host,
            dest_host,
            log_dir: config.log_root.display().to_string(),
            extra_args: config.extra_args.clone(),
            domains: BTreeSet::new(),
            stats: CompileStats::default(),
        }
    }

    /// Override the extra flags appended to every command
    pub fn with_extra_args(mut self, extra_args: impl Into<String>) -> Self {
        self.extra_args = extra_args.into();
        self
    }

    /// Resolved source host
    pub fn source_host(&self) -> &str {
        &self.source_host
    }

    /// Resolved destination host
    pub fn dest_host(&self) -> &str {
        &self.dest_host
    }

    /// Domains seen so far
    pub fn domains(&self) -> &BTreeSet<String> {
        &self.domains
    }

    /// Counters for the lines processed so far
    pub fn stats(&self) -> CompileStats {
        self.stats
    }

    /// Compile a single line
    pub fn compile_line(&mut self, line: &str) -> Option<CompiledCommand> {
        self.stats.lines_read += 1;
        if line.trim().chars().count() <= 1 {
            self.stats.lines_skipped += 1;
            return None;
        }

        let domains = &mut self.domains;
        let Some(request) = self.parser.parse(line, &mut |domain| {
            domains.insert(domain.to_string());
        }) else {
            self.stats.lines_rejected += 1;
            debug!("Dropping line {} of input", self.stats.lines_read);
            return None;
        };

        let template = CommandTemplate {
            tool: &self.tool,
            source_host: &self.source_host,
            dest_host: &self.dest_host,
            log_dir: &self.log_dir,
            extra_args: &self.extra_args,
        };
        let command = CompiledCommand::build(&template, &request);
        self.stats.commands += 1;
        trace!("Compiled: {}", command.redacted());
        Some(command)
    }

    /// Lazily compile an in-memory sequence of lines
    pub fn compile<I>(&mut self, lines: I) -> Compile<'_, I::IntoIter>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        Compile {
            compiler: self,
            lines: lines.into_iter(),
        }
    }

    /// Compile an in-memory sequence of lines into a vector
    pub fn compile_all<I>(&mut self, lines: I) -> Vec<CompiledCommand>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.compile(lines).collect()
    }

    /// Lazily compile lines from a reader
    pub fn compile_reader<R: BufRead>(
        &mut self,
        reader: R,
        source: impl Into<PathBuf>,
    ) -> CompileReader<'_, R> {
        CompileReader {
            compiler: self,
            lines: reader.lines(),
            source: source.into(),
            failed: false,
        }
    }

    /// Lazily compile a credential file.
    ///
    /// The path is checked before the file is opened: an empty or missing
    /// path is reported as [`Error::InvalidInput`].
    pub fn compile_file(&mut self, path: &Path) -> Result<CompileReader<'_, BufReader<File>>> {
        check_input_path(path)?;
        let file = File::open(path).map_err(|e| Error::InputRead {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        info!("Reading credentials from {}", path.display());
        Ok(self.compile_reader(BufReader::new(file), path))
    }
}

/// Validate a credential file path without opening it
pub fn check_input_path(path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(Error::InvalidInput {
            path: path.to_path_buf(),
            reason: "file path was not supplied".to_string(),
        });
    }
    if !path.exists() {
        return Err(Error::InvalidInput {
            path: path.to_path_buf(),
            reason: "file does not exist".to_string(),
        });
    }
    if path.is_dir() {
        return Err(Error::InvalidInput {
            path: path.to_path_buf(),
            reason: "path is a directory".to_string(),
        });
    }
    Ok(())
}

/// Lazy compilation over in-memory lines
pub struct Compile<'a, I> {
    compiler: &'a mut CommandCompiler,
    lines: I,
}

impl<I> Iterator for Compile<'_, I>
where
    I: Iterator,
    I::Item: AsRef<str>,
{
    type Item = CompiledCommand;

    fn next(&mut self) -> Option<CompiledCommand> {
        for line in self.lines.by_ref() {
            if let Some(command) = self.compiler.compile_line(line.as_ref()) {
                return Some(command);
            }
        }
        None
    }
}

/// Lazy compilation over a reader; stops after the first read error
pub struct CompileReader<'a, R> {
    compiler: &'a mut CommandCompiler,
    lines: Lines<R>,
    source: PathBuf,
    failed: bool,
}

impl<R: BufRead> Iterator for CompileReader<'_, R> {
    type Item = Result<CompiledCommand>;

    fn next(&mut self) -> Option<Result<CompiledCommand>> {
        if self.failed {
            return None;
        }
        for line in self.lines.by_ref() {
            match line {
                Ok(line) => {
                    if let Some(command) = self.compiler.compile_line(&line) {
                        return Some(Ok(command));
                    }
                }
                Err(e) => {
                    error!("Failed to read {}: {}", self.source.display(), e);
                    self.failed = true;
                    return Some(Err(Error::InputRead {
                        path: self.source.clone(),
                        reason: e.to_string(),
                    }));
                }
            }
        }
        None
    }
}
