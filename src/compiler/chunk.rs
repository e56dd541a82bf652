//! Script Artifacts
//!
//! Large batches are split into fixed-size chunks and written as shell
//! scripts, one command per line, so an operator can run them by hand on
//! separate machines.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::models::CompiledCommand;

/// Commands per script when nothing else is configured
pub const DEFAULT_CHUNK_SIZE: usize = 30;

/// Iterator adapter yielding vectors of at most `size` items
#[derive(Debug, Clone)]
pub struct Chunked<I> {
    inner: I,
    size: usize,
}

/// Split any iterator into chunks of `size` items; the last chunk may be shorter.
///
/// A size of zero is treated as one.
pub fn chunked<I: IntoIterator>(iter: I, size: usize) -> Chunked<I::IntoIter> {
    Chunked {
        inner: iter.into_iter(),
        size: size.max(1),
    }
}

impl<I: Iterator> Iterator for Chunked<I> {
    type Item = Vec<I::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        let chunk: Vec<I::Item> = self.inner.by_ref().take(self.size).collect();
        if chunk.is_empty() {
            None
        } else {
            Some(chunk)
        }
    }
}

/// Writes command chunks to `{destination}_{n}.sh`
#[derive(Debug)]
pub struct ScriptWriter {
    destination: PathBuf,
    file_count: usize,
}

impl ScriptWriter {
    pub fn new(destination: impl Into<PathBuf>) -> Self {
        Self {
            destination: destination.into(),
            file_count: 0,
        }
    }

    /// Number of scripts written so far
    pub fn file_count(&self) -> usize {
        self.file_count
    }

    /// Path the next script will be written to
    pub fn next_path(&self) -> PathBuf {
        let mut name = self.destination.as_os_str().to_owned();
        name.push(format!("_{}.sh", self.file_count));
        PathBuf::from(name)
    }

    /// Write one chunk as a script and advance the counter
    pub fn write_chunk(&mut self, commands: &[CompiledCommand]) -> Result<PathBuf> {
        let path = self.next_path();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| script_error(&path, e))?;
        }

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            // Scripts carry passwords
            options.mode(0o700);
        }
        let mut file = options.open(&path).map_err(|e| script_error(&path, e))?;

        for command in commands {
            writeln!(file, "{}", command.as_str()).map_err(|e| script_error(&path, e))?;
        }
        file.flush().map_err(|e| script_error(&path, e))?;

        info!("Wrote {} commands to {}", commands.len(), path.display());
        self.file_count += 1;
        Ok(path)
    }

    /// Chunk a stream of compiled commands and write every chunk.
    ///
    /// Stops at the first error; scripts already written are kept.
    pub fn write_all<I>(&mut self, commands: I, chunk_size: usize) -> Result<Vec<PathBuf>>
    where
        I: IntoIterator<Item = Result<CompiledCommand>>,
    {
        let mut written = Vec::new();
        for chunk in chunked(commands, chunk_size) {
            let chunk = chunk.into_iter().collect::<Result<Vec<_>>>()?;
            written.push(self.write_chunk(&chunk)?);
        }
        Ok(written)
    }
}

fn script_error(path: &Path, e: std::io::Error) -> Error {
    Error::ScriptWriteFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    }
}
