//! Sync Log Inspection
//!
//! Each command writes `{src}__{dst}__{user1}--{user2}.log` into its run
//! directory. These helpers map a file name back to its migration pair and
//! extract the exit status and transfer window from the log contents.

use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use super::exit_codes;
use crate::error::Result;
use crate::models::log_file_name;

static EXIT_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Exiting with return value (-?[0-9]+)").expect("static regex")
});

static TIMESTAMP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([1-2][0-9]{3}-[0-1][0-9]-[0-3][0-9]\s[0-2][0-9]:[0-6][0-9]:[0-6][0-9])")
        .expect("static regex")
});

static SPAM_ERROR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Err [0-9]{1,3}/[0-9]{1,3}.* Folder (INBOX|Inbox|inbox)\.(spam|Spam|SPAM)")
        .expect("static regex")
});

const STARTED_MARKER: &str = "Transfer started at";
const ENDED_MARKER: &str = "Transfer ended on";
const ERROR_MARKER: &str = "Err ";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Migration pair encoded in a log file name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogFileName {
    pub source_host: String,
    pub dest_host: String,
    pub user1: String,
    pub user2: String,
}

impl LogFileName {
    /// Parse `{src}__{dst}__{user1}--{user2}.log`.
    ///
    /// Local parts may contain `--`, so the accounts are split at the first
    /// `--` after the `@` of the source account that leaves exactly one `@`
    /// on each side. A source domain containing `--` (IDNA `xn--` labels)
    /// is still ambiguous and splits at its first `--`.
    pub fn parse(name: &str) -> Option<Self> {
        let stem = name.strip_suffix(".log")?;
        let mut parts = stem.splitn(3, "__");
        let source_host = parts.next()?;
        let dest_host = parts.next()?;
        let (user1, user2) = split_accounts(parts.next()?)?;

        if [source_host, dest_host, user1, user2].iter().any(|p| p.is_empty()) {
            return None;
        }

        Some(Self {
            source_host: source_host.to_string(),
            dest_host: dest_host.to_string(),
            user1: user1.to_string(),
            user2: user2.to_string(),
        })
    }

    /// File name this pair produces
    pub fn file_name(&self) -> String {
        log_file_name(&self.source_host, &self.dest_host, &self.user1, &self.user2)
    }
}

/// State of one migration as read from its log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "code", rename_all = "snake_case")]
pub enum SyncStatus {
    /// No exit line yet
    Running,
    /// Failed only on spam folders
    SpamNotSynced(i32),
    /// Exit line found
    Exited(i32),
}

/// What a sync log says about its migration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogSummary {
    pub log_file: String,
    pub pair: Option<LogFileName>,
    pub status: SyncStatus,
    pub start_time: Option<NaiveDateTime>,
    pub end_time: Option<NaiveDateTime>,
    /// Number of `Err` lines
    pub errors: usize,
}

impl LogSummary {
    /// Summarize a log file
    pub fn from_file(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::from_reader(&name, BufReader::new(file))
    }

    /// Summarize log contents read from `reader`.
    ///
    /// Invalid UTF-8 is replaced rather than rejected; the tool echoes
    /// folder names in whatever encoding the server uses.
    pub fn from_reader<R: BufRead>(log_file: &str, mut reader: R) -> Result<Self> {
        let mut exit_code = None;
        let mut start_time = None;
        let mut end_time = None;
        let mut errors = 0;
        let mut only_spam_errors = true;

        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            let line = String::from_utf8_lossy(&buf);

            if let Some(caps) = EXIT_LINE.captures(&line) {
                exit_code = caps[1].parse::<i32>().ok();
            } else if line.contains(STARTED_MARKER) {
                start_time = start_time.or_else(|| parse_timestamp(&line));
            } else if line.contains(ENDED_MARKER) {
                end_time = parse_timestamp(&line).or(end_time);
            } else if line.contains(ERROR_MARKER) {
                errors += 1;
                if !SPAM_ERROR.is_match(&line) {
                    only_spam_errors = false;
                }
            }
        }

        let status = match exit_code {
            None => SyncStatus::Running,
            Some(code)
                if code != 0
                    && errors > 0
                    && only_spam_errors
                    && exit_codes::severity(code) != exit_codes::Severity::Ok =>
            {
                SyncStatus::SpamNotSynced(code)
            }
            Some(code) => SyncStatus::Exited(code),
        };

        Ok(Self {
            log_file: log_file.to_string(),
            pair: LogFileName::parse(log_file),
            status,
            start_time,
            end_time,
            errors,
        })
    }

    /// One-line status for listings
    pub fn status_message(&self) -> String {
        match self.status {
            SyncStatus::Running => "Running".to_string(),
            SyncStatus::SpamNotSynced(_) => "Transfer ok, spam not synced".to_string(),
            SyncStatus::Exited(code) => exit_codes::describe(code),
        }
    }
}

/// Summarize every `.log` file of a run directory, sorted by name
pub fn summarize_dir(dir: &Path) -> Result<Vec<LogSummary>> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "log") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut summaries = Vec::with_capacity(paths.len());
    for path in paths {
        match LogSummary::from_file(&path) {
            Ok(summary) => summaries.push(summary),
            Err(e) => warn!("Skipping {}: {}", path.display(), e),
        }
    }
    Ok(summaries)
}

/// Split `{user1}--{user2}` where both sides are `local@domain`
fn split_accounts(pair: &str) -> Option<(&str, &str)> {
    let first_at = pair.find('@')?;
    let mut from = first_at;
    while let Some(offset) = pair[from..].find("--") {
        let sep = from + offset;
        let (user1, user2) = (&pair[..sep], &pair[sep + 2..]);
        if user1.matches('@').count() == 1 && user2.matches('@').count() == 1 {
            return Some((user1, user2));
        }
        from = sep + 1;
    }
    None
}

fn parse_timestamp(line: &str) -> Option<NaiveDateTime> {
    let caps = TIMESTAMP.captures(line)?;
    // The tool separates date and time with a single space
    let text = caps[1].replace(char::is_whitespace, " ");
    NaiveDateTime::parse_from_str(&text, TIMESTAMP_FORMAT).ok()
}
