//! Credential Line Parsing
//!
//! Turns one loosely formatted line into a [`MigrationRequest`].
//!
//! Two grammars are tried in order:
//!
//! 1. **Structured**: `account@domain SEP password [SEP account@domain SEP password]`
//!    where `SEP` is any run of spaces, commas, pipes or tabs. Passwords may
//!    contain separators and `@`; the second pair is anchored on the
//!    rightmost `account@domain` token that is followed by a password.
//! 2. **Fallback**: whitespace is collapsed and the line is split on a
//!    configurable separator; tokens 0/1 are the first pair and tokens 2/3,
//!    when present, the second.
//!
//! Both grammars run in linear time over the line.

use serde::{Deserialize, Serialize};

use crate::models::{domain_of, Credential, MigrationRequest};

/// Tuning knobs for the parser
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParserConfig {
    /// Separator used by the fallback grammar
    #[serde(default = "default_fallback_separator")]
    pub fallback_separator: String,

    /// Usernames must be strictly longer than this many characters
    #[serde(default)]
    pub min_username_len: usize,

    /// Domain appended to accounts that do not carry one.
    /// When unset, such accounts are discarded.
    #[serde(default)]
    pub default_domain: Option<String>,
}

fn default_fallback_separator() -> String {
    " ".to_string()
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            fallback_separator: default_fallback_separator(),
            min_username_len: 0,
            default_domain: None,
        }
    }
}

/// Grammar that produced a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grammar {
    Structured,
    Fallback,
}

/// Line parser
#[derive(Debug, Clone, Default)]
pub struct LineParser {
    config: ParserConfig,
}

impl LineParser {
    /// Create a parser with the given configuration
    pub fn new(config: ParserConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Parse a line, reporting the domain of every accepted account to
    /// `on_domain`.
    pub fn parse(&self, line: &str, on_domain: &mut dyn FnMut(&str)) -> Option<MigrationRequest> {
        let (request, _) = self.parse_with_grammar(line)?;
        for domain in request.domains() {
            on_domain(domain);
        }
        Some(request)
    }

    /// Parse a line and report which grammar matched
    pub fn parse_with_grammar(&self, line: &str) -> Option<(MigrationRequest, Grammar)> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        match parse_structured(line) {
            Some(raw) => match self.validate(raw) {
                Some(request) => return Some((request, Grammar::Structured)),
                None => warn!("Line {}... rejected by username policy", preview(line)),
            },
            None => debug!("Line {}... did not match the structured grammar", preview(line)),
        }

        let raw = self.parse_fallback(line)?;
        let request = self.validate(raw)?;
        info!("Line {}... matched through fallback", preview(line));
        Some((request, Grammar::Fallback))
    }

    fn parse_fallback(&self, line: &str) -> Option<RawRequest> {
        let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
        let separator = self.config.fallback_separator.as_str();
        let tokens: Vec<&str> = if separator.trim().is_empty() {
            collapsed.split(' ').collect()
        } else {
            collapsed.split(separator).map(str::trim).collect()
        };

        if tokens.len() < 2 {
            debug!("Line {}... has too few fallback tokens", preview(line));
            return None;
        }

        let (account1, password1) = (tokens[0], tokens[1]);
        let (account2, password2) = if tokens.len() >= 4 {
            (tokens[2], tokens[3])
        } else {
            (account1, password1)
        };

        if [account1, password1, account2, password2]
            .iter()
            .any(|token| token.is_empty())
        {
            return None;
        }

        Some(RawRequest {
            account1: account1.to_string(),
            password1: password1.to_string(),
            account2: account2.to_string(),
            password2: password2.to_string(),
        })
    }

    /// Qualify both accounts and enforce the username length policy
    fn validate(&self, raw: RawRequest) -> Option<MigrationRequest> {
        let account1 = self.qualify(&raw.account1)?;
        let account2 = self.qualify(&raw.account2)?;

        let min = self.config.min_username_len;
        if account1.chars().count() <= min || account2.chars().count() <= min {
            return None;
        }

        let source = Credential::new(account1, raw.password1);
        let dest = Credential::new(account2, raw.password2);
        if source == dest {
            Some(MigrationRequest::same_account(source))
        } else {
            Some(MigrationRequest::new(source, dest))
        }
    }

    /// Ensure an account carries a domain, applying the default domain.
    ///
    /// Accounts end up unquoted on the command line and in the log file
    /// name, so anything outside the mailbox character set is rejected.
    fn qualify(&self, account: &str) -> Option<String> {
        if account.is_empty() || account.contains(char::is_whitespace) {
            return None;
        }
        let qualified = if domain_of(account).is_some() {
            account.to_string()
        } else {
            let local = account.trim_end_matches('@');
            if local.is_empty() || local.contains('@') {
                return None;
            }
            match &self.config.default_domain {
                Some(domain) if !domain.trim().is_empty() => {
                    format!("{}@{}", local, domain.trim_start_matches('@'))
                }
                _ => {
                    debug!(
                        "Account {} has no domain and no default domain is set",
                        preview(local)
                    );
                    return None;
                }
            }
        };

        if is_mailbox(&qualified) {
            Some(qualified)
        } else {
            debug!(
                "Account {}... contains characters outside a mailbox name",
                preview(&qualified)
            );
            None
        }
    }
}

/// Fields extracted before validation
struct RawRequest {
    account1: String,
    password1: String,
    account2: String,
    password2: String,
}

fn parse_structured(line: &str) -> Option<RawRequest> {
    let (account1, rest) = take_account(line)?;
    let tail = skip_separators(rest)?;
    if tail.is_empty() {
        return None;
    }

    let raw = match split_second_pair(tail) {
        Some((password1, account2, password2)) => RawRequest {
            account1: account1.to_string(),
            password1: password1.to_string(),
            account2: account2.to_string(),
            password2: password2.to_string(),
        },
        None => RawRequest {
            account1: account1.to_string(),
            password1: tail.to_string(),
            account2: account1.to_string(),
            password2: tail.to_string(),
        },
    };
    Some(raw)
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '.' | '-')
}

/// `local@domain` with exactly one `@`; the local part may also use `+`
fn is_mailbox(account: &str) -> bool {
    let Some((local, domain)) = account.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && local.chars().all(|c| is_name_char(c) || c == '+')
        && domain.chars().all(is_name_char)
}

fn is_separator(c: char) -> bool {
    matches!(c, ' ' | ',' | '|' | '\t')
}

fn is_separator_byte(b: u8) -> bool {
    matches!(b, b' ' | b',' | b'|' | b'\t')
}

/// Take `local@domain` from the start of `input`
fn take_account(input: &str) -> Option<(&str, &str)> {
    let local_end = input.find(|c| !is_name_char(c)).unwrap_or(input.len());
    if local_end == 0 {
        return None;
    }
    let after_at = input[local_end..].strip_prefix('@')?;
    let domain_len = after_at
        .find(|c| !is_name_char(c))
        .unwrap_or(after_at.len());
    if domain_len == 0 {
        return None;
    }
    let end = local_end + 1 + domain_len;
    Some((&input[..end], &input[end..]))
}

/// Consume a non-empty separator run
fn skip_separators(input: &str) -> Option<&str> {
    let rest = input.trim_start_matches(is_separator);
    if rest.len() == input.len() {
        None
    } else {
        Some(rest)
    }
}

/// Find `password1 SEP account2@domain2 SEP password2` in `tail`, preferring
/// the rightmost account token.
fn split_second_pair(tail: &str) -> Option<(&str, &str, &str)> {
    let bytes = tail.as_bytes();
    let mut start = bytes.len();
    while start > 1 {
        start -= 1;
        // Separators are ASCII, so `start` is a char boundary here.
        if !is_separator_byte(bytes[start - 1]) || is_separator_byte(bytes[start]) {
            continue;
        }
        let Some((account2, after)) = take_account(&tail[start..]) else {
            continue;
        };
        let Some(password2) = skip_separators(after) else {
            continue;
        };
        let password1 = tail[..start].trim_end_matches(is_separator);
        if password1.is_empty() || password2.is_empty() {
            continue;
        }
        return Some((password1, account2, password2));
    }
    None
}

/// Leading characters of a line that are safe to log
fn preview(line: &str) -> &str {
    let end = line
        .char_indices()
        .find(|(i, c)| *i >= 5 || c.is_whitespace() || is_separator(*c))
        .map(|(i, _)| i)
        .unwrap_or(line.len());
    &line[..end]
}
