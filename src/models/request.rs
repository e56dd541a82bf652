//! Migration Request Model
//!
//! Credential pairs extracted from one input line. These only live for the
//! duration of a compilation pass and are never persisted.

use std::fmt;
use zeroize::Zeroizing;

/// A mailbox password
///
/// The backing buffer is wiped on drop and the value never shows up in
/// `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Password(Zeroizing<String>);

impl Password {
    /// Wrap a plain password
    pub fn new(value: impl Into<String>) -> Self {
        Self(Zeroizing::new(value.into()))
    }

    /// Access the clear-text password
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }

    /// Number of characters in the password
    pub fn len(&self) -> usize {
        self.0.chars().count()
    }

    /// Whether the password is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(***)")
    }
}

/// One `account / password` pair as written by the operator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    /// Mailbox account, with or without `@domain`
    pub account: String,
    /// Mailbox password
    pub password: Password,
}

impl Credential {
    /// Create a new credential pair
    pub fn new(account: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            password: Password::new(password),
        }
    }

    /// Domain part of the account, if any
    pub fn domain(&self) -> Option<&str> {
        domain_of(&self.account)
    }
}

/// A parsed migration request: copy `source` mailbox into `dest` mailbox
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationRequest {
    /// Account on the source host
    pub source: Credential,
    /// Account on the destination host
    pub dest: Credential,
}

impl MigrationRequest {
    /// Build a request from two pairs
    pub fn new(source: Credential, dest: Credential) -> Self {
        Self { source, dest }
    }

    /// Build a request that migrates one account onto itself
    pub fn same_account(credential: Credential) -> Self {
        Self {
            dest: credential.clone(),
            source: credential,
        }
    }

    /// Whether source and destination are the same pair
    pub fn is_collapsed(&self) -> bool {
        self.source == self.dest
    }

    /// Domains of both accounts (deduplicated, source first)
    pub fn domains(&self) -> Vec<&str> {
        let mut domains = Vec::with_capacity(2);
        for domain in [self.source.domain(), self.dest.domain()].into_iter().flatten() {
            if !domains.contains(&domain) {
                domains.push(domain);
            }
        }
        domains
    }
}

/// Extract the domain of an account: the text after `@` up to the next
/// whitespace character.
pub fn domain_of(account: &str) -> Option<&str> {
    let (_, rest) = account.split_once('@')?;
    let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
    let domain = &rest[..end];
    if domain.is_empty() {
        None
    } else {
        Some(domain)
    }
}
