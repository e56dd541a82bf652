//! Host Alias Resolution
//!
//! Short host names typed by operators (`sv01`, `cp12`) are expanded to
//! fully-qualified names by appending a per-deployment suffix. Rules are
//! tried in order and the first full match wins.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Raw alias rule as written in configuration files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasRuleConfig {
    /// Regular expression matched against the host name
    pub pattern: String,
    /// Suffix appended on match
    pub suffix: String,
    /// Require the pattern to cover the whole host name
    #[serde(default = "default_anchored")]
    pub anchored: bool,
}

fn default_anchored() -> bool {
    true
}

impl AliasRuleConfig {
    pub fn new(pattern: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            suffix: suffix.into(),
            anchored: true,
        }
    }
}

/// A validated host alias rule
#[derive(Debug, Clone)]
pub struct AliasRule {
    pattern: String,
    regex: Regex,
    suffix: String,
    anchored: bool,
}

impl AliasRule {
    /// Compile an anchored rule
    pub fn new(pattern: &str, suffix: &str) -> Result<Self> {
        Self::with_anchoring(pattern, suffix, true)
    }

    /// Compile a rule, choosing whether trailing characters are tolerated
    pub fn with_anchoring(pattern: &str, suffix: &str, anchored: bool) -> Result<Self> {
        // Wrapping keeps alternations inside the anchors.
        let source = if anchored {
            format!("^(?:{})$", pattern)
        } else {
            format!("^(?:{})", pattern)
        };
        let regex = Regex::new(&source).map_err(|e| Error::InvalidAliasRule {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            pattern: pattern.to_string(),
            regex,
            suffix: suffix.to_string(),
            anchored,
        })
    }

    /// Pattern as written by the operator
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    pub fn is_anchored(&self) -> bool {
        self.anchored
    }

    /// Whether the rule applies to a host name
    pub fn matches(&self, hostname: &str) -> bool {
        self.regex.is_match(hostname)
    }
}

impl TryFrom<&AliasRuleConfig> for AliasRule {
    type Error = Error;

    fn try_from(config: &AliasRuleConfig) -> Result<Self> {
        Self::with_anchoring(&config.pattern, &config.suffix, config.anchored)
    }
}

/// Ordered set of alias rules
#[derive(Debug, Clone, Default)]
pub struct HostResolver {
    rules: Vec<AliasRule>,
}

impl HostResolver {
    /// Resolver that returns every host unchanged
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Build from validated rules
    pub fn with_rules(rules: Vec<AliasRule>) -> Self {
        Self { rules }
    }

    /// Build from configuration, failing on the first malformed pattern
    pub fn from_config(rules: &[AliasRuleConfig]) -> Result<Self> {
        let rules = rules
            .iter()
            .map(AliasRule::try_from)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    /// Build from raw `(pattern, suffix)` pairs without failing.
    ///
    /// Malformed patterns are logged and dropped, so they never match.
    pub fn from_pairs<P, S>(pairs: impl IntoIterator<Item = (P, S)>) -> Self
    where
        P: AsRef<str>,
        S: AsRef<str>,
    {
        let rules = pairs
            .into_iter()
            .filter_map(|(pattern, suffix)| {
                match AliasRule::new(pattern.as_ref(), suffix.as_ref()) {
                    Ok(rule) => Some(rule),
                    Err(e) => {
                        warn!("Ignoring host alias rule: {}", e);
                        None
                    }
                }
            })
            .collect();
        Self { rules }
    }

    /// Resolve a host name against the rules
    pub fn resolve(&self, hostname: &str) -> String {
        for rule in &self.rules {
            if rule.matches(hostname) {
                debug!("Matched hostname {} with pattern {}", hostname, rule.pattern());
                return format!("{}{}", hostname, rule.suffix());
            }
        }
        hostname.to_string()
    }

    pub fn rules(&self) -> &[AliasRule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
