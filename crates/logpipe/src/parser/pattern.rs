use regex::{Regex, RegexBuilder};
use thiserror::Error;

use super::model::RawFields;

/// Compiled size ceiling for a single expression (patterns are config data).
const PATTERN_SIZE_LIMIT: usize = 10 * (1 << 20);

#[derive(Debug, Error)]
pub enum PatternError {
    #[error("invalid pattern {pattern:?}: {source}")]
    Invalid {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// A named-capture expression matched against one logical record.
///
/// `.` matches newlines, so a `message` group written as `.*` still spans
/// the continuation lines of a joined record. Anchoring is up to the
/// author; every built-in pattern starts with `^`.
#[derive(Debug, Clone)]
pub struct Pattern {
    regex: Regex,
    names: Vec<String>,
}

impl Pattern {
    /// Compile `expr`. Both `(?<name>...)` and `(?P<name>...)` are accepted;
    /// a name used twice is rejected by the compiler.
    pub fn new(expr: &str) -> Result<Self, PatternError> {
        let regex = RegexBuilder::new(expr)
            .dot_matches_new_line(true)
            .size_limit(PATTERN_SIZE_LIMIT)
            .build()
            .map_err(|source| PatternError::Invalid {
                pattern: expr.to_string(),
                source,
            })?;

        let names = regex
            .capture_names()
            .flatten()
            .map(str::to_string)
            .collect();

        Ok(Self { regex, names })
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Capture names in declaration order.
    pub fn capture_names(&self) -> &[String] {
        &self.names
    }

    pub fn has_capture(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// Match `text`, returning raw captures, or `None` when it does not match.
    pub fn captures(&self, text: &str) -> Option<RawFields> {
        let caps = self.regex.captures(text)?;

        let mut fields = RawFields::new();
        for name in &self.names {
            if let Some(m) = caps.name(name) {
                if !m.as_str().is_empty() {
                    fields.insert(name.clone(), m.as_str().to_string());
                }
            }
        }
        Some(fields)
    }
}
