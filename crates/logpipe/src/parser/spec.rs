use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

use super::cast::TypeTable;
use super::model::{Fields, ParseError, ParsedRecord};
use super::pattern::Pattern;
use super::time::TimeFormat;
use crate::error::BuildError;

/// Which capture carries the record time and how to read it.
#[derive(Debug, Clone)]
pub struct TimeSpec {
    pub key: String,
    pub format: TimeFormat,
}

/// A pattern plus its typed-cast and timestamp directives.
#[derive(Debug, Clone)]
pub struct ParserSpec {
    pattern: Pattern,
    types: TypeTable,
    time: Option<TimeSpec>,
}

impl ParserSpec {
    pub fn new(
        pattern: Pattern,
        types: TypeTable,
        time: Option<TimeSpec>,
    ) -> Result<Self, BuildError> {
        if let Some(time) = &time {
            if !pattern.has_capture(&time.key) {
                return Err(BuildError::TimeKeyNotCaptured(time.key.clone()));
            }
        }

        for name in types.keys() {
            if !pattern.has_capture(name) {
                debug!(field = %name, pattern = pattern.as_str(), "typed field is never captured");
            }
        }

        Ok(Self {
            pattern,
            types,
            time,
        })
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn types(&self) -> &TypeTable {
        &self.types
    }

    pub fn time(&self) -> Option<&TimeSpec> {
        self.time.as_ref()
    }

    /// Match and cast one logical record.
    ///
    /// The only `Err` is [`ParseError::NoMatch`]. Everything else that goes
    /// wrong (a field that does not cast, a time that does not parse) is
    /// collected in [`ParsedRecord::issues`] and the record carries on:
    /// uncastable fields are left out, an unparsable time keeps its raw text
    /// and the record falls back to `observed_at`.
    pub fn parse(&self, text: &str, observed_at: DateTime<Utc>) -> Result<ParsedRecord, ParseError> {
        let mut raw = self.pattern.captures(text).ok_or(ParseError::NoMatch)?;

        let mut issues = Vec::new();
        let mut timestamp = observed_at;
        let mut time_parsed = false;
        let mut fields = Fields::new();

        if let Some(time) = &self.time {
            match raw.remove(&time.key) {
                Some(value) => match time.format.parse(&value) {
                    Ok(ts) => {
                        timestamp = ts;
                        time_parsed = true;
                    }
                    Err(reason) => {
                        issues.push(ParseError::Time {
                            field: time.key.clone(),
                            raw: value.clone(),
                            format: time.format.as_str().to_string(),
                            reason,
                        });
                        fields.insert(time.key.clone(), Value::String(value));
                    }
                },
                None => issues.push(ParseError::MissingTime(time.key.clone())),
            }
        }

        for (name, value) in raw {
            match self.types.get(&name) {
                Some(ty) => match ty.cast(&value) {
                    Some(typed) => {
                        fields.insert(name, typed);
                    }
                    None => issues.push(ParseError::Cast {
                        field: name,
                        raw: value,
                        to: *ty,
                    }),
                },
                None => {
                    fields.insert(name, Value::String(value));
                }
            }
        }

        Ok(ParsedRecord {
            fields,
            timestamp,
            time_parsed,
            issues,
        })
    }
}
