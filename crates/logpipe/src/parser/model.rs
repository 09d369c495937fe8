use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;

use super::cast::FieldType;

/// Capture name -> raw captured text. Groups that did not participate in
/// the match (or matched nothing) are simply not present.
pub type RawFields = BTreeMap<String, String>;

/// Typed, possibly nested, record body.
pub type Fields = serde_json::Map<String, Value>;

/// Per-record parse outcomes. These are diagnostics, never control flow
/// errors: the record always continues down the pipeline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("no pattern matched")]
    NoMatch,

    #[error("field `{field}`: cannot cast {raw:?} to {to}")]
    Cast {
        field: String,
        raw: String,
        to: FieldType,
    },

    #[error("time field `{0}` absent from match, using ingestion time")]
    MissingTime(String),

    #[error("time field `{field}`: {raw:?} does not fit {format:?} ({reason})")]
    Time {
        field: String,
        raw: String,
        format: String,
        reason: String,
    },
}

/// Output of a successful [`ParserSpec::parse`](super::ParserSpec::parse).
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRecord {
    pub fields: Fields,
    /// Parsed from the time field, or the observation time when that failed.
    pub timestamp: DateTime<Utc>,
    pub time_parsed: bool,
    /// Non-fatal problems hit while casting this record.
    pub issues: Vec<ParseError>,
}

impl ParsedRecord {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}
