use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use super::severity::Severity;
use crate::parser::{Fields, MESSAGE_FIELD};
use crate::service::multiline::LogicalRecord;

/// Final output of a pipeline: one per logical record, handed straight to
/// the sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedRecord {
    pub stream: String,
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    pub fields: Fields,
    pub line_count: usize,
    /// False for fallback records that matched no parser.
    pub parsed: bool,
}

impl NormalizedRecord {
    /// Raw text under `message`, ingestion time, default severity.
    pub fn fallback(stream: &str, record: &LogicalRecord) -> Self {
        let mut fields = Fields::new();
        fields.insert(MESSAGE_FIELD.to_string(), Value::String(record.text()));

        Self {
            stream: stream.to_string(),
            timestamp: record.observed_at(),
            severity: Severity::Default,
            fields,
            line_count: record.line_count(),
            parsed: false,
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn message(&self) -> Option<&str> {
        self.fields.get(MESSAGE_FIELD).and_then(Value::as_str)
    }
}
