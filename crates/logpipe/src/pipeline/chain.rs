use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::definition::{LogTypeDefinition, PipelineOverrides};
use super::record::NormalizedRecord;
use super::severity::{Severity, SEVERITY_FIELD};
use super::traits::RecordNormalizer;
use crate::error::BuildError;
use crate::parser::cast::scalar_text;
use crate::parser::{ParserSpec, PipelineMetrics};
use crate::remap::{FieldOp, Remapper};
use crate::service::multiline::{LogicalRecord, MultilineGrouper, RuleSet};

/// The processing chain for one named log type:
/// continuation rules -> parser variants -> remap -> severity.
///
/// Immutable once built; stream workers share it behind an `Arc`.
#[derive(Debug)]
pub struct Pipeline {
    name: String,
    parsers: Vec<ParserSpec>,
    rules: Option<Arc<RuleSet>>,
    remapper: Remapper,
    metrics: Arc<PipelineMetrics>,
}

impl Pipeline {
    /// Assemble a pipeline from an application definition.
    ///
    /// `overrides` adjust the parser list (see [`PipelineOverrides`]);
    /// `extra_ops` run after the definition's own field ops.
    pub fn build(
        name: &str,
        definition: LogTypeDefinition,
        overrides: &PipelineOverrides,
        extra_ops: &[FieldOp],
        metrics: Arc<PipelineMetrics>,
    ) -> Result<Self, BuildError> {
        let parsers = overrides
            .apply(definition.parsers)
            .iter()
            .map(|def| def.compile(name))
            .collect::<Result<Vec<_>, _>>()?;
        if parsers.is_empty() {
            return Err(BuildError::NoParsers(name.to_string()));
        }

        let multiline = overrides.rules(definition.multiline);
        let rules = if multiline.is_empty() {
            None
        } else {
            Some(Arc::new(RuleSet::from_defs(name, &multiline)?))
        };

        let mut ops = definition.field_ops;
        ops.extend_from_slice(extra_ops);
        let remapper = Remapper::new(&ops)?;

        debug!(
            log_type = name,
            parsers = parsers.len(),
            multiline = rules.is_some(),
            field_ops = remapper.len(),
            "pipeline built"
        );

        Ok(Self {
            name: name.to_string(),
            parsers,
            rules,
            remapper,
            metrics,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parsers(&self) -> &[ParserSpec] {
        &self.parsers
    }

    pub fn is_multiline(&self) -> bool {
        self.rules.is_some()
    }

    pub fn metrics(&self) -> &Arc<PipelineMetrics> {
        &self.metrics
    }

    /// A fresh continuation state machine for one stream of this type.
    pub fn new_grouper(&self, timeout: Duration) -> MultilineGrouper {
        match &self.rules {
            Some(rules) => {
                MultilineGrouper::new(rules.clone(), timeout).with_metrics(self.metrics.clone())
            }
            None => MultilineGrouper::passthrough(),
        }
    }

    /// Turn one logical record into its normalized form.
    ///
    /// The first parser that matches wins. A record no parser matches is
    /// emitted as a fallback record carrying the raw text and skips remap.
    pub fn normalize(&self, stream: &str, record: LogicalRecord) -> NormalizedRecord {
        let text = record.text();

        let parsed = self
            .parsers
            .iter()
            .find_map(|parser| parser.parse(&text, record.observed_at()).ok());

        let Some(parsed) = parsed else {
            self.metrics.record_fallback();
            debug!(
                log_type = %self.name,
                stream,
                lines = record.line_count(),
                "no parser matched, emitting raw record"
            );
            return NormalizedRecord::fallback(stream, &record);
        };

        self.metrics.record_match();
        for issue in &parsed.issues {
            self.metrics.record_issue(issue);
            debug!(log_type = %self.name, stream, %issue, "degraded record");
        }

        let mut fields = parsed.fields;
        self.remapper.apply(&mut fields);

        let severity = match fields.remove(SEVERITY_FIELD) {
            Some(value) => match scalar_text(&value).and_then(|s| s.parse::<Severity>().ok()) {
                Some(severity) => severity,
                None => {
                    self.metrics.record_unknown_severity();
                    debug!(log_type = %self.name, stream, %value, "non-canonical severity");
                    Severity::Default
                }
            },
            None => Severity::Default,
        };

        NormalizedRecord {
            stream: stream.to_string(),
            timestamp: parsed.timestamp,
            severity,
            fields,
            line_count: record.line_count(),
            parsed: true,
        }
    }
}

impl RecordNormalizer for Pipeline {
    fn name(&self) -> &str {
        &self.name
    }

    fn normalize(&self, stream: &str, record: LogicalRecord) -> NormalizedRecord {
        Pipeline::normalize(self, stream, record)
    }

    fn new_grouper(&self, timeout: Duration) -> MultilineGrouper {
        Pipeline::new_grouper(self, timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::FieldType;
    use crate::pipeline::definition::ParserDef;
    use crate::service::multiline::{RuleDef, START_STATE};
    use chrono::{DateTime, Utc};
    use serde_json::{json, Value};

    fn observed() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2030-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn build(def: LogTypeDefinition) -> Pipeline {
        Pipeline::build(
            "test",
            def,
            &PipelineOverrides::default(),
            &[],
            Arc::new(PipelineMetrics::new()),
        )
        .unwrap()
    }

    fn run(pipeline: &Pipeline, lines: &[&str]) -> Vec<NormalizedRecord> {
        let mut grouper = pipeline.new_grouper(Duration::from_secs(60));
        let mut records = Vec::new();
        for line in lines {
            records.extend(grouper.process(line.to_string(), observed()));
        }
        records.extend(grouper.flush());
        records
            .into_iter()
            .map(|r| pipeline.normalize("stream", r))
            .collect()
    }

    #[test]
    fn test_multiline_join_feeds_message() {
        let start = r"^\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2},\d+";
        let pipeline = build(LogTypeDefinition {
            parsers: vec![ParserDef::new(
                r"^(?<time>\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2},\d+) (?<level>[A-Z]+) (?<message>.*)$",
            )
            .time("time", "%Y-%m-%d %H:%M:%S,%L")],
            multiline: vec![
                RuleDef::new(START_STATE, "cont", start),
                RuleDef::new("cont", "cont", start).negated(),
            ],
            field_ops: vec![
                FieldOp::copy_value("severity", "level"),
                FieldOp::map_values("severity", &[("INFO", "INFO")], true),
            ],
        });

        let out = run(
            &pipeline,
            &[
                "2022-01-26 18:25:21,107 INFO KafkaConfig values:",
                "\tadvertised.listeners = null",
                "\tauto.create.topics.enable = true",
                "\tbroker.id = 0",
            ],
        );

        assert_eq!(out.len(), 1);
        let record = &out[0];
        assert!(record.parsed);
        assert_eq!(record.line_count, 4);
        assert_eq!(record.severity, Severity::Info);
        assert_eq!(
            record.message(),
            Some(
                "KafkaConfig values:\n\tadvertised.listeners = null\n\tauto.create.topics.enable = true\n\tbroker.id = 0"
            )
        );
        assert_eq!(record.timestamp.to_rfc3339(), "2022-01-26T18:25:21.107+00:00");
    }

    #[test]
    fn test_parser_variants_first_match_wins() {
        let pipeline = build(LogTypeDefinition {
            parsers: vec![
                ParserDef::new(r"^\[myid:(?<myid>\d+)\] (?<message>.*)$")
                    .typed("myid", FieldType::Integer),
                ParserDef::new(r"^(?<message>.*)$"),
            ],
            ..Default::default()
        });

        let out = run(&pipeline, &["[myid:3] hello", "plain"]);
        assert_eq!(out[0].get("myid"), Some(&json!(3)));
        assert_eq!(out[0].message(), Some("hello"));
        assert!(out[1].get("myid").is_none());
        assert_eq!(out[1].message(), Some("plain"));
    }

    #[test]
    fn test_fallback_keeps_raw_line() {
        let metrics = Arc::new(PipelineMetrics::new());
        let pipeline = Pipeline::build(
            "test",
            LogTypeDefinition {
                parsers: vec![ParserDef::new(r"^\d+ (?<message>.*)$")],
                field_ops: vec![FieldOp::set_literal("instrumentation_source", "test")],
                ..Default::default()
            },
            &PipelineOverrides::default(),
            &[],
            metrics.clone(),
        )
        .unwrap();

        let out = run(&pipeline, &["not numbered at all"]);
        assert_eq!(out.len(), 1);
        assert!(!out[0].parsed);
        assert_eq!(out[0].severity, Severity::Default);
        assert_eq!(out[0].timestamp, observed());
        assert_eq!(out[0].fields.len(), 1);
        assert_eq!(out[0].message(), Some("not numbered at all"));
        assert_eq!(metrics.snapshot().fallback, 1);
    }

    #[test]
    fn test_unknown_severity_becomes_default() {
        let metrics = Arc::new(PipelineMetrics::new());
        let pipeline = Pipeline::build(
            "test",
            LogTypeDefinition {
                parsers: vec![ParserDef::new(r"^(?<severity>\w+) (?<message>.*)$")],
                ..Default::default()
            },
            &PipelineOverrides::default(),
            &[],
            metrics.clone(),
        )
        .unwrap();

        let out = run(&pipeline, &["verbose hi", "ERROR boom"]);
        assert_eq!(out[0].severity, Severity::Default);
        assert_eq!(out[1].severity, Severity::Error);
        assert!(!out[1].fields.contains_key("severity"));
        assert_eq!(metrics.snapshot().unknown_severity, 1);
    }

    #[test]
    fn test_extra_ops_run_after_definition_ops() {
        let pipeline = Pipeline::build(
            "test",
            LogTypeDefinition {
                parsers: vec![ParserDef::new(r"^(?<user>\S+) (?<message>.*)$")],
                field_ops: vec![FieldOp::set_literal("env", "default")],
                ..Default::default()
            },
            &PipelineOverrides::default(),
            &[
                FieldOp::remove_if_equals("user", "-"),
                FieldOp::set_literal("env", "prod"),
            ],
            Arc::new(PipelineMetrics::new()),
        )
        .unwrap();

        let out = run(&pipeline, &["- hello"]);
        assert!(out[0].get("user").is_none());
        assert_eq!(out[0].get("env"), Some(&Value::from("prod")));
    }

    #[test]
    fn test_build_errors() {
        let metrics = Arc::new(PipelineMetrics::new());
        let none = Pipeline::build(
            "regex",
            LogTypeDefinition::default(),
            &PipelineOverrides::default(),
            &[],
            metrics.clone(),
        );
        assert!(matches!(none, Err(BuildError::NoParsers(n)) if n == "regex"));

        let bad_rules = Pipeline::build(
            "x",
            LogTypeDefinition {
                parsers: vec![ParserDef::new("^(?<message>.*)$")],
                multiline: vec![RuleDef::new("cont", "cont", "x")],
                ..Default::default()
            },
            &PipelineOverrides::default(),
            &[],
            metrics,
        );
        assert!(matches!(bad_rules, Err(BuildError::InvalidRules(_))));
    }

    #[test]
    fn test_single_line_pipeline_is_passthrough() {
        let pipeline = build(LogTypeDefinition {
            parsers: vec![ParserDef::new("^(?<message>.*)$")],
            ..Default::default()
        });
        assert!(!pipeline.is_multiline());
        assert!(pipeline.new_grouper(Duration::from_secs(1)).is_passthrough());
    }
}
