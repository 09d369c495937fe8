use super::common::instrumentation;
use crate::error::BuildError;
use crate::pipeline::definition::LogTypeDefinition;
use crate::pipeline::registry::{LogTypeEntry, Registry};

/// User-defined single-line type; its parser comes from `overrides.regex`.
pub const REGEX: LogTypeEntry = LogTypeEntry {
    name: "regex",
    default_include_paths: &[],
    definition,
};

pub fn register(registry: &mut Registry) -> Result<(), BuildError> {
    registry.register(REGEX)
}

fn definition() -> LogTypeDefinition {
    LogTypeDefinition {
        field_ops: vec![instrumentation(REGEX.name)],
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::Utc;

    use crate::conf::LogTypeConfig;
    use crate::error::BuildError;
    use crate::parser::PipelineMetrics;
    use crate::pipeline::registry::Registry;
    use crate::pipeline::severity::Severity;
    use crate::service::multiline::{RuleDef, START_STATE};

    #[test]
    fn test_requires_regex_override() {
        let registry = Registry::builtin().unwrap();
        let metrics = Arc::new(PipelineMetrics::new());

        let bare = registry.resolve(&LogTypeConfig::new("app", "regex"), metrics.clone());
        assert!(matches!(bare, Err(BuildError::NoParsers(n)) if n == "app"));

        let mut config = LogTypeConfig::new("app", "regex");
        config.overrides.regex = Some(r"^(?<level>\w+): (?<message>.*)$".to_string());
        let receiver = registry.resolve(&config, metrics).unwrap();
        assert_eq!(receiver.processor().parsers().len(), 1);
    }

    #[test]
    fn test_configured_rules_join_stack_trace() {
        let registry = Registry::builtin().unwrap();
        let mut config = LogTypeConfig::new("app", "regex");
        config.overrides.regex = Some(r"^(?<severity>[A-Z]+) (?<message>.*)$".to_string());
        config.overrides.multiline = vec![
            RuleDef::new(START_STATE, "trace", r"^\S"),
            RuleDef::new("trace", "trace", r"^\s"),
        ];
        let receiver = registry
            .resolve(&config, Arc::new(PipelineMetrics::new()))
            .unwrap();
        let pipeline = receiver.processor();
        assert!(pipeline.is_multiline());

        let mut grouper = pipeline.new_grouper(Duration::from_secs(60));
        let mut records = Vec::new();
        for line in [
            "ERROR request failed",
            "    at com.example.Handler.run(Handler.java:42)",
            "    at java.lang.Thread.run(Thread.java:750)",
            "INFO recovered",
        ] {
            records.extend(grouper.process(line.to_string(), Utc::now()));
        }
        records.extend(grouper.flush());

        let out: Vec<_> = records
            .into_iter()
            .map(|r| pipeline.normalize("app", r))
            .collect();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].line_count, 3);
        assert_eq!(out[0].severity, Severity::Error);
        assert_eq!(
            out[0].message(),
            Some(
                "request failed\n    at com.example.Handler.run(Handler.java:42)\n    at java.lang.Thread.run(Thread.java:750)"
            )
        );
        assert_eq!(out[1].severity, Severity::Info);
        assert_eq!(out[1].message(), Some("recovered"));
    }
}
