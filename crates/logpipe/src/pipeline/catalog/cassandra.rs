use super::common::{instrumentation, severity_ops};
use crate::error::BuildError;
use crate::parser::FieldType;
use crate::pipeline::definition::{LogTypeDefinition, ParserDef};
use crate::pipeline::registry::{LogTypeEntry, Registry};
use crate::service::multiline::{RuleDef, START_STATE};

pub const SYSTEM: LogTypeEntry = LogTypeEntry {
    name: "cassandra_system",
    default_include_paths: &["/var/log/cassandra/system*.log"],
    definition: system,
};

const START: &str = r"^[A-Z]+\s+\[[^\]]+\] \d+";

pub fn register(registry: &mut Registry) -> Result<(), BuildError> {
    registry.register(SYSTEM)
}

// INFO  [main] 2021-10-07 12:57:05,003 YamlConfigurationLoader.java:92 - Configuration location: file:/etc/cassandra/cassandra.yaml
fn system() -> LogTypeDefinition {
    let parser = ParserDef::new(
        r"^(?<level>[A-Z]+)\s+\[(?<module>[^\]]+)\]\s+(?<time>\d{4}-\d{2}-\d{2}\s+\d{2}:\d{2}:\d{2},\d+)\s+(?<message>(?:(?<javaClass>[\w\.]+):(?<lineNumber>\d+))?[\S\s]+)",
    )
    .time("time", "%Y-%m-%d %H:%M:%S,%L")
    .typed("lineNumber", FieldType::Integer);

    let mut field_ops = severity_ops(
        "level",
        &[
            ("TRACE", "DEBUG"),
            ("DEBUG", "DEBUG"),
            ("INFO", "INFO"),
            ("ERROR", "ERROR"),
            ("WARN", "WARNING"),
        ],
    );
    field_ops.push(instrumentation(SYSTEM.name));

    LogTypeDefinition {
        parsers: vec![parser],
        multiline: vec![
            RuleDef::new(START_STATE, "cont", START),
            RuleDef::new("cont", "cont", START).negated(),
        ],
        field_ops,
    }
}

#[cfg(test)]
mod tests {
    use super::super::common::fixtures::run;
    use crate::pipeline::severity::Severity;
    use serde_json::json;

    #[test]
    fn test_exception_joined() {
        let out = run(
            "cassandra_system",
            &[
                "ERROR [main] 2021-10-07 12:57:05,003 CassandraDaemon.java:803 - Exception encountered during startup",
                "java.lang.RuntimeException: boom",
                "\tat org.apache.cassandra.service.CassandraDaemon.setup(CassandraDaemon.java:250)",
                "INFO  [main] 2021-10-07 12:57:06,000 StorageService.java:100 - next",
            ],
        );
        assert_eq!(out.len(), 2);

        let r = &out[0];
        assert_eq!(r.severity, Severity::Error);
        assert_eq!(r.line_count, 3);
        assert_eq!(r.get("module"), Some(&json!("main")));
        assert_eq!(r.get("javaClass"), Some(&json!("CassandraDaemon.java")));
        assert_eq!(r.get("lineNumber"), Some(&json!(803)));
        assert!(r.message().unwrap().ends_with("(CassandraDaemon.java:250)"));

        assert_eq!(out[1].severity, Severity::Info);
    }
}
