use super::common::{instrumentation, severity_ops};
use crate::error::BuildError;
use crate::pipeline::definition::{LogTypeDefinition, ParserDef};
use crate::pipeline::registry::{LogTypeEntry, Registry};
use crate::service::multiline::{RuleDef, START_STATE};

pub const KAFKA: LogTypeEntry = LogTypeEntry {
    name: "kafka",
    default_include_paths: &["/var/log/kafka/*.log"],
    definition,
};

const START: &str = r"^\[\d{4}-\d{2}-\d{2}\s+\d{2}:\d{2}:\d{2},\d+\]";

pub fn register(registry: &mut Registry) -> Result<(), BuildError> {
    registry.register(KAFKA)
}

// [2022-01-26 18:25:21,107] INFO KafkaConfig values: (kafka.server.KafkaConfig)
// [2022-01-26 18:25:21,107] INFO [ReplicaFetcher replicaId=1, leaderId=0] Truncating (kafka.server.ReplicaFetcherThread)
fn definition() -> LogTypeDefinition {
    let parser = ParserDef::new(
        r"^\[(?<time>\d{4}-\d{2}-\d{2}\s+\d{2}:\d{2}:\d{2},\d+)\]\s+(?<level>[A-Z]+)(?:\s+\[(?<source>[^\]\n]*)\]:?)?\s+(?<message>[\s\S]*?)(?:\s+\((?<logger>[\w\s\.\$]+)\))?\s*$",
    )
    .time("time", "%Y-%m-%d %H:%M:%S,%L");

    let mut field_ops = severity_ops(
        "level",
        &[
            ("TRACE", "DEBUG"),
            ("DEBUG", "DEBUG"),
            ("INFO", "INFO"),
            ("ERROR", "ERROR"),
            ("WARN", "WARNING"),
            ("FATAL", "CRITICAL"),
        ],
    );
    field_ops.push(instrumentation(KAFKA.name));

    LogTypeDefinition {
        parsers: vec![parser],
        multiline: vec![
            RuleDef::new(START_STATE, "cont", START),
            RuleDef::new("cont", "cont", START).negated(),
        ],
        field_ops,
    }
}
