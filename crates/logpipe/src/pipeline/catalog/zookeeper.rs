use super::common::{instrumentation, severity_ops};
use crate::error::BuildError;
use crate::parser::FieldType;
use crate::pipeline::definition::{LogTypeDefinition, ParserDef};
use crate::pipeline::registry::{LogTypeEntry, Registry};
use crate::service::multiline::{RuleDef, START_STATE};

pub const GENERAL: LogTypeEntry = LogTypeEntry {
    name: "zookeeper_general",
    default_include_paths: &[
        "/opt/zookeeper/logs/zookeeper-*.out",
        "/var/log/zookeeper/zookeeper.log",
    ],
    definition: general,
};

const START: &str = r"^\d{4}-\d{2}-\d{2}\s\d{2}:\d{2}:\d{2},\d{3}";
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S,%L";

pub fn register(registry: &mut Registry) -> Result<(), BuildError> {
    registry.register(GENERAL)
}

// 3.5+: 2021-12-21 18:18:39,016 [myid:] - INFO  [main:QuorumPeerConfig@174] - Reading configuration from: /conf/zoo.cfg
// 3.4:  2021-12-21 18:18:39,016 - INFO  [main:QuorumPeerConfig@101] - Reading configuration from: /conf/zoo.cfg
fn general() -> LogTypeDefinition {
    let with_myid = ParserDef::new(
        r"^(?<time>\d{4}-\d{2}-\d{2}\s\d{2}:\d{2}:\d{2},\d{3})\s\[myid:(?<myid>\d+)?\]\s-\s(?<level>\w+)\s+\[(?<thread>[^\n]+):(?<source>[^\n]+)@(?<line>\d+)\]\s+-\s*(?<message>[\S\s]*)",
    )
    .time("time", TIME_FORMAT)
    .typed("myid", FieldType::Integer)
    .typed("line", FieldType::Integer);

    let without_myid = ParserDef::new(
        r"^(?<time>\d{4}-\d{2}-\d{2}\s\d{2}:\d{2}:\d{2},\d{3})\s-\s(?<level>\w+)\s+\[(?<thread>[^\n]+):(?<source>[^\n]+)@(?<line>\d+)\]\s+-\s*(?<message>[\S\s]*)",
    )
    .time("time", TIME_FORMAT)
    .typed("line", FieldType::Integer);

    let mut field_ops = severity_ops(
        "level",
        &[
            ("TRACE", "DEBUG"),
            ("DEBUG", "DEBUG"),
            ("INFO", "INFO"),
            ("WARN", "WARNING"),
            ("ERROR", "ERROR"),
            ("CRITICAL", "ERROR"),
            ("FATAL", "FATAL"),
        ],
    );
    field_ops.push(instrumentation(GENERAL.name));

    LogTypeDefinition {
        parsers: vec![with_myid, without_myid],
        multiline: vec![
            RuleDef::new(START_STATE, "cont", START),
            RuleDef::new("cont", "cont", START).negated(),
        ],
        field_ops,
    }
}
