use super::common::{instrumentation, severity_ops};
use crate::error::BuildError;
use crate::parser::FieldType;
use crate::pipeline::definition::{LogTypeDefinition, ParserDef};
use crate::pipeline::registry::{LogTypeEntry, Registry};
use crate::remap::FieldOp;

pub const REDIS: LogTypeEntry = LogTypeEntry {
    name: "redis",
    default_include_paths: &[
        "/var/log/redis/redis-server.log",
        "/var/log/redis_6379.log",
        "/var/log/redis/redis.log",
        "/var/log/redis/default.log",
        "/var/log/redis/redis_6379.log",
    ],
    definition,
};

pub fn register(registry: &mut Registry) -> Result<(), BuildError> {
    registry.register(REDIS)
}

// 1:M 26 Aug 2021 16:50:17.007 * Ready to accept connections
fn definition() -> LogTypeDefinition {
    let parser = ParserDef::new(
        r"^\[?(?<pid>\d+):?(?<roleChar>[A-Z])?\]?\s+(?<time>\d{2}\s+\w+(?:\s+\d{4})?\s+\d{2}:\d{2}:\d{2}.\d{3})\s+(?<level>(\*|#|-|\.))\s+(?<message>.*)$",
    )
    .time("time", "%d %b %Y %H:%M:%S.%L")
    .typed("pid", FieldType::Integer);

    let mut field_ops = severity_ops(
        "level",
        &[(".", "DEBUG"), ("-", "INFO"), ("*", "NOTICE"), ("#", "WARNING")],
    );
    field_ops.push(FieldOp::copy_value("role", "roleChar"));
    field_ops.push(FieldOp::map_values(
        "role",
        &[
            ("X", "sentinel"),
            ("C", "RDB/AOF_writing_child"),
            ("S", "slave"),
            ("M", "master"),
        ],
        true,
    ));
    field_ops.push(instrumentation(REDIS.name));

    LogTypeDefinition {
        parsers: vec![parser],
        field_ops,
        ..Default::default()
    }
}
