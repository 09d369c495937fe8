use super::common::{access_log_ops, access_log_parser, instrumentation, severity_ops};
use crate::error::BuildError;
use crate::parser::FieldType;
use crate::pipeline::definition::{LogTypeDefinition, ParserDef};
use crate::pipeline::registry::{LogTypeEntry, Registry};

pub const ACCESS: LogTypeEntry = LogTypeEntry {
    name: "apache_access",
    default_include_paths: &[
        "/var/log/apache2/access.log",
        "/var/log/apache2/access_log",
        "/var/log/httpd/access_log",
    ],
    definition: access,
};

pub const ERROR: LogTypeEntry = LogTypeEntry {
    name: "apache_error",
    default_include_paths: &[
        "/var/log/apache2/error.log",
        "/var/log/apache2/error_log",
        "/var/log/httpd/error_log",
    ],
    definition: error,
};

pub fn register(registry: &mut Registry) -> Result<(), BuildError> {
    registry.register(ACCESS)?;
    registry.register(ERROR)
}

fn access() -> LogTypeDefinition {
    LogTypeDefinition {
        parsers: vec![access_log_parser("")],
        field_ops: access_log_ops(ACCESS.name),
        ..Default::default()
    }
}

// 2.4: [Fri Sep 09 10:42:29.902022 2011] [core:error] [pid 35708:tid 4328636416] [client 72.15.99.187] File does not exist: /x
// 2.2: [Fri Sep 09 10:42:29.902022 2011] [error] [pid 35708:tid 4328636416] [client 72.15.99.187] File does not exist: /x
fn error() -> LogTypeDefinition {
    let parser = ParserDef::new(
        r"^\[(?<time>[^\]]+)\] \[(?:(?<module>\w+):)?(?<level>[\w\d]+)\](?: \[pid (?<pid>\d+)(?::tid (?<tid>[0-9]+))?\])?(?: (?<errorCode>[^\[:]*):?)?(?: \[client (?<client>[^\]]*)\])? (?<message>.*)$",
    )
    .time("time", "%a %b %d %H:%M:%S.%L %Y")
    .typed("pid", FieldType::Integer)
    .typed("tid", FieldType::Integer);

    let mut field_ops = severity_ops(
        "level",
        &[
            ("emerg", "EMERGENCY"),
            ("alert", "ALERT"),
            ("crit", "CRITICAL"),
            ("error", "ERROR"),
            ("warn", "WARNING"),
            ("notice", "NOTICE"),
            ("info", "INFO"),
            ("debug", "DEBUG"),
            ("trace1", "DEBUG"),
            ("trace2", "DEBUG"),
            ("trace3", "DEBUG"),
            ("trace4", "DEBUG"),
            ("trace5", "DEBUG"),
            ("trace6", "DEBUG"),
            ("trace7", "DEBUG"),
            ("trace8", "DEBUG"),
        ],
    );
    field_ops.push(instrumentation(ERROR.name));

    LogTypeDefinition {
        parsers: vec![parser],
        field_ops,
        ..Default::default()
    }
}
