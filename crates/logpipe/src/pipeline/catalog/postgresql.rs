use super::common::{instrumentation, severity_ops};
use crate::error::BuildError;
use crate::parser::FieldType;
use crate::pipeline::definition::{LogTypeDefinition, ParserDef};
use crate::pipeline::registry::{LogTypeEntry, Registry};
use crate::service::multiline::{RuleDef, START_STATE};

pub const GENERAL: LogTypeEntry = LogTypeEntry {
    name: "postgresql_general",
    default_include_paths: &[
        "/var/log/postgresql/postgresql*.log",
        "/var/lib/pgsql/data/log/postgresql*.log",
        "/var/lib/pgsql/*/data/log/postgresql*.log",
    ],
    definition: general,
};

const START: &str = r"^\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}.\d{3,} \w+";
/// `log_timezone` is printed as an abbreviation. Names outside
/// [`ZONE_ABBREVIATIONS`](crate::parser::time::ZONE_ABBREVIATIONS) leave the
/// raw `time` field in place and the record takes ingestion time.
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S.%L %Z";

pub fn register(registry: &mut Registry) -> Result<(), BuildError> {
    registry.register(GENERAL)
}

// Debian prefix '%m [%p] %q%u@%d ':
//   2022-01-12 20:38:26.518 UTC [25107] postgres@postgres ERROR:  relation "x" does not exist
// RHEL prefix '%m %d %u [%p] ':
//   2022-01-12 20:38:26.518 UTC postgres postgres [25107] ERROR:  relation "x" does not exist
fn general() -> LogTypeDefinition {
    let debian = ParserDef::new(
        r"^(?<time>\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}.\d{3,} \w+)\s*\[(?<tid>\d+)\](?:\s+(?<user>\S*)@(?<database>\S*))?\s*(?<level>\w+):\s+(?<message>[\s\S]*)",
    )
    .time("time", TIME_FORMAT)
    .typed("tid", FieldType::Integer);

    let rhel = ParserDef::new(
        r"^(?<time>\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}.\d{3,} \w+)\s*(?:\s+(?<database>\S*)\s+(?<user>\S*))?\s*\[(?<tid>\d+)\]\s*(?<level>\w+):\s+(?<message>[\s\S]*)",
    )
    .time("time", TIME_FORMAT)
    .typed("tid", FieldType::Integer);

    let mut field_ops = severity_ops(
        "level",
        &[
            ("DEBUG1", "DEBUG"),
            ("DEBUG2", "DEBUG"),
            ("DEBUG3", "DEBUG"),
            ("DEBUG4", "DEBUG"),
            ("DEBUG5", "DEBUG"),
            ("DETAIL", "DEBUG"),
            ("STATEMENT", "DEBUG"),
            ("INFO", "INFO"),
            ("LOG", "INFO"),
            ("NOTICE", "INFO"),
            ("ERROR", "ERROR"),
            ("WARNING", "WARNING"),
            ("FATAL", "CRITICAL"),
            ("PANIC", "CRITICAL"),
        ],
    );
    field_ops.push(instrumentation(GENERAL.name));

    LogTypeDefinition {
        parsers: vec![debian, rhel],
        multiline: vec![
            RuleDef::new(START_STATE, "cont", START),
            RuleDef::new("cont", "cont", START).negated(),
        ],
        field_ops,
    }
}
