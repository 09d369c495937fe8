use crate::parser::FieldType;
use crate::pipeline::definition::ParserDef;
use crate::pipeline::severity::SEVERITY_FIELD;
use crate::remap::FieldOp;

/// Field stamped with the log type that produced a record.
pub const INSTRUMENTATION_FIELD: &str = "instrumentation_source";

/// Common/combined access log, shared by apache and nginx.
pub(super) const ACCESS_LOG: &str = r#"^(?<http_request_remoteIp>[^ ]*) (?<host>[^ ]*) (?<user>[^ ]*) \[(?<time>[^\]]*)\] "(?<http_request_requestMethod>\S+)(?: +(?<http_request_requestUrl>[^"]*?)(?: +(?<http_request_protocol>\S+))?)?" (?<http_request_status>[^ ]*) (?<http_request_responseSize>[^ ]*)(?: "(?<http_request_referer>[^"]*)" "(?<http_request_userAgent>[^"]*)")?"#;

pub(super) const ACCESS_TIME_FORMAT: &str = "%d/%b/%Y:%H:%M:%S %z";

/// `suffix` extends the access log pattern before the closing `$`.
pub(super) fn access_log_parser(suffix: &str) -> ParserDef {
    ParserDef::new(&format!("{ACCESS_LOG}{suffix}$"))
        .time("time", ACCESS_TIME_FORMAT)
        .typed("http_request_status", FieldType::Integer)
}

/// Drop the `-` placeholders and assemble the `http_request` object.
pub(super) fn access_log_ops(log_type: &str) -> Vec<FieldOp> {
    let mut ops: Vec<FieldOp> = ["host", "user", "http_request_referer"]
        .iter()
        .map(|field| FieldOp::remove_if_equals(field, "-"))
        .collect();
    ops.push(FieldOp::nest_under("http_request_", "http_request"));
    ops.push(instrumentation(log_type));
    ops
}

/// Copy `level` into the severity field through an exclusive table.
pub(super) fn severity_ops(level: &str, table: &[(&str, &str)]) -> Vec<FieldOp> {
    vec![
        FieldOp::copy_value(SEVERITY_FIELD, level),
        FieldOp::map_values(SEVERITY_FIELD, table, true),
    ]
}

pub(super) fn instrumentation(log_type: &str) -> FieldOp {
    FieldOp::set_literal(INSTRUMENTATION_FIELD, log_type)
}
