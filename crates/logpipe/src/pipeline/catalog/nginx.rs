use super::common::{access_log_ops, access_log_parser, instrumentation, severity_ops};
use crate::error::BuildError;
use crate::parser::FieldType;
use crate::pipeline::definition::{LogTypeDefinition, ParserDef};
use crate::pipeline::registry::{LogTypeEntry, Registry};

pub const ACCESS: LogTypeEntry = LogTypeEntry {
    name: "nginx_access",
    default_include_paths: &["/var/log/nginx/access.log"],
    definition: access,
};

pub const ERROR: LogTypeEntry = LogTypeEntry {
    name: "nginx_error",
    default_include_paths: &["/var/log/nginx/error.log"],
    definition: error,
};

pub fn register(registry: &mut Registry) -> Result<(), BuildError> {
    registry.register(ACCESS)?;
    registry.register(ERROR)
}

/// Access log, optionally followed by a quoted gzip ratio.
fn access() -> LogTypeDefinition {
    LogTypeDefinition {
        parsers: vec![access_log_parser(r#"(?: "(?<gzip_ratio>[^"]*)")?"#)],
        field_ops: access_log_ops(ACCESS.name),
        ..Default::default()
    }
}

// 2021/08/26 16:50:17 [error] 29060#29060: *2191 open() "/var/www/html/forbidden.html" failed (2: No such file or directory), client: ::1, server: _, request: "GET /forbidden.html HTTP/1.1", host: "localhost:8080"
fn error() -> LogTypeDefinition {
    let parser = ParserDef::new(
        r#"^(?<time>[0-9]+[./-][0-9]+[./-][0-9]+[- ][0-9]+:[0-9]+:[0-9]+) \[(?<level>[^\]]*)\] (?<pid>[0-9]+)#(?<tid>[0-9]+):(?: \*(?<connection>[0-9]+))? (?<message>.*?)(?:, client: (?<client>[^,]+))?(?:, server: (?<server>[^,]+))?(?:, request: "(?<request>[^"]*)")?(?:, subrequest: "(?<subrequest>[^"]*)")?(?:, upstream: "(?<upstream>[^"]*)")?(?:, host: "(?<host>[^"]*)")?(?:, referrer: "(?<referer>[^"]*)")?$"#,
    )
    .time("time", "%Y/%m/%d %H:%M:%S")
    .typed("pid", FieldType::Integer)
    .typed("tid", FieldType::Integer)
    .typed("connection", FieldType::Integer);

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
        ],
    );
    field_ops.push(instrumentation(ERROR.name));

    LogTypeDefinition {
        parsers: vec![parser],
        field_ops,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::super::common::fixtures::run;
    use crate::pipeline::severity::Severity;
    use serde_json::json;

    #[test]
    fn test_error_log_line() {
        let out = run(
            "nginx_error",
            &[r#"2021/08/26 16:50:17 [error] 29060#29060: *2191 open() "/var/www/html/forbidden.html" failed (2: No such file or directory), client: ::1, server: _, request: "GET /forbidden.html HTTP/1.1", host: "localhost:8080""#],
        );
        let r = &out[0];
        assert!(r.parsed);
        assert_eq!(r.severity, Severity::Error);
        assert_eq!(r.get("pid"), Some(&json!(29060)));
        assert_eq!(r.get("connection"), Some(&json!(2191)));
        assert_eq!(r.get("client"), Some(&json!("::1")));
        assert_eq!(r.get("request"), Some(&json!("GET /forbidden.html HTTP/1.1")));
        assert_eq!(r.get("host"), Some(&json!("localhost:8080")));
        assert_eq!(
            r.message(),
            Some(r#"open() "/var/www/html/forbidden.html" failed (2: No such file or directory)"#)
        );
        assert_eq!(r.timestamp.to_rfc3339(), "2021-08-26T16:50:17+00:00");
    }

    #[test]
    fn test_access_log_gzip_ratio() {
        let out = run(
            "nginx_access",
            &[r#"127.0.0.1 - - [26/Aug/2021:16:49:43 +0000] "GET / HTTP/1.1" 200 612 "-" "curl/7.68.0" "2.75""#],
        );
        let r = &out[0];
        assert_eq!(r.get("gzip_ratio"), Some(&json!("2.75")));
        assert_eq!(r.get("instrumentation_source"), Some(&json!("nginx_access")));
        assert_eq!(r.get("http_request").unwrap()["status"], json!(200));
    }
}
