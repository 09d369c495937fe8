use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::trace;

use super::path::FieldPath;
use crate::error::BuildError;
use crate::parser::cast::{scalar_text, FieldType};
use crate::parser::Fields;

/// One declarative field-level transformation.
///
/// Paths are dotted (`http_request.status`). Every op whose source field
/// is absent is a no-op.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum FieldOp {
    /// `dst = src`, keeping `src`.
    CopyValue { dst: String, src: String },
    /// `dst = src`, then remove `src`.
    MoveValue { dst: String, src: String },
    SetLiteral { dst: String, value: Value },
    /// Like `SetLiteral`, only when `dst` is absent.
    SetDefault { dst: String, value: Value },
    /// Drop `field` when its value renders as `value` (e.g. the `-` that
    /// access logs write for "no value").
    RemoveIfEquals { field: String, value: String },
    /// Replace `field` through `table`. Unmapped values are left alone, or
    /// dropped when `exclusive` is set.
    MapValues {
        field: String,
        table: BTreeMap<String, String>,
        #[serde(default)]
        exclusive: bool,
    },
    /// Move every top-level field named `<prefix>x` to `<dest>.x`.
    NestUnder { prefix: String, dest: String },
    /// Convert an existing field; a value that does not convert is kept as is.
    Convert { field: String, to: FieldType },
}

impl FieldOp {
    pub fn copy_value(dst: &str, src: &str) -> Self {
        FieldOp::CopyValue {
            dst: dst.to_string(),
            src: src.to_string(),
        }
    }

    pub fn move_value(dst: &str, src: &str) -> Self {
        FieldOp::MoveValue {
            dst: dst.to_string(),
            src: src.to_string(),
        }
    }

    pub fn set_literal(dst: &str, value: impl Into<Value>) -> Self {
        FieldOp::SetLiteral {
            dst: dst.to_string(),
            value: value.into(),
        }
    }

    pub fn set_default(dst: &str, value: impl Into<Value>) -> Self {
        FieldOp::SetDefault {
            dst: dst.to_string(),
            value: value.into(),
        }
    }

    pub fn remove_if_equals(field: &str, value: &str) -> Self {
        FieldOp::RemoveIfEquals {
            field: field.to_string(),
            value: value.to_string(),
        }
    }

    pub fn map_values(field: &str, table: &[(&str, &str)], exclusive: bool) -> Self {
        FieldOp::MapValues {
            field: field.to_string(),
            table: table
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            exclusive,
        }
    }

    pub fn nest_under(prefix: &str, dest: &str) -> Self {
        FieldOp::NestUnder {
            prefix: prefix.to_string(),
            dest: dest.to_string(),
        }
    }

    pub fn convert(field: &str, to: FieldType) -> Self {
        FieldOp::Convert {
            field: field.to_string(),
            to,
        }
    }
}

/// A [`FieldOp`] with its paths resolved.
#[derive(Debug, Clone)]
enum Step {
    Copy { dst: FieldPath, src: FieldPath },
    Move { dst: FieldPath, src: FieldPath },
    Set { dst: FieldPath, value: Value },
    Default { dst: FieldPath, value: Value },
    RemoveIfEquals { field: FieldPath, value: String },
    Map {
        field: FieldPath,
        table: BTreeMap<String, String>,
        exclusive: bool,
    },
    Nest { prefix: String, dest: FieldPath },
    Convert { field: FieldPath, to: FieldType },
}

/// An ordered, immutable list of field ops.
///
/// Ops run in list order, so a later op sees what earlier ops wrote, and
/// two writes to one destination resolve as last-write-wins.
#[derive(Debug, Clone, Default)]
pub struct Remapper {
    steps: Vec<Step>,
}

impl Remapper {
    pub fn new(ops: &[FieldOp]) -> Result<Self, BuildError> {
        let steps = ops.iter().map(compile).collect::<Result<Vec<_>, _>>()?;
        Ok(Self { steps })
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn apply(&self, fields: &mut Fields) {
        for step in &self.steps {
            apply_step(step, fields);
        }
    }
}

fn compile(op: &FieldOp) -> Result<Step, BuildError> {
    Ok(match op {
        FieldOp::CopyValue { dst, src } => Step::Copy {
            dst: FieldPath::parse(dst)?,
            src: FieldPath::parse(src)?,
        },
        FieldOp::MoveValue { dst, src } => Step::Move {
            dst: FieldPath::parse(dst)?,
            src: FieldPath::parse(src)?,
        },
        FieldOp::SetLiteral { dst, value } => Step::Set {
            dst: FieldPath::parse(dst)?,
            value: value.clone(),
        },
        FieldOp::SetDefault { dst, value } => Step::Default {
            dst: FieldPath::parse(dst)?,
            value: value.clone(),
        },
        FieldOp::RemoveIfEquals { field, value } => Step::RemoveIfEquals {
            field: FieldPath::parse(field)?,
            value: value.clone(),
        },
        FieldOp::MapValues {
            field,
            table,
            exclusive,
        } => Step::Map {
            field: FieldPath::parse(field)?,
            table: table.clone(),
            exclusive: *exclusive,
        },
        FieldOp::NestUnder { prefix, dest } => {
            if prefix.is_empty() {
                return Err(BuildError::InvalidFieldPath {
                    path: prefix.clone(),
                    reason: "nest_under prefix is empty".to_string(),
                });
            }
            Step::Nest {
                prefix: prefix.clone(),
                dest: FieldPath::parse(dest)?,
            }
        }
        FieldOp::Convert { field, to } => Step::Convert {
            field: FieldPath::parse(field)?,
            to: *to,
        },
    })
}

fn apply_step(step: &Step, fields: &mut Fields) {
    match step {
        Step::Copy { dst, src } => {
            if let Some(value) = src.get(fields).cloned() {
                dst.insert(fields, value);
            }
        }
        Step::Move { dst, src } => {
            if let Some(value) = src.remove(fields) {
                dst.insert(fields, value);
            }
        }
        Step::Set { dst, value } => dst.insert(fields, value.clone()),
        Step::Default { dst, value } => {
            if dst.get(fields).is_none() {
                dst.insert(fields, value.clone());
            }
        }
        Step::RemoveIfEquals { field, value } => {
            let equal = field
                .get(fields)
                .and_then(scalar_text)
                .is_some_and(|current| current == *value);
            if equal {
                field.remove(fields);
            }
        }
        Step::Map {
            field,
            table,
            exclusive,
        } => {
            let Some(current) = field.get(fields) else {
                return;
            };
            let mapped = scalar_text(current).and_then(|text| table.get(&text));
            match mapped {
                Some(new) => field.insert(fields, Value::String(new.clone())),
                None if *exclusive => {
                    trace!(field = %field, "map_values: unmapped value dropped");
                    field.remove(fields);
                }
                None => {}
            }
        }
        Step::Nest { prefix, dest } => {
            let keys: Vec<String> = fields
                .keys()
                .filter(|k| k.len() > prefix.len() && k.starts_with(prefix.as_str()))
                .cloned()
                .collect();
            if keys.is_empty() {
                return;
            }

            let mut nested = match dest.get(fields) {
                None => Map::new(),
                Some(Value::Object(existing)) => existing.clone(),
                Some(_) => {
                    trace!(dest = %dest, "nest_under: destination is not an object, fields left in place");
                    return;
                }
            };
            for key in keys {
                if let Some(value) = fields.remove(&key) {
                    nested.insert(key[prefix.len()..].to_string(), value);
                }
            }
            dest.insert(fields, Value::Object(nested));
        }
        Step::Convert { field, to } => {
            let converted = field.get(fields).and_then(|v| to.convert(v));
            if let Some(value) = converted {
                field.insert(fields, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(v: Value) -> Fields {
        match v {
            Value::Object(m) => m,
            _ => panic!("not an object"),
        }
    }

    fn severity_table() -> Vec<(&'static str, &'static str)> {
        vec![("error", "ERROR"), ("warn", "WARNING"), ("info", "INFO")]
    }

    #[test]
    fn test_sentinel_removed() {
        let r = Remapper::new(&[FieldOp::remove_if_equals("user", "-")]).unwrap();
        let mut f = fields(json!({"user": "-", "host": "10.0.0.1"}));
        r.apply(&mut f);
        assert!(!f.contains_key("user"));
        assert_eq!(f["host"], "10.0.0.1");

        let mut f = fields(json!({"user": "frank"}));
        r.apply(&mut f);
        assert_eq!(f["user"], "frank");
    }

    #[test]
    fn test_remove_if_equals_matches_numbers_by_text() {
        let r = Remapper::new(&[FieldOp::remove_if_equals("size", "0")]).unwrap();
        let mut f = fields(json!({"size": 0}));
        r.apply(&mut f);
        assert!(f.is_empty());
    }

    #[test]
    fn test_copy_and_move() {
        let r = Remapper::new(&[
            FieldOp::copy_value("a_copy", "a"),
            FieldOp::move_value("nested.b", "b"),
            FieldOp::move_value("x", "missing"),
        ])
        .unwrap();
        let mut f = fields(json!({"a": 1, "b": 2}));
        r.apply(&mut f);
        assert_eq!(f, fields(json!({"a": 1, "a_copy": 1, "nested": {"b": 2}})));
    }

    #[test]
    fn test_last_write_wins() {
        let r = Remapper::new(&[
            FieldOp::set_literal("severity", "INFO"),
            FieldOp::copy_value("severity", "level"),
        ])
        .unwrap();
        let mut f = fields(json!({"level": "ERROR"}));
        r.apply(&mut f);
        assert_eq!(f["severity"], "ERROR");
    }

    #[test]
    fn test_set_default_only_when_absent() {
        let r = Remapper::new(&[FieldOp::set_default("severity", "DEFAULT")]).unwrap();
        let mut f = fields(json!({"severity": "ERROR"}));
        r.apply(&mut f);
        assert_eq!(f["severity"], "ERROR");

        let mut f = Fields::new();
        r.apply(&mut f);
        assert_eq!(f["severity"], "DEFAULT");
    }

    #[test]
    fn test_exclusive_map_values() {
        let r = Remapper::new(&[FieldOp::map_values("level", &severity_table(), true)]).unwrap();

        for (from, to) in severity_table() {
            let mut f = fields(json!({ "level": from }));
            r.apply(&mut f);
            assert_eq!(f["level"], to);
        }
        for unmapped in ["fatal", "", "ERROR", "notice"] {
            let mut f = fields(json!({ "level": unmapped }));
            r.apply(&mut f);
            assert!(!f.contains_key("level"), "{unmapped:?} should be dropped");
        }
    }

    #[test]
    fn test_non_exclusive_map_values_keeps_unmapped() {
        let r = Remapper::new(&[FieldOp::map_values("level", &severity_table(), false)]).unwrap();
        let mut f = fields(json!({"level": "TRACE"}));
        r.apply(&mut f);
        assert_eq!(f["level"], "TRACE");
    }

    #[test]
    fn test_nest_under() {
        let r = Remapper::new(&[FieldOp::nest_under("http_request_", "http_request")]).unwrap();
        let mut f = fields(json!({
            "http_request_status": 200,
            "http_request_requestMethod": "GET",
            "host": "a",
        }));
        r.apply(&mut f);
        assert_eq!(
            f,
            fields(json!({
                "host": "a",
                "http_request": {"status": 200, "requestMethod": "GET"},
            }))
        );
    }

    #[test]
    fn test_nest_under_without_matches_creates_nothing() {
        let r = Remapper::new(&[FieldOp::nest_under("http_request_", "http_request")]).unwrap();
        let mut f = fields(json!({"message": "x"}));
        r.apply(&mut f);
        assert!(!f.contains_key("http_request"));
    }

    #[test]
    fn test_nest_under_keeps_scalar_destination() {
        let r = Remapper::new(&[FieldOp::nest_under("http_request_", "http_request")]).unwrap();
        let mut f = fields(json!({"http_request": "GET /", "http_request_status": 200}));
        r.apply(&mut f);
        assert_eq!(f, fields(json!({"http_request": "GET /", "http_request_status": 200})));

        let mut f = fields(json!({"http_request": {"protocol": "HTTP/1.1"}, "http_request_status": 200}));
        r.apply(&mut f);
        assert_eq!(
            f,
            fields(json!({"http_request": {"protocol": "HTTP/1.1", "status": 200}}))
        );
    }

    #[test]
    fn test_convert() {
        let r = Remapper::new(&[
            FieldOp::convert("status", FieldType::Integer),
            FieldOp::convert("latency", FieldType::Float),
            FieldOp::convert("odd", FieldType::Integer),
        ])
        .unwrap();
        let mut f = fields(json!({"status": "404", "latency": "0.5", "odd": "n/a"}));
        r.apply(&mut f);
        assert_eq!(f["status"], 404);
        assert_eq!(f["latency"], 0.5);
        assert_eq!(f["odd"], "n/a");
    }

    #[test]
    fn test_second_application_is_noop_without_sources() {
        let ops = [
            FieldOp::map_values("level", &[("E", "ERROR")], true),
            FieldOp::move_value("severity", "level"),
            FieldOp::remove_if_equals("user", "-"),
            FieldOp::nest_under("http_request_", "http_request"),
        ];
        let r = Remapper::new(&ops).unwrap();
        let mut f = fields(json!({
            "level": "E",
            "user": "-",
            "http_request_status": 500,
        }));
        r.apply(&mut f);
        let once = f.clone();
        r.apply(&mut f);
        assert_eq!(f, once);
        assert_eq!(f["severity"], "ERROR");
    }

    #[test]
    fn test_invalid_paths_rejected() {
        assert!(Remapper::new(&[FieldOp::copy_value("a..b", "c")]).is_err());
        assert!(Remapper::new(&[FieldOp::nest_under("", "x")]).is_err());
    }

    #[test]
    fn test_ops_deserialize_from_toml() {
        #[derive(Deserialize)]
        struct Doc {
            field_ops: Vec<FieldOp>,
        }
        let doc: Doc = toml::from_str(
            r#"
            [[field_ops]]
            op = "remove_if_equals"
            field = "user"
            value = "-"

            [[field_ops]]
            op = "map_values"
            field = "severity"
            exclusive = true
            table = { E = "ERROR", W = "WARNING" }

            [[field_ops]]
            op = "convert"
            field = "status"
            to = "integer"
            "#,
        )
        .unwrap();

        assert_eq!(doc.field_ops[0], FieldOp::remove_if_equals("user", "-"));
        assert_eq!(
            doc.field_ops[1],
            FieldOp::map_values("severity", &[("E", "ERROR"), ("W", "WARNING")], true)
        );
        assert_eq!(doc.field_ops[2], FieldOp::convert("status", FieldType::Integer));
    }
}
