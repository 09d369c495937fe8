use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// Declared type of a captured field. Anything not in a type table stays a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Integer,
    Float,
    String,
}

/// Capture name -> declared type.
pub type TypeTable = BTreeMap<String, FieldType>;

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Integer => "integer",
            FieldType::Float => "float",
            FieldType::String => "string",
        }
    }

    /// Cast raw captured text. `None` means the text is not a valid value of
    /// this type; callers leave the field out rather than defaulting it.
    pub fn cast(&self, raw: &str) -> Option<Value> {
        match self {
            FieldType::Integer => parse_integer(raw),
            FieldType::Float => raw
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number),
            FieldType::String => Some(Value::String(raw.to_string())),
        }
    }

    /// Convert an already-typed value. Used by the `convert` field op, where
    /// a value that does not convert is left as it was.
    pub fn convert(&self, value: &Value) -> Option<Value> {
        match (self, value) {
            (FieldType::String, Value::String(_)) => Some(value.clone()),
            (FieldType::String, Value::Number(n)) => Some(Value::String(n.to_string())),
            (FieldType::String, Value::Bool(b)) => Some(Value::String(b.to_string())),
            (FieldType::Integer, Value::Number(n)) if n.is_i64() || n.is_u64() => Some(value.clone()),
            (FieldType::Integer, Value::Number(n)) => n
                .as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64)
                .map(|f| Value::from(f as i64)),
            (FieldType::Float, Value::Number(n)) => n
                .as_f64()
                .and_then(Number::from_f64)
                .map(Value::Number),
            (_, Value::String(s)) => self.cast(s),
            _ => None,
        }
    }
}

fn parse_integer(raw: &str) -> Option<Value> {
    if let Ok(i) = raw.parse::<i64>() {
        return Some(Value::from(i));
    }
    raw.parse::<u64>().ok().map(Value::from)
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "integer" => Ok(FieldType::Integer),
            "float" => Ok(FieldType::Float),
            "string" => Ok(FieldType::String),
            other => Err(format!("unknown field type `{other}`")),
        }
    }
}

/// Render a scalar the way it would have appeared in the log line.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_cast() {
        assert_eq!(FieldType::Integer.cast("35708"), Some(Value::from(35708)));
        assert_eq!(FieldType::Integer.cast("-12"), Some(Value::from(-12)));
        assert_eq!(
            FieldType::Integer.cast("140169666050176"),
            Some(Value::from(140169666050176i64))
        );
        assert_eq!(
            FieldType::Integer.cast("18446744073709551615"),
            Some(Value::from(u64::MAX))
        );
    }

    #[test]
    fn test_integer_cast_rejects_text() {
        assert_eq!(FieldType::Integer.cast("abc"), None);
        assert_eq!(FieldType::Integer.cast("12.5"), None);
        assert_eq!(FieldType::Integer.cast(""), None);
    }

    #[test]
    fn test_float_cast() {
        assert_eq!(FieldType::Float.cast("0.0002390"), Some(Value::from(0.000239)));
        assert_eq!(FieldType::Float.cast("NaN"), None);
        assert_eq!(FieldType::Float.cast("x"), None);
    }

    #[test]
    fn test_round_trip_integer_and_string() {
        for raw in ["0", "42", "-7", "4328636416"] {
            let v = FieldType::Integer.cast(raw).unwrap();
            assert_eq!(scalar_text(&v).as_deref(), Some(raw));
        }
        for raw in ["-", "GET", "with space", "/a?b=c"] {
            let v = FieldType::String.cast(raw).unwrap();
            assert_eq!(scalar_text(&v).as_deref(), Some(raw));
        }
    }

    #[test]
    fn test_convert_leaves_unconvertible() {
        assert_eq!(FieldType::Integer.convert(&Value::from("12")), Some(Value::from(12)));
        assert_eq!(FieldType::Integer.convert(&Value::from("n/a")), None);
        assert_eq!(FieldType::String.convert(&Value::from(7)), Some(Value::from("7")));
        assert_eq!(FieldType::Integer.convert(&Value::from(3.0)), Some(Value::from(3)));
        assert_eq!(FieldType::Integer.convert(&Value::from(3.5)), None);
    }

    #[test]
    fn test_from_str() {
        assert_eq!("integer".parse::<FieldType>(), Ok(FieldType::Integer));
        assert!("timestamp".parse::<FieldType>().is_err());
    }
}
