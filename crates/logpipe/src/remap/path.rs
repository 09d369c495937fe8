use std::fmt;

use serde_json::{Map, Value};

use crate::error::BuildError;
use crate::parser::Fields;

/// A dotted path into a record, e.g. `http_request.status`.
///
/// Segments containing a dot can be quoted: `labels."k8s.io/name"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    pub fn parse(path: &str) -> Result<Self, BuildError> {
        let invalid = |reason: &str| BuildError::InvalidFieldPath {
            path: path.to_string(),
            reason: reason.to_string(),
        };

        let mut segments = Vec::new();
        let mut current = String::new();
        let mut chars = path.chars().peekable();
        let mut quoted_segment = false;

        while let Some(c) = chars.next() {
            match c {
                '"' if current.is_empty() && !quoted_segment => {
                    loop {
                        match chars.next() {
                            Some('"') => break,
                            Some(q) => current.push(q),
                            None => return Err(invalid("unterminated quote")),
                        }
                    }
                    quoted_segment = true;
                    if !matches!(chars.peek(), None | Some('.')) {
                        return Err(invalid("text after closing quote"));
                    }
                }
                '.' => {
                    if current.is_empty() && !quoted_segment {
                        return Err(invalid("empty segment"));
                    }
                    segments.push(std::mem::take(&mut current));
                    quoted_segment = false;
                }
                _ => current.push(c),
            }
        }

        if current.is_empty() && !quoted_segment {
            return Err(invalid("empty segment"));
        }
        segments.push(current);

        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_top_level(&self) -> bool {
        self.segments.len() == 1
    }

    pub fn get<'a>(&self, fields: &'a Fields) -> Option<&'a Value> {
        let (last, parents) = self.segments.split_last()?;
        let mut map = fields;
        for segment in parents {
            map = map.get(segment)?.as_object()?;
        }
        map.get(last)
    }

    pub fn remove(&self, fields: &mut Fields) -> Option<Value> {
        let (last, parents) = self.segments.split_last()?;
        let mut map = fields;
        for segment in parents {
            map = map.get_mut(segment)?.as_object_mut()?;
        }
        map.remove(last)
    }

    /// Write `value`, creating intermediate objects as needed. A scalar in
    /// the way of an intermediate segment is replaced by an object.
    pub fn insert(&self, fields: &mut Fields, value: Value) {
        let Some((last, parents)) = self.segments.split_last() else {
            return;
        };
        let mut map = fields;
        for segment in parents {
            let slot = map
                .entry(segment.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            map = match slot {
                Value::Object(inner) => inner,
                _ => return,
            };
        }
        map.insert(last.clone(), value);
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            if segment.contains('.') || segment.is_empty() {
                write!(f, "\"{segment}\"")?;
            } else {
                f.write_str(segment)?;
            }
        }
        Ok(())
    }
}
