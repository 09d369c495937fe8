use serde::{Deserialize, Serialize};

use crate::error::BuildError;
use crate::parser::{Pattern, ParserSpec, TimeFormat, TimeSpec, TypeTable};
use crate::remap::FieldOp;
use crate::service::multiline::RuleDef;

/// Declarative form of one [`ParserSpec`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserDef {
    pub regex: String,
    pub time_key: Option<String>,
    pub time_format: Option<String>,
    pub types: TypeTable,
}

impl ParserDef {
    pub fn new(regex: &str) -> Self {
        Self {
            regex: regex.to_string(),
            ..Self::default()
        }
    }

    pub fn time(mut self, key: &str, format: &str) -> Self {
        self.time_key = Some(key.to_string());
        self.time_format = Some(format.to_string());
        self
    }

    pub fn typed(mut self, field: &str, ty: crate::parser::FieldType) -> Self {
        self.types.insert(field.to_string(), ty);
        self
    }

    pub fn compile(&self, log_type: &str) -> Result<ParserSpec, BuildError> {
        let pattern = Pattern::new(&self.regex).map_err(|source| BuildError::Pattern {
            log_type: log_type.to_string(),
            source,
        })?;

        let time = match (&self.time_key, &self.time_format) {
            (Some(key), Some(format)) => Some(TimeSpec {
                key: key.clone(),
                format: TimeFormat::new(format).map_err(|source| BuildError::TimeFormat {
                    log_type: log_type.to_string(),
                    source,
                })?,
            }),
            (None, None) => None,
            (key, format) => {
                return Err(BuildError::IncompleteTime {
                    key: key.clone(),
                    format: format.clone(),
                })
            }
        };

        ParserSpec::new(pattern, self.types.clone(), time)
    }
}

/// Everything an application contributes to its pipeline: parser variants
/// tried in order, an optional continuation rule set and the remap ops.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogTypeDefinition {
    pub parsers: Vec<ParserDef>,
    pub multiline: Vec<RuleDef>,
    pub field_ops: Vec<FieldOp>,
}

/// User overrides of an application's parser defaults. All optional.
///
/// `regex` replaces the whole parser list with a single parser built from
/// the override fields. Without it, `time_key` / `time_format` replace the
/// value on every parser and `types` entries are merged in. A non-empty
/// `multiline` replaces the application's continuation rules.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineOverrides {
    pub regex: Option<String>,
    pub time_key: Option<String>,
    pub time_format: Option<String>,
    pub types: TypeTable,
    pub multiline: Vec<RuleDef>,
}

impl PipelineOverrides {
    pub fn is_empty(&self) -> bool {
        self.regex.is_none()
            && self.time_key.is_none()
            && self.time_format.is_none()
            && self.types.is_empty()
            && self.multiline.is_empty()
    }

    /// Continuation rules after applying these overrides to `rules`.
    pub fn rules(&self, rules: Vec<RuleDef>) -> Vec<RuleDef> {
        if self.multiline.is_empty() {
            rules
        } else {
            self.multiline.clone()
        }
    }

    /// Parser list after applying these overrides to `parsers`.
    pub fn apply(&self, parsers: Vec<ParserDef>) -> Vec<ParserDef> {
        if let Some(regex) = &self.regex {
            return vec![ParserDef {
                regex: regex.clone(),
                time_key: self.time_key.clone(),
                time_format: self.time_format.clone(),
                types: self.types.clone(),
            }];
        }

        parsers
            .into_iter()
            .map(|mut parser| {
                if let Some(key) = &self.time_key {
                    parser.time_key = Some(key.clone());
                }
                if let Some(format) = &self.time_format {
                    parser.time_format = Some(format.clone());
                }
                parser
                    .types
                    .extend(self.types.iter().map(|(k, v)| (k.clone(), *v)));
                parser
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::FieldType;

    #[test]
    fn test_regex_override_replaces_parsers() {
        let parsers = vec![ParserDef::new("^a$"), ParserDef::new("^b$")];
        let overrides = PipelineOverrides {
            regex: Some(r"^(?<message>.*)$".into()),
            ..Default::default()
        };
        let out = overrides.apply(parsers);
        assert_eq!(out, vec![ParserDef::new(r"^(?<message>.*)$")]);
    }

    #[test]
    fn test_field_overrides_merge() {
        let parsers = vec![ParserDef::new(r"^(?<t>\S+) (?<n>\d+)$")
            .time("t", "%Y")
            .typed("n", FieldType::Integer)];
        let overrides = PipelineOverrides {
            time_format: Some("%Y-%m-%d".into()),
            types: TypeTable::from([("x".to_string(), FieldType::Float)]),
            ..Default::default()
        };
        let out = overrides.apply(parsers);
        assert_eq!(out[0].time_key.as_deref(), Some("t"));
        assert_eq!(out[0].time_format.as_deref(), Some("%Y-%m-%d"));
        assert_eq!(out[0].types.len(), 2);
    }

    #[test]
    fn test_multiline_override_replaces_rules() {
        let defaults = vec![RuleDef::new("start_state", "cont", r"^\d")];
        assert_eq!(PipelineOverrides::default().rules(defaults.clone()), defaults);

        let overrides: PipelineOverrides = toml::from_str(
            r#"
            regex = '^(?<message>.*)$'

            [[multiline]]
            state = "start_state"
            next_state = "trace"
            regex = '^[A-Z]'

            [[multiline]]
            state = "trace"
            next_state = "trace"
            regex = '^\s+at '
            "#,
        )
        .unwrap();
        assert!(!overrides.is_empty());
        let rules = overrides.rules(defaults);
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[1].next_state, "trace");
    }

    #[test]
    fn test_compile_rejects_half_time() {
        let mut def = ParserDef::new(r"^(?<time>\S+)$");
        def.time_key = Some("time".into());
        assert!(matches!(
            def.compile("x"),
            Err(BuildError::IncompleteTime { .. })
        ));
    }

    #[test]
    fn test_compile_reports_log_type() {
        let err = ParserDef::new("(").compile("apache_error").unwrap_err();
        assert!(err.to_string().starts_with("log type `apache_error`"));
    }

    #[test]
    fn test_definition_from_toml() {
        let def: LogTypeDefinition = toml::from_str(
            r#"
            [[parsers]]
            regex = '^(?<time>\S+) (?<message>.*)$'
            time_key = "time"
            time_format = "%Y-%m-%dT%H:%M:%S"

            [[multiline]]
            state = "start_state"
            next_state = "cont"
            regex = '^\d{4}'

            [[multiline]]
            state = "cont"
            next_state = "cont"
            regex = '^\d{4}'
            negate = true
            "#,
        )
        .unwrap();
        assert_eq!(def.parsers.len(), 1);
        assert!(def.multiline[1].negate);
        assert!(def.field_ops.is_empty());
    }
}
