//! Construction-time errors shared by the parser, multiline and pipeline layers.

use thiserror::Error;

use crate::parser::pattern::PatternError;
use crate::parser::time::TimeFormatError;

/// Anything that can go wrong while turning declarative definitions into a
/// runnable pipeline. None of these can occur once a pipeline is built.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("log type `{log_type}`: {source}")]
    Pattern {
        log_type: String,
        #[source]
        source: PatternError,
    },

    #[error("log type `{log_type}`: {source}")]
    TimeFormat {
        log_type: String,
        #[source]
        source: TimeFormatError,
    },

    #[error("time key `{0}` is not a capture name of its pattern")]
    TimeKeyNotCaptured(String),

    #[error("time_key and time_format must be set together (got key={key:?}, format={format:?})")]
    IncompleteTime {
        key: Option<String>,
        format: Option<String>,
    },

    #[error("log type `{0}` declares no parsers")]
    NoParsers(String),

    #[error("multiline rules: {0}")]
    InvalidRules(String),

    #[error("invalid field path {path:?}: {reason}")]
    InvalidFieldPath { path: String, reason: String },

    #[error("unknown log type `{0}`")]
    UnknownLogType(String),

    #[error("log type `{0}` is already registered")]
    DuplicateLogType(String),
}
