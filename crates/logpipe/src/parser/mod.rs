/// Log parsing: named-capture matching, typed casts and timestamp parsing.
///
/// # Architecture
///
/// - `pattern.rs`: compiled named-capture expressions (the matcher)
/// - `cast.rs`: declared field types and the string -> value casts
/// - `time.rs`: strptime-style timestamp formats with fractional seconds
/// - `spec.rs`: a pattern plus its type table and time directives
/// - `metrics.rs`: counters for every degraded outcome
/// - `model.rs`: raw / typed field maps and per-record parse errors
///
/// Nothing in here is fatal to a stream: a line that does not match or a
/// field that does not cast is reported, never raised.

pub mod pattern;
pub mod cast;
pub mod time;
pub mod spec;
pub mod metrics;
pub mod model;

pub use cast::{FieldType, TypeTable};
pub use metrics::{MetricsSnapshot, PipelineMetrics};
pub use model::{Fields, ParseError, ParsedRecord, RawFields};
pub use pattern::Pattern;
pub use spec::{ParserSpec, TimeSpec};
pub use time::TimeFormat;

/// Field holding the unparsed text of a record.
pub const MESSAGE_FIELD: &str = "message";
