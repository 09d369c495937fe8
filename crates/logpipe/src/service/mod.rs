//! Service: stream grouping, routing and the periodic flush job.

pub mod background;
pub mod multiline;
pub mod stream;

pub use background::{flush_expired_streams, spawn_flush_job};
pub use multiline::{LogicalRecord, MultilineGrouper, RuleDef, RuleSet, START_STATE};
pub use stream::{CollectingSink, RecordSink, RouteError, StreamRouter};
