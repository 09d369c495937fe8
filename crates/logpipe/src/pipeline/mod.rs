//! Pipeline: per-log-type assembly: definitions, registry, normalization.

pub mod catalog;
pub mod chain;
pub mod definition;
pub mod record;
pub mod registry;
pub mod severity;
pub mod traits;

pub use chain::Pipeline;
pub use definition::{LogTypeDefinition, ParserDef, PipelineOverrides};
pub use record::NormalizedRecord;
pub use registry::{LogTypeEntry, Registry};
pub use severity::Severity;
pub use traits::{FilesReceiver, LineSource, LoggingReceiver, ReceiverProcessor, RecordNormalizer};
