use std::time::Duration;

use super::chain::Pipeline;
use super::record::NormalizedRecord;
use crate::service::multiline::{LogicalRecord, MultilineGrouper};

/// Something that produces raw lines for one tagged stream. The tailing
/// itself happens outside this crate; a source only describes what to tail.
pub trait LineSource: Send + Sync {
    fn tag(&self) -> &str;
    fn include_paths(&self) -> &[String];
    fn exclude_paths(&self) -> &[String];
}

/// Something that turns logical records into normalized records.
pub trait RecordNormalizer: Send + Sync {
    fn name(&self) -> &str;
    fn normalize(&self, stream: &str, record: LogicalRecord) -> NormalizedRecord;
    fn new_grouper(&self, timeout: Duration) -> MultilineGrouper;
}

/// Files-based line source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilesReceiver {
    tag: String,
    include_paths: Vec<String>,
    exclude_paths: Vec<String>,
}

impl FilesReceiver {
    pub fn new(tag: &str, include_paths: Vec<String>, exclude_paths: Vec<String>) -> Self {
        Self {
            tag: tag.to_string(),
            include_paths,
            exclude_paths,
        }
    }
}

impl LineSource for FilesReceiver {
    fn tag(&self) -> &str {
        &self.tag
    }

    fn include_paths(&self) -> &[String] {
        &self.include_paths
    }

    fn exclude_paths(&self) -> &[String] {
        &self.exclude_paths
    }
}

/// A receiver and the processor its lines go through, held side by side.
/// The pair satisfies both capability traits by forwarding to the part
/// that owns each behavior.
#[derive(Debug)]
pub struct ReceiverProcessor<R, P> {
    receiver: R,
    processor: P,
}

impl<R: LineSource, P: RecordNormalizer> ReceiverProcessor<R, P> {
    pub fn new(receiver: R, processor: P) -> Self {
        Self {
            receiver,
            processor,
        }
    }

    pub fn receiver(&self) -> &R {
        &self.receiver
    }

    pub fn processor(&self) -> &P {
        &self.processor
    }

    pub fn into_parts(self) -> (R, P) {
        (self.receiver, self.processor)
    }
}

impl<R: LineSource, P: Send + Sync> LineSource for ReceiverProcessor<R, P> {
    fn tag(&self) -> &str {
        self.receiver.tag()
    }

    fn include_paths(&self) -> &[String] {
        self.receiver.include_paths()
    }

    fn exclude_paths(&self) -> &[String] {
        self.receiver.exclude_paths()
    }
}

impl<R: Send + Sync, P: RecordNormalizer> RecordNormalizer for ReceiverProcessor<R, P> {
    fn name(&self) -> &str {
        self.processor.name()
    }

    fn normalize(&self, stream: &str, record: LogicalRecord) -> NormalizedRecord {
        self.processor.normalize(stream, record)
    }

    fn new_grouper(&self, timeout: Duration) -> MultilineGrouper {
        self.processor.new_grouper(timeout)
    }
}

/// A resolved log type: tail these files, normalize through this pipeline.
pub type LoggingReceiver = ReceiverProcessor<FilesReceiver, Pipeline>;
