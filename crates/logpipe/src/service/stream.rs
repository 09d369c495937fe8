//! Stream routing: one continuation state machine per tagged stream.
//!
//! Every stream owns its grouper behind a mutex so the line path and the
//! timeout flush job never interleave on the same buffer. Records are
//! normalized and handed to the sink while that lock is held, which keeps
//! per-stream output in arrival order.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::multiline::{LogicalRecord, MultilineGrouper};
use crate::parser::PipelineMetrics;
use crate::pipeline::{LineSource, LoggingReceiver, NormalizedRecord, RecordNormalizer};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouteError {
    #[error("no stream registered under tag `{0}`")]
    UnknownStream(String),

    #[error("stream `{0}` is already registered")]
    DuplicateStream(String),
}

/// Where normalized records go.
pub trait RecordSink: Send + Sync {
    fn emit(&self, record: NormalizedRecord);
}

impl RecordSink for mpsc::UnboundedSender<NormalizedRecord> {
    fn emit(&self, record: NormalizedRecord) {
        if self.send(record).is_err() {
            debug!("record sink closed, dropping record");
        }
    }
}

/// In-memory sink, drained with [`take`](Self::take).
#[derive(Debug, Default)]
pub struct CollectingSink {
    records: Mutex<Vec<NormalizedRecord>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<NormalizedRecord> {
        std::mem::take(&mut *self.records.lock())
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl RecordSink for CollectingSink {
    fn emit(&self, record: NormalizedRecord) {
        self.records.lock().push(record);
    }
}

struct StreamWorker {
    tag: String,
    normalizer: Arc<dyn RecordNormalizer>,
    /// `None` once the stream is closed.
    grouper: Mutex<Option<MultilineGrouper>>,
    sink: Arc<dyn RecordSink>,
    metrics: Arc<PipelineMetrics>,
}

impl StreamWorker {
    /// False when the stream was closed before the line got the lock.
    fn push(&self, line: String) -> bool {
        let mut slot = self.grouper.lock();
        let Some(grouper) = slot.as_mut() else {
            return false;
        };
        for record in grouper.process(line, Utc::now()) {
            self.emit(record);
        }
        true
    }

    fn flush_expired(&self) -> usize {
        let mut slot = self.grouper.lock();
        match slot.as_mut().and_then(MultilineGrouper::check_timeout) {
            Some(record) => {
                self.emit(record);
                1
            }
            None => 0,
        }
    }

    /// Emit the pending record and refuse any further lines.
    fn close(&self) -> usize {
        let mut slot = self.grouper.lock();
        match slot.take().and_then(|mut grouper| grouper.flush()) {
            Some(record) => {
                self.emit(record);
                1
            }
            None => 0,
        }
    }

    fn emit(&self, record: LogicalRecord) {
        self.metrics.record_emitted(record.line_count());
        let normalized = self.normalizer.normalize(&self.tag, record);
        self.sink.emit(normalized);
    }
}

/// Routes tagged lines to their stream's state machine.
pub struct StreamRouter {
    streams: DashMap<String, Arc<StreamWorker>>,
    metrics: Arc<PipelineMetrics>,
    timeout: Duration,
}

impl StreamRouter {
    pub fn new(metrics: Arc<PipelineMetrics>, timeout: Duration) -> Self {
        Self {
            streams: DashMap::new(),
            metrics,
            timeout,
        }
    }

    /// Register a stream whose records go through `normalizer` into `sink`.
    pub fn add_stream(
        &self,
        tag: &str,
        normalizer: Arc<dyn RecordNormalizer>,
        sink: Arc<dyn RecordSink>,
    ) -> Result<(), RouteError> {
        match self.streams.entry(tag.to_string()) {
            Entry::Occupied(_) => Err(RouteError::DuplicateStream(tag.to_string())),
            Entry::Vacant(slot) => {
                let grouper = normalizer.new_grouper(self.timeout);
                debug!(
                    stream = tag,
                    pipeline = normalizer.name(),
                    multiline = !grouper.is_passthrough(),
                    "stream registered"
                );
                slot.insert(Arc::new(StreamWorker {
                    tag: tag.to_string(),
                    normalizer,
                    grouper: Mutex::new(Some(grouper)),
                    sink,
                    metrics: self.metrics.clone(),
                }));
                self.metrics.inc_active_streams();
                Ok(())
            }
        }
    }

    /// Register a resolved log type under its receiver tag.
    pub fn attach(
        &self,
        receiver: Arc<LoggingReceiver>,
        sink: Arc<dyn RecordSink>,
    ) -> Result<(), RouteError> {
        let tag = receiver.tag().to_string();
        self.add_stream(&tag, receiver, sink)
    }

    pub fn push_line(&self, tag: &str, line: String) -> Result<(), RouteError> {
        let worker = self
            .streams
            .get(tag)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| RouteError::UnknownStream(tag.to_string()))?;

        if !worker.push(line) {
            return Err(RouteError::UnknownStream(tag.to_string()));
        }
        self.metrics.record_line();
        Ok(())
    }

    /// Flush every stream whose pending record has been idle past the
    /// timeout. Returns how many records were flushed.
    pub fn flush_expired(&self) -> usize {
        self.workers().iter().map(|w| w.flush_expired()).sum()
    }

    /// Remove a stream, emitting its pending record. False if unknown.
    pub fn close_stream(&self, tag: &str) -> bool {
        match self.streams.remove(tag) {
            Some((_, worker)) => {
                let flushed = worker.close();
                self.metrics.dec_active_streams();
                debug!(stream = tag, flushed, "stream closed");
                true
            }
            None => false,
        }
    }

    /// Close every stream. Returns how many pending records were flushed.
    pub fn shutdown(&self) -> usize {
        let tags: Vec<String> = self.streams.iter().map(|e| e.key().clone()).collect();
        let mut flushed = 0;
        for tag in tags {
            if let Some((_, worker)) = self.streams.remove(&tag) {
                flushed += worker.close();
                self.metrics.dec_active_streams();
            }
        }
        info!(flushed, "all streams closed");
        flushed
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.streams.contains_key(tag)
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    pub fn metrics(&self) -> &Arc<PipelineMetrics> {
        &self.metrics
    }

    fn workers(&self) -> Vec<Arc<StreamWorker>> {
        self.streams.iter().map(|e| e.value().clone()).collect()
    }
}
