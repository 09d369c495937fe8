use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use serde::Serialize;

use super::model::ParseError;

/// Forces the wrapped group onto its own 64-byte cache line so that
/// stream workers bumping different groups do not false-share.
#[repr(align(64))]
#[derive(Debug, Default)]
pub struct CacheAligned<T>(pub T);

/// Line and record flow through the stream workers (hottest path).
#[derive(Debug, Default)]
pub struct StreamCounters {
    pub lines_received: AtomicU64,
    pub records_emitted: AtomicU64,
    pub grouped_records: AtomicU64,
    pub timeout_flushes: AtomicU64,
    pub continuation_gaps: AtomicU64,
}

/// Pattern outcomes per logical record.
#[derive(Debug, Default)]
pub struct OutcomeCounters {
    pub matched: AtomicU64,
    pub fallback: AtomicU64,
}

/// Records that made it through but lost something on the way.
#[derive(Debug, Default)]
pub struct DegradedCounters {
    pub cast_failures: AtomicU64,
    pub missing_time: AtomicU64,
    pub time_parse_failures: AtomicU64,
    pub unknown_severity: AtomicU64,
}

#[derive(Debug, Default)]
pub struct GaugeCounters {
    pub active_streams: AtomicI64,
}

/// Process-wide counters for every degraded outcome of the normalizer.
///
/// One instance is shared (behind an `Arc`) by every pipeline and stream
/// worker. All operations use `Ordering::Relaxed`; `snapshot()` is not
/// transactional across fields, which is fine for diagnostics.
#[derive(Debug, Default)]
pub struct PipelineMetrics {
    pub streams: CacheAligned<StreamCounters>,
    pub outcomes: CacheAligned<OutcomeCounters>,
    pub degraded: CacheAligned<DegradedCounters>,
    pub gauges: CacheAligned<GaugeCounters>,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn record_line(&self) {
        self.streams.0.lines_received.fetch_add(1, Ordering::Relaxed);
    }

    /// A logical record left the grouper.
    #[inline]
    pub fn record_emitted(&self, line_count: usize) {
        self.streams.0.records_emitted.fetch_add(1, Ordering::Relaxed);
        if line_count > 1 {
            self.streams.0.grouped_records.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn record_timeout_flush(&self) {
        self.streams.0.timeout_flushes.fetch_add(1, Ordering::Relaxed);
    }

    /// A line matched neither a continuation rule nor a start rule.
    #[inline]
    pub fn record_continuation_gap(&self) {
        self.streams.0.continuation_gaps.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_match(&self) {
        self.outcomes.0.matched.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_fallback(&self) {
        self.outcomes.0.fallback.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_unknown_severity(&self) {
        self.degraded.0.unknown_severity.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_issue(&self, issue: &ParseError) {
        let counter = match issue {
            ParseError::NoMatch => &self.outcomes.0.fallback,
            ParseError::Cast { .. } => &self.degraded.0.cast_failures,
            ParseError::MissingTime(_) => &self.degraded.0.missing_time,
            ParseError::Time { .. } => &self.degraded.0.time_parse_failures,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn inc_active_streams(&self) {
        self.gauges.0.active_streams.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn dec_active_streams(&self) {
        self.gauges.0.active_streams.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let matched = self.outcomes.0.matched.load(Ordering::Relaxed);
        let fallback = self.outcomes.0.fallback.load(Ordering::Relaxed);
        let attempts = matched + fallback;

        MetricsSnapshot {
            lines_received: self.streams.0.lines_received.load(Ordering::Relaxed),
            records_emitted: self.streams.0.records_emitted.load(Ordering::Relaxed),
            grouped_records: self.streams.0.grouped_records.load(Ordering::Relaxed),
            timeout_flushes: self.streams.0.timeout_flushes.load(Ordering::Relaxed),
            continuation_gaps: self.streams.0.continuation_gaps.load(Ordering::Relaxed),

            matched,
            fallback,
            success_rate: if attempts > 0 {
                matched as f64 / attempts as f64
            } else {
                1.0
            },

            cast_failures: self.degraded.0.cast_failures.load(Ordering::Relaxed),
            missing_time: self.degraded.0.missing_time.load(Ordering::Relaxed),
            time_parse_failures: self.degraded.0.time_parse_failures.load(Ordering::Relaxed),
            unknown_severity: self.degraded.0.unknown_severity.load(Ordering::Relaxed),

            active_streams: self.gauges.0.active_streams.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`PipelineMetrics`], serializable for logging.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub lines_received: u64,
    pub records_emitted: u64,
    pub grouped_records: u64,
    pub timeout_flushes: u64,
    pub continuation_gaps: u64,

    pub matched: u64,
    pub fallback: u64,
    pub success_rate: f64,

    pub cast_failures: u64,
    pub missing_time: u64,
    pub time_parse_failures: u64,
    pub unknown_severity: u64,

    pub active_streams: i64,
}
